pub mod analysis;
pub mod dashboard;
pub mod geo;
pub mod segments;
pub mod summary;

pub use analysis::{
    parse_analysis, AnalysisError, AnalysisOutcome, AnalysisResult, CustomerDigest, PromptTemplate,
};
pub use dashboard::DashboardSnapshot;
pub use geo::{haversine_km, GeoPoint};
pub use segments::{segment_customers, SegmentCounts, SegmentRules};
pub use summary::{summarize, CustomerSummary, SummaryOptions, VolumeEntry};
