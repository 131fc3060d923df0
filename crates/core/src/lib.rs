pub mod analytics;
pub mod config;
pub mod domain;
pub mod errors;
pub mod map;

pub use analytics::{
    AnalysisOutcome, AnalysisResult, CustomerSummary, DashboardSnapshot, GeoPoint, PromptTemplate,
    SegmentCounts, SegmentRules, SummaryOptions, VolumeEntry,
};
pub use domain::customer::{Customer, CustomerId, NewCustomer};
pub use errors::{ApplicationError, DomainError, ErrorKind, InterfaceError};
pub use map::{MapBounds, MapMarker, MapView};
