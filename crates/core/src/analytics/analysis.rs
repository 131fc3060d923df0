//! Shaping of the outbound analysis request and interpretation of its reply.
//!
//! The text-generation service itself lives behind `sachet_agent::llm::LlmClient`; this module
//! only decides what leaves the process (a reduced per-customer digest plus segment counts) and
//! how the returned text is turned back into an [`AnalysisResult`].

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

use crate::analytics::segments::{SegmentCounts, SegmentRules};
use crate::domain::customer::Customer;

const TEMPLATE_NAME: &str = "analysis_prompt";

pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Analyze this sachet water customer data in Ghana.

Segmentation Context:
- High Volume Customers (>{{ high_volume_threshold }} bags): {{ high_volume }}
- Local Customers (within {{ local_radius_km }}km of HQ): {{ local }}
- New Customers (last {{ new_window_days }} days): {{ new }}

Detailed Data: {{ records }}

Provide a JSON response with exactly the following fields:
- summary: A brief executive summary of the customer base, mentioning the segments.
- strategy: Suggest a sales or delivery strategy based on the segmentation (e.g. how to retain high volume, or expand local routes).
- clusters: An array of strings, where each string describes a suggested delivery cluster/zone based on location and volume.

Respond with the JSON object only.
"#;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub strategy: String,
    pub clusters: Vec<String>,
}

impl AnalysisResult {
    pub fn no_data() -> Self {
        Self {
            summary: "no data available".to_string(),
            strategy: "start collecting data".to_string(),
            clusters: Vec::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            summary: "analysis unavailable".to_string(),
            strategy: "check connection or credentials".to_string(),
            clusters: vec!["analysis failed".to_string()],
        }
    }
}

/// What an analysis run resolved to. Every variant maps to a displayable result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed(AnalysisResult),
    NoData,
    Unavailable { reason: String },
}

impl AnalysisOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::NoData => "no_data",
            Self::Unavailable { .. } => "unavailable",
        }
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            Self::Completed(result) => result,
            Self::NoData => AnalysisResult::no_data(),
            Self::Unavailable { .. } => AnalysisResult::unavailable(),
        }
    }
}

/// Per-customer record sent to the text-generation service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDigest {
    pub name: String,
    /// `lat,lng` rounded to three decimals.
    pub location: String,
    pub volume: u32,
}

impl From<&Customer> for CustomerDigest {
    fn from(customer: &Customer) -> Self {
        Self {
            name: customer.business_name.clone(),
            location: format!("{:.3},{:.3}", customer.latitude, customer.longitude),
            volume: customer.average_bags,
        }
    }
}

pub fn digest_customers(customers: &[Customer]) -> Vec<CustomerDigest> {
    customers.iter().map(CustomerDigest::from).collect()
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("prompt template error: {0}")]
    Template(#[from] tera::Error),
    #[error("built-in prompt template did not parse: {0}")]
    BuiltinTemplate(String),
    #[error("could not serialize customer digest: {0}")]
    Digest(#[source] serde_json::Error),
    #[error("analysis response was empty")]
    EmptyResponse,
    #[error("analysis response is not valid JSON for summary/strategy/clusters: {0}")]
    Parse(#[source] serde_json::Error),
}

#[derive(Clone, Debug)]
pub struct PromptTemplate {
    tera: Tera,
    /// Set when the built-in source failed to parse; every render reports it.
    load_error: Option<String>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin_from(DEFAULT_PROMPT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn from_source(source: &str) -> Result<Self, AnalysisError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, source)?;
        Ok(Self { tera, load_error: None })
    }

    fn builtin_from(source: &str) -> Self {
        Self::from_source(source).unwrap_or_else(|error| Self {
            tera: Tera::default(),
            load_error: Some(error.to_string()),
        })
    }

    pub fn render(
        &self,
        customers: &[Customer],
        counts: &SegmentCounts,
        rules: &SegmentRules,
    ) -> Result<String, AnalysisError> {
        if let Some(error) = &self.load_error {
            return Err(AnalysisError::BuiltinTemplate(error.clone()));
        }
        let records = serde_json::to_string(&digest_customers(customers))
            .map_err(AnalysisError::Digest)?;

        let mut context = Context::new();
        context.insert("high_volume", &counts.high_volume);
        context.insert("local", &counts.local);
        context.insert("new", &counts.new);
        context.insert("high_volume_threshold", &rules.high_volume_threshold);
        context.insert("local_radius_km", &rules.local_radius_km.to_string());
        context.insert("new_window_days", &rules.new_window_days);
        context.insert("customer_count", &customers.len());
        context.insert("records", &records);

        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}

pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(AnalysisError::Parse)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|ch: char| ch.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
