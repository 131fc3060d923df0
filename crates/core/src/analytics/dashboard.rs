use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::segments::{segment_customers, SegmentCounts, SegmentRules};
use crate::analytics::summary::{summarize, SummaryOptions, VolumeEntry};
use crate::domain::customer::Customer;

/// Everything the dashboard cards and the top-customers chart render from one snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub total_customers: usize,
    pub total_bags: u64,
    pub avg_bags_per_customer: u64,
    pub segments: SegmentCounts,
    pub top_by_volume: Vec<VolumeEntry>,
    pub evaluated_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    pub fn build<Tz: TimeZone>(
        customers: &[Customer],
        rules: &SegmentRules,
        options: &SummaryOptions,
        now: &DateTime<Tz>,
    ) -> Self {
        let summary = summarize(customers, options);

        Self {
            total_customers: customers.len(),
            total_bags: summary.total_bags,
            avg_bags_per_customer: summary.avg_bags_per_customer,
            segments: segment_customers(customers, rules, now),
            top_by_volume: summary.top_by_volume,
            evaluated_at: now.with_timezone(&Utc),
        }
    }
}
