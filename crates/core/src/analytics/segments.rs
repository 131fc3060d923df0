use chrono::{DateTime, Days, Duration, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::analytics::geo::GeoPoint;
use crate::domain::customer::Customer;

/// Accra Central depot.
pub const DEFAULT_REFERENCE_POINT: GeoPoint = GeoPoint::new(5.6037, -0.1870);
pub const DEFAULT_HIGH_VOLUME_THRESHOLD: u32 = 50;
pub const DEFAULT_LOCAL_RADIUS_KM: f64 = 5.0;
pub const DEFAULT_NEW_WINDOW_DAYS: u64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentRules {
    pub reference: GeoPoint,
    /// Bags per week a customer must exceed to count as high volume.
    pub high_volume_threshold: u32,
    pub local_radius_km: f64,
    pub new_window_days: u64,
}

impl Default for SegmentRules {
    fn default() -> Self {
        Self {
            reference: DEFAULT_REFERENCE_POINT,
            high_volume_threshold: DEFAULT_HIGH_VOLUME_THRESHOLD,
            local_radius_km: DEFAULT_LOCAL_RADIUS_KM,
            new_window_days: DEFAULT_NEW_WINDOW_DAYS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCounts {
    pub high_volume: usize,
    pub local: usize,
    pub new: usize,
}

impl SegmentRules {
    pub fn is_high_volume(&self, customer: &Customer) -> bool {
        customer.average_bags > self.high_volume_threshold
    }

    pub fn is_local(&self, customer: &Customer) -> bool {
        customer.position().distance_km(&self.reference) <= self.local_radius_km
    }

    pub fn is_new<Tz: TimeZone>(&self, customer: &Customer, now: &DateTime<Tz>) -> bool {
        match self.new_cutoff(now) {
            Some(cutoff) => customer.last_visit >= cutoff,
            None => true,
        }
    }

    /// Start of the new-customer window: `now` moved back by whole calendar days on its own
    /// wall clock. A repeated local time resolves to its earlier instant and a skipped one to
    /// the end of the gap. `None` only when the subtraction leaves chrono's range.
    pub fn new_cutoff<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let local = now.naive_local().checked_sub_days(Days::new(self.new_window_days))?;
        Some(resolve_local(&now.timezone(), local))
    }
}

/// Longest clock jump searched when a local time falls inside a DST gap.
const MAX_GAP_MINUTES: i64 = 24 * 60;

fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    let mut candidate = local;
    for _ in 0..=MAX_GAP_MINUTES {
        if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
            return resolved;
        }
        match candidate.checked_add_signed(Duration::minutes(1)) {
            Some(next) => candidate = next,
            None => break,
        }
    }
    tz.from_utc_datetime(&local)
}

/// Counts the three overlapping cohorts; a customer may land in any subset of them.
pub fn segment_customers<Tz: TimeZone>(
    customers: &[Customer],
    rules: &SegmentRules,
    now: &DateTime<Tz>,
) -> SegmentCounts {
    let cutoff = rules.new_cutoff(now);

    customers.iter().fold(SegmentCounts::default(), |mut counts, customer| {
        if rules.is_high_volume(customer) {
            counts.high_volume += 1;
        }
        if rules.is_local(customer) {
            counts.local += 1;
        }
        let is_new = cutoff.as_ref().map_or(true, |cutoff| customer.last_visit >= *cutoff);
        if is_new {
            counts.new += 1;
        }
        counts
    })
}
