use serde::{Deserialize, Serialize};

use crate::domain::customer::{Customer, CustomerId};

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_NAME_WIDTH: usize = 10;
pub const ELLIPSIS: &str = "...";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOptions {
    pub top_n: usize,
    /// Longest business name shown untouched in the ranking.
    pub name_width: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N, name_width: DEFAULT_NAME_WIDTH }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeEntry {
    pub customer_id: CustomerId,
    pub display_name: String,
    pub average_bags: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub total_bags: u64,
    pub avg_bags_per_customer: u64,
    pub top_by_volume: Vec<VolumeEntry>,
}

pub fn summarize(customers: &[Customer], options: &SummaryOptions) -> CustomerSummary {
    let total_bags = customers.iter().map(|customer| u64::from(customer.average_bags)).sum();

    CustomerSummary {
        total_bags,
        avg_bags_per_customer: rounded_average(total_bags, customers.len() as u64),
        top_by_volume: top_by_volume(customers, options),
    }
}

/// Nearest-integer mean with halves rounded up; zero for an empty collection.
pub fn rounded_average(total: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    (total * 2 + count) / (count * 2)
}

pub fn top_by_volume(customers: &[Customer], options: &SummaryOptions) -> Vec<VolumeEntry> {
    let mut ranked: Vec<&Customer> = customers.iter().collect();
    // stable: equal volumes keep their input order
    ranked.sort_by(|left, right| right.average_bags.cmp(&left.average_bags));

    ranked
        .into_iter()
        .take(options.top_n)
        .map(|customer| VolumeEntry {
            customer_id: customer.id,
            display_name: display_name(&customer.business_name, options.name_width),
            average_bags: customer.average_bags,
        })
        .collect()
}

pub fn display_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut shortened: String = name.chars().take(width).collect();
    shortened.push_str(ELLIPSIS);
    shortened
}
