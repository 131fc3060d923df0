use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::geo::GeoPoint;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CustomerId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// A retail outlet buying sachet water, pinned to the GPS fix captured on site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub gps_address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Weekly order volume in bags.
    pub average_bags: u32,
    /// Stamped once at creation; later orders do not move it.
    pub last_visit: DateTime<Utc>,
}

impl Customer {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Intake payload for a customer that has not been persisted yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCustomer {
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub gps_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub average_bags: u32,
}

impl NewCustomer {
    pub fn into_customer(self, now: DateTime<Utc>) -> Result<Customer, DomainError> {
        let business_name = self.business_name.trim().to_string();
        let phone = self.phone.trim().to_string();
        if business_name.is_empty() || phone.is_empty() {
            return Err(DomainError::MissingContactDetails);
        }

        let (latitude, longitude) = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => (latitude, longitude),
            (None, None) => return Err(DomainError::MissingLocation),
            _ => return Err(DomainError::PartialLocation),
        };

        Ok(Customer {
            id: CustomerId::new(),
            business_name,
            contact_name: self.contact_name.trim().to_string(),
            phone,
            gps_address: self.gps_address.trim().to_string(),
            latitude,
            longitude,
            average_bags: self.average_bags,
            last_visit: now,
        })
    }
}
