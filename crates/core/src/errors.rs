use serde::Serialize;
use thiserror::Error;

use crate::domain::customer::CustomerId;

/// Intake and lookup failures on the customer record itself.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("customer {0} was not found")]
    CustomerNotFound(CustomerId),
    #[error("`{0}` is not a customer id")]
    MalformedCustomerId(String),
    #[error("business name and phone are required")]
    MissingContactDetails,
    #[error("GPS location must be captured before saving")]
    MissingLocation,
    #[error("latitude and longitude must be set together")]
    PartialLocation,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("customer store failure: {0}")]
    Persistence(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Unavailable,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Unavailable => 503,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::BadRequest => "The customer details were not accepted. Check the form and retry.",
            Self::NotFound => "That customer is not in the store.",
            Self::Unavailable => "The customer store is unavailable. Please retry shortly.",
        }
    }
}

/// What a caller outside the process sees: a kind, the underlying message, and the
/// correlation id that ties it to the log line.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[error("{message} (correlation id {correlation_id})")]
pub struct InterfaceError {
    pub kind: ErrorKind,
    pub message: String,
    pub correlation_id: String,
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(DomainError::CustomerNotFound(_)) => ErrorKind::NotFound,
            Self::Domain(_) => ErrorKind::BadRequest,
            Self::Persistence(_) => ErrorKind::Unavailable,
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let message = match &self {
            Self::Domain(error) => error.to_string(),
            Self::Persistence(message) => message.clone(),
        };
        InterfaceError { kind: self.kind(), message, correlation_id: correlation_id.into() }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::domain::customer::CustomerId;
    use crate::errors::{ApplicationError, DomainError, ErrorKind};

    #[test]
    fn intake_errors_are_bad_requests_with_their_own_message() {
        let interface =
            ApplicationError::from(DomainError::MissingLocation).into_interface("req-1");

        assert_eq!(interface.kind, ErrorKind::BadRequest);
        assert_eq!(interface.kind.http_status(), 400);
        assert_eq!(interface.message, "GPS location must be captured before saving");
        assert_eq!(interface.correlation_id, "req-1");
    }

    #[test]
    fn missing_customer_is_not_found() {
        let id = CustomerId(Uuid::nil());
        let interface =
            ApplicationError::from(DomainError::CustomerNotFound(id)).into_interface("req-2");

        assert_eq!(interface.kind, ErrorKind::NotFound);
        assert!(interface.message.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn store_failure_hides_detail_behind_user_message() {
        let interface =
            ApplicationError::Persistence("database is locked".to_owned()).into_interface("req-3");

        assert_eq!(interface.kind.http_status(), 503);
        assert!(!interface.kind.user_message().contains("locked"));
        assert!(interface.to_string().contains("req-3"));
    }

    #[test]
    fn every_error_maps_to_a_client_or_availability_status() {
        let errors = [
            ApplicationError::from(DomainError::MissingContactDetails),
            ApplicationError::from(DomainError::MalformedCustomerId("abc".to_owned())),
            ApplicationError::from(DomainError::CustomerNotFound(CustomerId(Uuid::nil()))),
            ApplicationError::Persistence("disk full".to_owned()),
        ];
        let statuses: Vec<u16> = errors.iter().map(|error| error.kind().http_status()).collect();

        assert_eq!(statuses, vec![400, 400, 404, 503]);
    }

    #[test]
    fn kind_serializes_in_snake_case() {
        let value = serde_json::to_value(ErrorKind::BadRequest).expect("serialize");
        assert_eq!(value, "bad_request");
    }
}
