//! Walletlink Domain - Core types of the API access layer
//!
//! This crate defines the data model shared by the transport client,
//! the status poller and the error aggregator.
//! All types here are pure Rust with no I/O dependencies.

pub mod aggregate;
pub mod classification;
pub mod config;
pub mod error;
pub mod event;
pub mod request;
pub mod status;

pub use aggregate::{AggregatedError, Notification, NotificationStyle};
pub use classification::{ClassifiedError, ErrorCategory, Severity};
pub use config::{ApiConfig, BASE_URL_ENV, DEFAULT_BASE_URL, settings_keys, validate_api_key, validate_base_url};
pub use error::{DomainError, DomainResult};
pub use event::{ApiErrorPayload, ErrorContext};
pub use request::{HttpMethod, RequestDescriptor};
pub use status::ApiStatus;
