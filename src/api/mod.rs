//! REST client for the meeting backend.
//!
//! Covers authentication, the meeting bot actions (join, stop, snapshot),
//! the record catalogue, summaries and uploads.

pub mod client;
pub mod error;
pub mod types;

pub use client::{mime_type_for_extension, BackendClient, Timeouts};
pub use error::{ApiError, ApiResult};
pub use types::{CalendarMeetings, JoinRequest, Paginated, Pagination, RecordQuery};
