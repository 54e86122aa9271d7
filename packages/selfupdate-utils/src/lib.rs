pub mod http;
pub mod versioning;

// Re-export main utilities
pub use http::{content_length, http_status_is_ok, HttpClient, HttpError, ResponseData};
pub use versioning::{compare, normalize_tag, Version, VersionOrdering};
