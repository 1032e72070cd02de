//! Description-document retrieval and validation.
//!
//! [`fetch`] retrieves the raw document over HTTP(S); [`validate`] parses it
//! and extracts the de-duplicated operation set.  A failure in either step is
//! terminal for the provider and stops it before synthesis.

pub mod fetch;
pub mod validate;

pub use fetch::{FetchConfig, HttpSpecSource};
pub use validate::{parse_document, validate, validate_document};
