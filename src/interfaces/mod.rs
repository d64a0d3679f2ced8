//! Outer surfaces: CSV transaction-log output and request-file input.

pub mod csv;
pub mod request_file;
