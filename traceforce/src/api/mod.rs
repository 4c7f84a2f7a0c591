//! Traceforce REST API client and entity DTOs

pub mod client;
pub mod connections;
pub mod datalakes;
pub mod error;
pub mod hosting_environments;
pub mod source_app_datalake_links;
pub mod source_apps;

pub use client::{Client, DEFAULT_ENDPOINT};
pub use error::{ApiError, Result};
