//! tfplug - Terraform Plugin Protocol v6 for Rust providers
//!
//! Providers implement [`Provider`] and hand out factories for their
//! resources and data sources; [`serve`] runs the go-plugin handshake and the
//! gRPC service around them.

pub mod context;
pub mod error;
pub mod schema;
pub mod types;

pub mod data_source;
pub mod provider;
pub mod resource;

pub mod import;
pub mod plan_modifier;

pub mod grpc;
pub mod proto;
pub mod server;

pub use context::Context;
pub use data_source::{DataSource, DataSourceFactory, DataSourceHandle, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{
    Resource, ResourceFactory, ResourceHandle, ResourceWithConfigure, ResourceWithImportState,
};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{serve, ServerConfig};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
