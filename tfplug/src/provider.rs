//! Provider trait and related types
//!
//! A provider owns its configuration schema, turns configuration into shared
//! provider data, and hands out factories for its resources and data sources.

use crate::context::Context;
use crate::data_source::DataSourceFactory;
use crate::resource::ResourceFactory;
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Main provider trait - the entry point of every Terraform provider
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name (e.g., "traceforce"), the prefix of every resource type
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    /// Provider configuration schema
    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Called during validate with possibly unknown configuration values
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    /// Called once per Terraform run, before any resource operation
    /// provider_data in the response is passed to every resource and data source
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Resource factories keyed by resource type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    /// Data source factories keyed by data source type name
    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub version: String,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
    pub client_capabilities: ClientCapabilities,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Shared with resources and data sources through their configure hooks
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
