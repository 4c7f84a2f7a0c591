pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;
pub mod state;

pub use provider_data::TraceforceProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{DataSourceFactory, DataSourceHandle};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfplug::resource::{ResourceFactory, ResourceHandle};
use tfplug::schema::{AttributeBuilder, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tracing::{debug, info};

pub const API_KEY_ENV: &str = "TRACEFORCE_API_KEY";
pub const ENDPOINT_ENV: &str = "TRACEFORCE_ENDPOINT";

pub struct TraceforceProvider {
    version: String,
}

impl Default for TraceforceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceforceProvider {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Value of a provider attribute with its env var as the base
///
/// None when the config value is unknown, which happens when it depends on
/// values only known after apply.
fn config_value(config: &DynamicValue, name: &str, env_var: &str) -> Option<String> {
    match config.get(&AttributePath::new(name)) {
        Some(Dynamic::Unknown) => None,
        Some(Dynamic::String(value)) => Some(value.clone()),
        _ => Some(std::env::var(env_var).unwrap_or_default()),
    }
}

#[async_trait]
impl Provider for TraceforceProvider {
    fn type_name(&self) -> &str {
        "traceforce"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            version: self.version.clone(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Interact with the Traceforce platform.")
            .attribute(
                AttributeBuilder::string("api_key")
                    .description(
                        "API key for the Traceforce API. May also be provided via the TRACEFORCE_API_KEY environment variable.",
                    )
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("endpoint")
                    .description(
                        "URI for the Traceforce API. May also be provided via the TRACEFORCE_ENDPOINT environment variable.",
                    )
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        debug!(
            terraform_version = %request.terraform_version,
            "configuring Traceforce provider"
        );

        let mut diagnostics = vec![];

        let endpoint = config_value(&request.config, "endpoint", ENDPOINT_ENV);
        if endpoint.is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Unknown Traceforce API endpoint",
                    "The provider cannot create the Traceforce API client as there is an unknown configuration value for the Traceforce API endpoint. Either target apply the source of the value first, set the value statically in the configuration, or use the TRACEFORCE_ENDPOINT environment variable.",
                )
                .with_attribute(AttributePath::new("endpoint")),
            );
        }

        let api_key = config_value(&request.config, "api_key", API_KEY_ENV);
        if api_key.is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Unknown Traceforce API key",
                    "The provider cannot create the Traceforce API client as there is an unknown configuration value for the Traceforce API key. Either target apply the source of the value first, set the value statically in the configuration, or use the TRACEFORCE_API_KEY environment variable.",
                )
                .with_attribute(AttributePath::new("api_key")),
            );
        }

        let (Some(endpoint), Some(api_key)) = (endpoint, api_key) else {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        };

        if endpoint.is_empty() {
            info!(
                endpoint = api::DEFAULT_ENDPOINT,
                "no endpoint configured, using the default"
            );
        }

        if api_key.is_empty() {
            return ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Missing Traceforce API key",
                    "The provider cannot create the Traceforce API client as there is a missing or empty value for the Traceforce API key. Set the api_key value in the configuration or use the TRACEFORCE_API_KEY environment variable. If either is already set, ensure the value is not empty.",
                )
                .with_attribute(AttributePath::new("api_key"))],
                provider_data: None,
            };
        }

        match api::Client::new(&api_key, &endpoint) {
            Ok(client) => {
                info!(endpoint = %client.base_url(), "configured Traceforce client");
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(TraceforceProviderData::new(client))),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Unable to Create Traceforce API Client",
                    format!(
                        "An unexpected error occurred when creating the Traceforce API client.\n\nTraceforce Client Error: {}",
                        e
                    ),
                )],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            resources::project::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn ResourceHandle> { Box::new(resources::ProjectResource::new()) }),
        );
        factories.insert(
            resources::datalake::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn ResourceHandle> {
                Box::new(resources::DatalakeResource::new())
            }),
        );
        factories.insert(
            resources::source_app::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn ResourceHandle> {
                Box::new(resources::SourceAppResource::new())
            }),
        );
        factories.insert(
            resources::source_app_datalake_link::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn ResourceHandle> {
                Box::new(resources::SourceAppDatalakeLinkResource::new())
            }),
        );
        factories.insert(
            resources::connection::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn ResourceHandle> {
                Box::new(resources::ConnectionResource::new())
            }),
        );
        factories.insert(
            resources::post_connection::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn ResourceHandle> {
                Box::new(resources::PostConnectionResource::new())
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            data_sources::projects::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn DataSourceHandle> {
                Box::new(data_sources::ProjectsDataSource::new())
            }),
        );
        factories.insert(
            data_sources::datalakes::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn DataSourceHandle> {
                Box::new(data_sources::DatalakesDataSource::new())
            }),
        );
        factories.insert(
            data_sources::source_apps::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn DataSourceHandle> {
                Box::new(data_sources::SourceAppsDataSource::new())
            }),
        );
        factories.insert(
            data_sources::connections::TYPE_NAME.to_string(),
            Box::new(|| -> Box<dyn DataSourceHandle> {
                Box::new(data_sources::ConnectionsDataSource::new())
            }),
        );
        factories
    }
}
