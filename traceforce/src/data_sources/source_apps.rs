//! Lists source apps, optionally limited to one hosting environment

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::SchemaBuilder;
use tfplug::types::{AttributePath, Dynamic};
use tracing::debug;

use super::{computed_list, error_response, list_response, optional_filter};
use crate::api::source_apps::SourceApp;
use crate::state::{api_error, configured_client, downcast_provider_data, object, timestamp};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_source_apps";

#[derive(Default)]
pub struct SourceAppsDataSource {
    provider_data: Option<TraceforceProviderData>,
}

impl SourceAppsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn source_app_item(app: &SourceApp) -> Dynamic {
    object([
        ("id", app.id.clone().into()),
        ("hosting_environment_id", app.hosting_environment_id.clone().into()),
        ("type", app.app_type.clone().into()),
        ("name", app.name.clone().into()),
        ("status", app.status.clone().into()),
        ("created_at", timestamp(&app.created_at)),
        ("updated_at", timestamp(&app.updated_at)),
    ])
}

#[async_trait]
impl DataSource for SourceAppsDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists Traceforce source apps.")
            .attribute(optional_filter(
                "hosting_environment_id",
                "Only list source apps in this hosting environment.",
            ))
            .attribute(computed_list(
                "source_apps",
                "List of source apps",
                &[
                    ("id", "System generated ID of the source app"),
                    (
                        "hosting_environment_id",
                        "ID of the hosting environment the source app belongs to",
                    ),
                    ("type", "Type of source app"),
                    ("name", "Name of the source app"),
                    ("status", "Status of the source app"),
                    ("created_at", "Date and time the source app was created"),
                    ("updated_at", "Date and time the source app was last updated"),
                ],
            ))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let client = match configured_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => return error_response(request.config, vec![diag]),
        };

        let hosting_environment_id = request
            .config
            .get_string_opt(&AttributePath::new("hosting_environment_id"))
            .filter(|id| !id.is_empty());

        let (result, summary) = match &hosting_environment_id {
            Some(id) => (
                client.list_source_apps_by_hosting_environment(id).await,
                "Error reading source apps by hosting environment",
            ),
            None => (client.list_source_apps().await, "Error reading source apps"),
        };

        match result {
            Ok(apps) => {
                debug!(
                    count = apps.len(),
                    hosting_environment_id = ?hosting_environment_id,
                    "read source apps"
                );
                list_response(
                    request.config,
                    "source_apps",
                    apps.iter().map(source_app_item).collect(),
                )
            }
            Err(e) => error_response(request.config, api_error(summary, &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for SourceAppsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let (provider_data, diagnostics) = downcast_provider_data(
            request.provider_data,
            "Unexpected Data Source Configure Type",
        );
        self.provider_data = provider_data;
        ConfigureDataSourceResponse { diagnostics }
    }
}
