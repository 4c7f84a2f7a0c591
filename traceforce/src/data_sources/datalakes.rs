//! Lists datalakes, optionally limited to one project

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::SchemaBuilder;
use tfplug::types::AttributePath;
use tracing::debug;

use super::{computed_list, error_response, list_response, optional_filter};
use crate::resources::datalake::datalake_state;
use crate::state::{api_error, configured_client, downcast_provider_data};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_datalakes";

#[derive(Default)]
pub struct DatalakesDataSource {
    provider_data: Option<TraceforceProviderData>,
}

impl DatalakesDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for DatalakesDataSource {
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
            .description("Lists Traceforce datalakes.")
            .attribute(optional_filter(
                "project_id",
                "Only list datalakes belonging to this project.",
            ))
            .attribute(computed_list(
                "datalakes",
                "List of datalakes",
                &[
                    ("id", "System generated ID of the datalake"),
                    ("project_id", "ID of the project the datalake belongs to"),
                    ("type", "Type of datalake"),
                    ("name", "Name of the datalake"),
                    ("status", "Status of the datalake"),
                    ("created_at", "Date and time the datalake was created"),
                    ("updated_at", "Date and time the datalake was last updated"),
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

        let project_id = request
            .config
            .get_string_opt(&AttributePath::new("project_id"))
            .filter(|id| !id.is_empty());

        let (result, summary) = match &project_id {
            Some(id) => (
                client.list_datalakes_by_hosting_environment(id).await,
                "Error reading datalakes by hosting environment",
            ),
            None => (client.list_datalakes().await, "Error reading datalakes"),
        };

        match result {
            Ok(datalakes) => {
                debug!(count = datalakes.len(), project_id = ?project_id, "read datalakes");
                list_response(
                    request.config,
                    "datalakes",
                    datalakes.iter().map(datalake_state).collect(),
                )
            }
            Err(e) => error_response(request.config, api_error(summary, &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for DatalakesDataSource {
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
