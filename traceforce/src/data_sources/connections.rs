//! Lists all connections

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::SchemaBuilder;
use tracing::debug;

use super::{computed_list, error_response, list_response};
use crate::resources::connection::connection_state;
use crate::state::{api_error, configured_client, downcast_provider_data};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_connections";

#[derive(Default)]
pub struct ConnectionsDataSource {
    provider_data: Option<TraceforceProviderData>,
}

impl ConnectionsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ConnectionsDataSource {
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
            .description("Lists connections to cloud environments.")
            .attribute(computed_list(
                "connections",
                "List of connections",
                &[
                    ("id", "System generated ID of the connection"),
                    ("name", "Name of the connection"),
                    ("environment_type", "Type of environment the connection is connected to"),
                    (
                        "environment_native_id",
                        "Native ID of the environment the connection is connected to",
                    ),
                    ("status", "Status of the connection"),
                    ("created_at", "Date and time the connection was created"),
                    ("updated_at", "Date and time the connection was last updated"),
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

        match client.list_connections().await {
            Ok(connections) => {
                debug!(count = connections.len(), "read connections");
                list_response(
                    request.config,
                    "connections",
                    connections.iter().map(connection_state).collect(),
                )
            }
            Err(e) => error_response(request.config, api_error("Error reading connections", &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ConnectionsDataSource {
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
