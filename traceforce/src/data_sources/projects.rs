//! Lists all projects visible to the API key

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
use crate::resources::project::project_state;
use crate::state::{api_error, configured_client, downcast_provider_data};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_projects";

const PROJECT_FIELDS: [(&str, &str); 10] = [
    ("id", "System generated ID of the project"),
    ("name", "Name of the project"),
    ("type", "Type of project"),
    ("cloud_provider", "Cloud provider for the project"),
    ("native_id", "Native ID of the cloud project"),
    ("status", "Status of the project"),
    (
        "control_plane_aws_account_id",
        "AWS account ID for the control plane",
    ),
    (
        "control_plane_role_name",
        "AWS IAM role name for the control plane",
    ),
    ("created_at", "Date and time the project was created"),
    ("updated_at", "Date and time the project was last updated"),
];

#[derive(Default)]
pub struct ProjectsDataSource {
    provider_data: Option<TraceforceProviderData>,
}

impl ProjectsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ProjectsDataSource {
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
            .description("Lists Traceforce projects.")
            .attribute(computed_list(
                "projects",
                "List of projects",
                &PROJECT_FIELDS,
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

        match client.list_hosting_environments().await {
            Ok(envs) => {
                debug!(count = envs.len(), "read projects");
                list_response(
                    request.config,
                    "projects",
                    envs.iter().map(project_state).collect(),
                )
            }
            Err(e) => error_response(
                request.config,
                api_error("Error reading hosting environments", &e),
            ),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ProjectsDataSource {
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
