//! Connection resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceHandle, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::SchemaBuilder;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tracing::info;

use super::{required_attribute, stable_computed, volatile_computed};
use crate::api::connections::{Connection, ConnectionRequest};
use crate::state::{
    api_error, configured_client, downcast_provider_data, object, required_string, state_id,
    timestamp,
};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_connection";

#[derive(Default)]
pub struct ConnectionResource {
    provider_data: Option<TraceforceProviderData>,
}

impl ConnectionResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_request(value: &DynamicValue) -> Result<ConnectionRequest, Diagnostic> {
        Ok(ConnectionRequest {
            name: required_string(value, "name")?,
            environment_type: required_string(value, "environment_type")?,
            environment_native_id: required_string(value, "environment_native_id")?,
            status: required_string(value, "status")?,
        })
    }
}

pub(crate) fn connection_state(connection: &Connection) -> Dynamic {
    object([
        ("id", connection.id.clone().into()),
        ("name", connection.name.clone().into()),
        ("environment_type", connection.environment_type.clone().into()),
        (
            "environment_native_id",
            connection.environment_native_id.clone().into(),
        ),
        ("status", connection.status.clone().into()),
        ("created_at", timestamp(&connection.created_at)),
        ("updated_at", timestamp(&connection.updated_at)),
    ])
}

#[async_trait]
impl Resource for ConnectionResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a connection to a cloud environment.")
            .attribute(required_attribute(
                "name",
                "Name of the connection. This must be unique.",
            ))
            .attribute(required_attribute(
                "environment_type",
                "Type of environment the connection is connected to. For example, AWS, Azure, GCP, etc.",
            ))
            .attribute(required_attribute(
                "environment_native_id",
                "Native ID of the environment the connection is connected to. For example, an AWS account ID, an Azure subscription ID, a GCP project ID, etc.",
            ))
            .attribute(required_attribute(
                "status",
                "Status of the connection. For example, connected, disconnected, etc.",
            ))
            .attribute(stable_computed("id", "System generated ID of the connection"))
            .attribute(stable_computed(
                "created_at",
                "Date and time the connection was created",
            ))
            .attribute(volatile_computed(
                "updated_at",
                "Date and time the connection was last updated",
            ))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let client = match configured_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let body = match Self::extract_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        match client.create_connection(&body).await {
            Ok(connection) => {
                info!(id = %connection.id, name = %connection.name, "created connection");
                CreateResourceResponse {
                    new_state: DynamicValue::new(connection_state(&connection)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: api_error("Error creating connection", &e),
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let client = match configured_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                    deferred: None,
                }
            }
        };

        let id = state_id(&request.current_state);
        match client.get_connection(&id).await {
            Ok(connection) => ReadResourceResponse {
                new_state: Some(DynamicValue::new(connection_state(&connection))),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => {
                info!(id = %id, "connection no longer exists");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: api_error("Error reading connection", &e),
                private: request.private,
                deferred: None,
            },
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let client = match configured_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let body = match Self::extract_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };
        let id = state_id(&request.prior_state);

        match client.update_connection(&id, &body).await {
            Ok(connection) => {
                info!(id = %connection.id, "updated connection");
                UpdateResourceResponse {
                    new_state: DynamicValue::new(connection_state(&connection)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: api_error("Error updating connection", &e),
            },
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let client = match configured_client(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        let id = state_id(&request.prior_state);
        match client.delete_connection(&id).await {
            Ok(()) => {
                info!(id = %id, "deleted connection");
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: api_error("Error deleting connection", &e),
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ConnectionResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let (provider_data, diagnostics) =
            downcast_provider_data(request.provider_data, "Unexpected Resource Configure Type");
        self.provider_data = provider_data;
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ConnectionResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

impl ResourceHandle for ConnectionResource {
    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}
