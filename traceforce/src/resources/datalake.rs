//! Datalake resource

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
use crate::api::datalakes::{Datalake, DatalakeRequest, STATUS_PENDING};
use crate::state::{
    api_error, configured_client, downcast_provider_data, object, required_string, state_id,
    timestamp,
};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_datalake";

#[derive(Default)]
pub struct DatalakeResource {
    provider_data: Option<TraceforceProviderData>,
}

impl DatalakeResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_request(value: &DynamicValue) -> Result<DatalakeRequest, Diagnostic> {
        Ok(DatalakeRequest {
            hosting_environment_id: required_string(value, "project_id")?,
            datalake_type: required_string(value, "type")?,
            name: required_string(value, "name")?,
            status: None,
        })
    }
}

/// The API calls the owning project a hosting environment
pub(crate) fn datalake_state(datalake: &Datalake) -> Dynamic {
    object([
        ("id", datalake.id.clone().into()),
        ("project_id", datalake.hosting_environment_id.clone().into()),
        ("type", datalake.datalake_type.clone().into()),
        ("name", datalake.name.clone().into()),
        ("status", datalake.status.clone().into()),
        ("created_at", timestamp(&datalake.created_at)),
        ("updated_at", timestamp(&datalake.updated_at)),
    ])
}

#[async_trait]
impl Resource for DatalakeResource {
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
            .description("Manages a datalake within a Traceforce project.")
            .attribute(required_attribute(
                "project_id",
                "ID of the project this datalake belongs to.",
            ))
            .attribute(required_attribute(
                "type",
                "Type of datalake. Currently supported: BigQuery.",
            ))
            .attribute(required_attribute(
                "name",
                "Name of the datalake. This value must be unique within a project.",
            ))
            .attribute(volatile_computed(
                "status",
                "Status of the datalake. Valid values: Pending, WaitingForUserInput, Ready.",
            ))
            .attribute(stable_computed("id", "System generated ID of the datalake"))
            .attribute(stable_computed(
                "created_at",
                "Date and time the datalake was created",
            ))
            .attribute(volatile_computed(
                "updated_at",
                "Date and time the datalake was last updated",
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

        let mut body = match Self::extract_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };
        body.status = Some(STATUS_PENDING.to_string());

        match client.create_datalake(&body).await {
            Ok(datalake) => {
                info!(id = %datalake.id, project_id = %datalake.hosting_environment_id, "created datalake");
                CreateResourceResponse {
                    new_state: DynamicValue::new(datalake_state(&datalake)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: api_error("Error creating datalake", &e),
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
        match client.get_datalake(&id).await {
            Ok(datalake) => ReadResourceResponse {
                new_state: Some(DynamicValue::new(datalake_state(&datalake))),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => {
                info!(id = %id, "datalake no longer exists");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: api_error("Error reading datalake", &e),
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

        match client.update_datalake(&id, &body).await {
            Ok(datalake) => {
                info!(id = %datalake.id, "updated datalake");
                UpdateResourceResponse {
                    new_state: DynamicValue::new(datalake_state(&datalake)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: api_error("Error updating datalake", &e),
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
        match client.delete_datalake(&id).await {
            Ok(()) => {
                info!(id = %id, "deleted datalake");
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: api_error("Error deleting datalake", &e),
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for DatalakeResource {
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
impl ResourceWithImportState for DatalakeResource {
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

impl ResourceHandle for DatalakeResource {
    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}
