//! Source app resource

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

use super::{replacing_attribute, required_attribute, stable_computed, volatile_computed};
use crate::api::source_apps::{CreateSourceAppRequest, SourceApp, UpdateSourceAppRequest};
use crate::state::{
    api_error, configured_client, downcast_provider_data, object, required_string, state_id,
    timestamp,
};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_source_app";

#[derive(Default)]
pub struct SourceAppResource {
    provider_data: Option<TraceforceProviderData>,
}

impl SourceAppResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_request(value: &DynamicValue) -> Result<CreateSourceAppRequest, Diagnostic> {
        Ok(CreateSourceAppRequest {
            datalake_id: required_string(value, "datalake_id")?,
            app_type: required_string(value, "type")?,
            name: required_string(value, "name")?,
        })
    }
}

fn source_app_state(app: &SourceApp) -> Dynamic {
    object([
        ("id", app.id.clone().into()),
        ("datalake_id", app.datalake_id.clone().into()),
        ("type", app.app_type.clone().into()),
        ("name", app.name.clone().into()),
        ("status", app.status.clone().into()),
        ("created_at", timestamp(&app.created_at)),
        ("updated_at", timestamp(&app.updated_at)),
    ])
}

#[async_trait]
impl Resource for SourceAppResource {
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
            .description("Manages a source app feeding a Traceforce datalake.")
            .attribute(replacing_attribute(
                "datalake_id",
                "ID of the datalake this source app belongs to.",
            ))
            .attribute(replacing_attribute(
                "type",
                "Type of source app. Currently supported: Salesforce.",
            ))
            .attribute(required_attribute(
                "name",
                "Name of the source app. This value must be unique within a datalake.",
            ))
            .attribute(volatile_computed(
                "status",
                "Status of the source app. Valid values: Pending, Deployed, Disconnected, Connected.",
            ))
            .attribute(stable_computed("id", "System generated ID of the source app"))
            .attribute(stable_computed(
                "created_at",
                "Date and time the source app was created",
            ))
            .attribute(volatile_computed(
                "updated_at",
                "Date and time the source app was last updated",
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

        match client.create_source_app(&body).await {
            Ok(app) => {
                info!(id = %app.id, datalake_id = %app.datalake_id, "created source app");
                CreateResourceResponse {
                    new_state: DynamicValue::new(source_app_state(&app)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: api_error("Error creating source app", &e),
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
        match client.get_source_app(&id).await {
            Ok(app) => ReadResourceResponse {
                new_state: Some(DynamicValue::new(source_app_state(&app))),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => {
                info!(id = %id, "source app no longer exists");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: api_error("Error reading source app", &e),
                private: request.private,
                deferred: None,
            },
        }
    }

    /// Only the name is mutable; other changes are replacements
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

        let name = match required_string(&request.planned_state, "name") {
            Ok(name) => name,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };
        let id = state_id(&request.prior_state);
        let body = UpdateSourceAppRequest { name: Some(name) };

        match client.update_source_app(&id, &body).await {
            Ok(app) => {
                info!(id = %app.id, "updated source app");
                UpdateResourceResponse {
                    new_state: DynamicValue::new(source_app_state(&app)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: api_error("Error updating source app", &e),
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
        match client.delete_source_app(&id).await {
            Ok(()) => {
                info!(id = %id, "deleted source app");
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: api_error("Error deleting source app", &e),
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for SourceAppResource {
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
impl ResourceWithImportState for SourceAppResource {
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

impl ResourceHandle for SourceAppResource {
    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}
