//! Project resource, backed by a hosting environment

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
use tracing::{debug, info};

use super::{required_attribute, stable_computed, volatile_computed};
use crate::api::hosting_environments::{
    HostingEnvironment, HostingEnvironmentRequest, STATUS_PENDING,
};
use crate::state::{
    api_error, configured_client, downcast_provider_data, object, required_string, state_id,
    string_or_empty, timestamp,
};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_project";

#[derive(Default)]
pub struct ProjectResource {
    provider_data: Option<TraceforceProviderData>,
}

impl ProjectResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_request(value: &DynamicValue) -> Result<HostingEnvironmentRequest, Diagnostic> {
        Ok(HostingEnvironmentRequest {
            name: required_string(value, "name")?,
            environment_type: required_string(value, "type")?,
            cloud_provider: required_string(value, "cloud_provider")?,
            native_id: required_string(value, "native_id")?,
            status: None,
        })
    }
}

/// State object for a hosting environment, shared with the projects data source
pub(crate) fn project_state(env: &HostingEnvironment) -> Dynamic {
    object([
        ("id", env.id.clone().into()),
        ("name", env.name.clone().into()),
        ("type", env.environment_type.clone().into()),
        ("cloud_provider", string_or_empty(env.cloud_provider.as_deref())),
        ("native_id", env.native_id.clone().into()),
        ("status", env.status.clone().into()),
        (
            "control_plane_aws_account_id",
            string_or_empty(env.control_plane_aws_account_id.as_deref()),
        ),
        (
            "control_plane_role_name",
            string_or_empty(env.control_plane_role_name.as_deref()),
        ),
        ("created_at", timestamp(&env.created_at)),
        ("updated_at", timestamp(&env.updated_at)),
    ])
}

#[async_trait]
impl Resource for ProjectResource {
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
            .description("Manages a Traceforce project (hosting environment).")
            .attribute(required_attribute(
                "name",
                "Name of the project. This value must be unique.",
            ))
            .attribute(required_attribute(
                "type",
                "Type of project. Valid values: Customer Managed, TraceForce Managed.",
            ))
            .attribute(required_attribute(
                "cloud_provider",
                "Cloud provider for the project. Valid values: AWS, GCP, Azure.",
            ))
            .attribute(required_attribute(
                "native_id",
                "Native ID of the cloud project. For example, an AWS account ID, an Azure subscription ID, a GCP project ID, etc.",
            ))
            .attribute(volatile_computed(
                "status",
                "Status of the project. Valid values: Pending, Disconnected, Connected.",
            ))
            .attribute(stable_computed("id", "System generated ID of the project"))
            .attribute(stable_computed(
                "control_plane_aws_account_id",
                "AWS account ID for the control plane",
            ))
            .attribute(stable_computed(
                "control_plane_role_name",
                "AWS IAM role name for the control plane",
            ))
            .attribute(stable_computed(
                "created_at",
                "Date and time the project was created",
            ))
            .attribute(volatile_computed(
                "updated_at",
                "Date and time the project was last updated",
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

        match client.create_hosting_environment(&body).await {
            Ok(env) => {
                info!(id = %env.id, name = %env.name, "created project");
                CreateResourceResponse {
                    new_state: DynamicValue::new(project_state(&env)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: api_error("Error creating hosting environment", &e),
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

        // Imports only know the name until the first read
        let id = state_id(&request.current_state);
        let result = if id.is_empty() {
            let name = request
                .current_state
                .get_string_opt(&AttributePath::new("name"))
                .unwrap_or_default();
            debug!(name = %name, "reading project by name");
            client.get_hosting_environment_by_name(&name).await
        } else {
            client.get_hosting_environment(&id).await
        };

        match result {
            Ok(env) => ReadResourceResponse {
                new_state: Some(DynamicValue::new(project_state(&env))),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => {
                info!(id = %id, "project no longer exists");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: api_error("Error reading hosting environment", &e),
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

        match client.update_hosting_environment(&id, &body).await {
            Ok(env) => {
                info!(id = %env.id, "updated project");
                UpdateResourceResponse {
                    new_state: DynamicValue::new(project_state(&env)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: api_error("Error updating hosting environment", &e),
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
        match client.delete_hosting_environment(&id).await {
            Ok(()) => {
                info!(id = %id, "deleted project");
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: api_error("Error deleting hosting environment", &e),
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ProjectResource {
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
impl ResourceWithImportState for ProjectResource {
    /// Projects are imported by name
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
        import_state_passthrough_id(&ctx, AttributePath::new("name"), &request, &mut response);
        response
    }
}

impl ResourceHandle for ProjectResource {
    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn environment() -> HostingEnvironment {
        HostingEnvironment {
            id: "he-1".to_string(),
            name: "prod".to_string(),
            environment_type: "Customer Managed".to_string(),
            cloud_provider: Some("AWS".to_string()),
            native_id: "123456789012".to_string(),
            status: "Connected".to_string(),
            control_plane_aws_account_id: None,
            control_plane_role_name: Some("tf-control".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
        }
    }

    #[test]
    fn state_copies_every_field() {
        let state = DynamicValue::new(project_state(&environment()));
        let get = |name: &str| state.get_string(&AttributePath::new(name)).unwrap();

        assert_eq!(get("id"), "he-1");
        assert_eq!(get("type"), "Customer Managed");
        assert_eq!(get("cloud_provider"), "AWS");
        assert_eq!(get("control_plane_aws_account_id"), "");
        assert_eq!(get("control_plane_role_name"), "tf-control");
        assert_eq!(get("created_at"), "2024-01-02T03:04:05Z");
        assert_eq!(get("updated_at"), "2024-02-03T04:05:06Z");
    }

    #[test]
    fn request_requires_known_fields() {
        let plan = DynamicValue::new(object([
            ("name", "prod".into()),
            ("type", "Customer Managed".into()),
            ("cloud_provider", Dynamic::Unknown),
            ("native_id", "123".into()),
        ]));

        let diag = ProjectResource::extract_request(&plan).unwrap_err();
        assert_eq!(diag.summary, "Missing cloud_provider");
    }

    #[tokio::test]
    async fn unconfigured_create_reports_diagnostic() {
        let resource = ProjectResource::new();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: DynamicValue::object(),
                    config: DynamicValue::object(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn import_writes_name() {
        let resource = ProjectResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: "prod".to_string(),
                    client_capabilities: Default::default(),
                },
            )
            .await;

        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "prod");
        assert!(state.get(&AttributePath::new("id")).is_none());
    }
}
