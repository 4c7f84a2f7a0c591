//! Link between a source app and a datalake
//!
//! Both ends force replacement, so links are never updated in place.

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

use super::{replacing_attribute, stable_computed, volatile_computed};
use crate::api::source_app_datalake_links::{
    CreateSourceAppDatalakeLinkRequest, SourceAppDatalakeLink,
};
use crate::state::{
    api_error, configured_client, downcast_provider_data, object, required_string, state_id,
    timestamp,
};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_source_app_datalake_link";

#[derive(Default)]
pub struct SourceAppDatalakeLinkResource {
    provider_data: Option<TraceforceProviderData>,
}

impl SourceAppDatalakeLinkResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn link_state(link: &SourceAppDatalakeLink) -> Dynamic {
    object([
        ("id", link.id.clone().into()),
        ("source_app_id", link.source_app_id.clone().into()),
        ("datalake_id", link.datalake_id.clone().into()),
        (
            "hosting_environment_id",
            link.hosting_environment_id.clone().into(),
        ),
        ("created_at", timestamp(&link.created_at)),
        ("updated_at", timestamp(&link.updated_at)),
    ])
}

#[async_trait]
impl Resource for SourceAppDatalakeLinkResource {
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
            .description("Links a source app to a datalake within the same hosting environment.")
            .attribute(replacing_attribute(
                "source_app_id",
                "ID of the source app to link.",
            ))
            .attribute(replacing_attribute(
                "datalake_id",
                "ID of the datalake to link.",
            ))
            .attribute(stable_computed(
                "hosting_environment_id",
                "ID of the hosting environment (derived from linked resources).",
            ))
            .attribute(stable_computed("id", "System generated ID of the link"))
            .attribute(stable_computed(
                "created_at",
                "Date and time the link was created",
            ))
            .attribute(volatile_computed(
                "updated_at",
                "Date and time the link was last updated",
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

        let body = match (
            required_string(&request.planned_state, "source_app_id"),
            required_string(&request.planned_state, "datalake_id"),
        ) {
            (Ok(source_app_id), Ok(datalake_id)) => CreateSourceAppDatalakeLinkRequest {
                source_app_id,
                datalake_id,
            },
            (Err(diag), _) | (_, Err(diag)) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        match client.create_source_app_datalake_link(&body).await {
            Ok(link) => {
                info!(
                    id = %link.id,
                    source_app_id = %link.source_app_id,
                    datalake_id = %link.datalake_id,
                    "created source app datalake link"
                );
                CreateResourceResponse {
                    new_state: DynamicValue::new(link_state(&link)),
                    private: vec![],
                    diagnostics: vec![],
                }
            }
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: api_error("Error creating source app datalake link", &e),
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
        match client.get_source_app_datalake_link(&id).await {
            Ok(link) => ReadResourceResponse {
                new_state: Some(DynamicValue::new(link_state(&link))),
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(e) if e.is_not_found() => {
                info!(id = %id, "source app datalake link no longer exists");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: api_error("Error reading source app datalake link", &e),
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
        UpdateResourceResponse {
            new_state: request.prior_state,
            private: vec![],
            diagnostics: vec![Diagnostic::error(
                "Update not supported",
                "Source app datalake links cannot be updated. Changing source_app_id or datalake_id replaces the link.",
            )],
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
        match client.delete_source_app_datalake_link(&id).await {
            Ok(()) => {
                info!(id = %id, "deleted source app datalake link");
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: api_error("Error deleting source app datalake link", &e),
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for SourceAppDatalakeLinkResource {
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
impl ResourceWithImportState for SourceAppDatalakeLinkResource {
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

impl ResourceHandle for SourceAppDatalakeLinkResource {
    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::grpc::plan_change;
    use tfplug::types::has_errors;

    #[tokio::test]
    async fn update_is_rejected_with_prior_state() {
        let resource = SourceAppDatalakeLinkResource::new();
        let prior = DynamicValue::new(object([("id", "link-1".into())]));

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: prior.clone(),
                    planned_state: DynamicValue::object(),
                    config: DynamicValue::object(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(has_errors(&response.diagnostics));
        assert_eq!(response.diagnostics[0].summary, "Update not supported");
        assert_eq!(response.new_state, prior);
    }

    #[tokio::test]
    async fn both_ends_force_replacement() {
        let resource = SourceAppDatalakeLinkResource::new();
        let schema = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;

        for name in ["source_app_id", "datalake_id"] {
            let attribute = schema.block.attribute(name).unwrap();
            assert!(attribute.required);
            assert_eq!(attribute.plan_modifiers.len(), 1);
        }
    }

    #[tokio::test]
    async fn recreated_source_app_replaces_the_link() {
        let resource = SourceAppDatalakeLinkResource::new();
        let schema = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;
        let prior = DynamicValue::new(object([
            ("id", "link-1".into()),
            ("source_app_id", "sa-1".into()),
            ("datalake_id", "dl-1".into()),
            ("hosting_environment_id", "he-1".into()),
            ("created_at", "2024-05-01T10:00:00Z".into()),
            ("updated_at", "2024-05-01T10:00:00Z".into()),
        ]));
        let mut proposed = prior.clone();
        proposed
            .mark_unknown(&AttributePath::new("source_app_id"))
            .unwrap();
        let mut config = DynamicValue::new(object([("datalake_id", "dl-1".into())]));
        config
            .mark_unknown(&AttributePath::new("source_app_id"))
            .unwrap();

        let plan = plan_change(&schema, &prior, proposed, &config);

        assert_eq!(
            plan.requires_replace,
            vec![AttributePath::new("source_app_id")]
        );
    }
}
