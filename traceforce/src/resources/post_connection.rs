//! Post-connection event for a project
//!
//! Reports the infrastructure deployed on the customer side once a project
//! is connected. The event itself has no server-side lifecycle: state tracks
//! the project it was sent for.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceHandle, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, ObjectNestingMode, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tracing::info;

use super::{replacing_attribute, stable_computed, volatile_computed};
use crate::api::hosting_environments::{
    BaseInfrastructure, BigQueryInfrastructure, HostingEnvironment, Infrastructure,
    PostConnectionRequest, SalesforceInfrastructure,
};
use crate::api::Client;
use crate::state::{api_error, configured_client, downcast_provider_data, required_string, rfc3339};
use crate::TraceforceProviderData;

pub const TYPE_NAME: &str = "traceforce_post_connection";

const BASE_FIELDS: [&str; 5] = [
    "dataplane_identity_identifier",
    "workload_identity_provider_name",
    "auth_view_generator_function_name",
    "auth_view_generator_function_url",
    "traceforce_bucket_name",
];
const BIGQUERY_FIELDS: [&str; 2] = ["traceforce_schema", "events_subscription_name"];
const SALESFORCE_FIELDS: [&str; 3] = [
    "salesforce_client_id",
    "salesforce_domain",
    "salesforce_client_secret",
];

#[derive(Default)]
pub struct PostConnectionResource {
    provider_data: Option<TraceforceProviderData>,
}

impl PostConnectionResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn extract_request(value: &DynamicValue) -> PostConnectionRequest {
        PostConnectionRequest {
            infrastructure: extract_infrastructure(value),
            terraform_url: value.get_string_opt(&AttributePath::new("terraform_url")),
            terraform_module_versions: value
                .get_string_opt(&AttributePath::new("terraform_module_versions")),
            terraform_module_versions_hash: value
                .get_string_opt(&AttributePath::new("terraform_module_versions_hash")),
            deployed_datalake_ids: value
                .get_string_list_opt(&AttributePath::new("deployed_datalake_ids")),
            deployed_source_app_ids: value
                .get_string_list_opt(&AttributePath::new("deployed_source_app_ids")),
        }
    }

    /// Sends the event and merges the returned project into the planned state
    async fn execute(
        client: &Client,
        planned_state: &DynamicValue,
    ) -> Result<DynamicValue, Vec<Diagnostic>> {
        let project_id = required_string(planned_state, "project_id").map_err(|d| vec![d])?;
        let body = Self::extract_request(planned_state);

        let env = client
            .post_connection(&project_id, &body)
            .await
            .map_err(|e| api_error("Error executing post-connection", &e))?;
        info!(project_id = %project_id, status = %env.status, "executed post-connection");

        let mut state = planned_state.clone();
        apply_computed(&mut state, &env)?;
        Ok(state)
    }
}

/// Object path of a nested infrastructure block, None when it is not set
fn block_path(value: &DynamicValue, block: &str) -> Option<AttributePath> {
    let path = AttributePath::new("infrastructure").attribute(block);
    matches!(value.get(&path), Some(Dynamic::Map(_))).then_some(path)
}

fn extract_infrastructure(value: &DynamicValue) -> Option<Infrastructure> {
    if !matches!(
        value.get(&AttributePath::new("infrastructure")),
        Some(Dynamic::Map(_))
    ) {
        return None;
    }

    let field = |path: &AttributePath, name: &str| value.get_string_opt(&path.clone().attribute(name));

    let base = block_path(value, "base").map(|p| BaseInfrastructure {
        dataplane_identity_identifier: field(&p, "dataplane_identity_identifier"),
        workload_identity_provider_name: field(&p, "workload_identity_provider_name"),
        auth_view_generator_function_name: field(&p, "auth_view_generator_function_name"),
        auth_view_generator_function_url: field(&p, "auth_view_generator_function_url"),
        traceforce_bucket_name: field(&p, "traceforce_bucket_name"),
    });
    let bigquery = block_path(value, "bigquery").map(|p| BigQueryInfrastructure {
        traceforce_schema: field(&p, "traceforce_schema"),
        events_subscription_name: field(&p, "events_subscription_name"),
    });
    let salesforce = block_path(value, "salesforce").map(|p| SalesforceInfrastructure {
        salesforce_client_id: field(&p, "salesforce_client_id"),
        salesforce_domain: field(&p, "salesforce_domain"),
        salesforce_client_secret: field(&p, "salesforce_client_secret"),
    });

    Some(Infrastructure {
        base,
        bigquery,
        salesforce,
    })
}

fn apply_computed(state: &mut DynamicValue, env: &HostingEnvironment) -> Result<(), Vec<Diagnostic>> {
    let fields = [
        ("id", env.id.clone()),
        ("status", env.status.clone()),
        ("created_at", rfc3339(&env.created_at)),
        ("updated_at", rfc3339(&env.updated_at)),
    ];

    for (name, value) in fields {
        state
            .set_string(&AttributePath::new(name), value)
            .map_err(|e| {
                vec![Diagnostic::error(
                    "Failed to set state",
                    format!("Could not set '{}': {}", name, e),
                )]
            })?;
    }
    Ok(())
}

fn optional_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .description(description)
        .optional()
        .build()
}

fn infrastructure_block(name: &str, description: &str, fields: &[&str]) -> Attribute {
    let attributes = fields
        .iter()
        .map(|field| {
            let builder = AttributeBuilder::string(field).optional();
            if *field == "salesforce_client_secret" {
                builder.sensitive().build()
            } else {
                builder.build()
            }
        })
        .collect();

    AttributeBuilder::nested(name, ObjectNestingMode::Single, attributes)
        .description(description)
        .optional()
        .build()
}

#[async_trait]
impl Resource for PostConnectionResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let infrastructure = AttributeBuilder::nested(
            "infrastructure",
            ObjectNestingMode::Single,
            vec![
                infrastructure_block("base", "Base infrastructure of the dataplane.", &BASE_FIELDS),
                infrastructure_block(
                    "bigquery",
                    "BigQuery datalake infrastructure.",
                    &BIGQUERY_FIELDS,
                ),
                infrastructure_block(
                    "salesforce",
                    "Salesforce source app infrastructure.",
                    &SALESFORCE_FIELDS,
                ),
            ],
        )
        .description("Infrastructure deployed for the project.")
        .optional()
        .build();

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Notifies Traceforce that a project's infrastructure has been deployed.")
            .attribute(replacing_attribute(
                "project_id",
                "ID of the project the post-connection event is sent for.",
            ))
            .attribute(infrastructure)
            .attribute(optional_string(
                "terraform_url",
                "URL of the Terraform configuration that deployed the infrastructure.",
            ))
            .attribute(optional_string(
                "terraform_module_versions",
                "Versions of the Terraform modules that were deployed.",
            ))
            .attribute(optional_string(
                "terraform_module_versions_hash",
                "Hash of the deployed Terraform module versions.",
            ))
            .attribute(
                AttributeBuilder::new(
                    "deployed_datalake_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("IDs of the datalakes that were deployed.")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "deployed_source_app_ids",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("IDs of the source apps that were deployed.")
                .optional()
                .build(),
            )
            .attribute(stable_computed("id", "ID of the project"))
            .attribute(volatile_computed("status", "Status of the project"))
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

        match Self::execute(client, &request.planned_state).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(diagnostics) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
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

        let project_id = request
            .current_state
            .get_string_opt(&AttributePath::new("project_id"))
            .unwrap_or_default();

        match client.get_hosting_environment(&project_id).await {
            Ok(env) => {
                let mut state = request.current_state.clone();
                match apply_computed(&mut state, &env) {
                    Ok(()) => ReadResourceResponse {
                        new_state: Some(state),
                        diagnostics: vec![],
                        private: request.private,
                        deferred: None,
                    },
                    Err(diagnostics) => ReadResourceResponse {
                        new_state: Some(request.current_state),
                        diagnostics,
                        private: request.private,
                        deferred: None,
                    },
                }
            }
            Err(e) if e.is_not_found() => {
                info!(project_id = %project_id, "project for post-connection no longer exists");
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

        match Self::execute(client, &request.planned_state).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(diagnostics) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            },
        }
    }

    /// Events cannot be revoked, so removal only drops state
    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let project_id = request
            .prior_state
            .get_string_opt(&AttributePath::new("project_id"))
            .unwrap_or_default();
        info!(project_id = %project_id, "removed post-connection from state");
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for PostConnectionResource {
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
impl ResourceWithImportState for PostConnectionResource {
    /// The import ID is the project id
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut state = DynamicValue::object();
        let mut diagnostics = vec![];

        for name in ["project_id", "id"] {
            if let Err(e) = state.set_string(&AttributePath::new(name), request.id.clone()) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Failed to set import ID: {}", e),
                        format!("Could not set attribute '{}' to value '{}'", name, request.id),
                    )
                    .with_attribute(AttributePath::new(name)),
                );
            }
        }

        let imported_resources = if diagnostics.is_empty() {
            vec![ImportedResource {
                type_name: request.type_name,
                state,
                private: vec![],
            }]
        } else {
            vec![]
        };

        ImportResourceStateResponse {
            imported_resources,
            diagnostics,
            deferred: None,
        }
    }
}

impl ResourceHandle for PostConnectionResource {
    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::object;
    use tfplug::types::ClientCapabilities;

    fn planned() -> DynamicValue {
        DynamicValue::new(object([
            ("project_id", "he-1".into()),
            (
                "infrastructure",
                object([
                    ("base", Dynamic::Null),
                    (
                        "bigquery",
                        object([
                            ("traceforce_schema", "tf_dataset".into()),
                            ("events_subscription_name", Dynamic::Null),
                        ]),
                    ),
                    (
                        "salesforce",
                        object([
                            ("salesforce_client_id", "client".into()),
                            ("salesforce_domain", "acme.my.salesforce.com".into()),
                            ("salesforce_client_secret", "secret".into()),
                        ]),
                    ),
                ]),
            ),
            ("terraform_url", "https://example.com/tf".into()),
            ("terraform_module_versions", Dynamic::Null),
            ("terraform_module_versions_hash", Dynamic::Null),
            (
                "deployed_datalake_ids",
                Dynamic::List(vec!["dl-1".into(), "dl-2".into()]),
            ),
            ("deployed_source_app_ids", Dynamic::Null),
            ("id", Dynamic::Unknown),
            ("status", Dynamic::Unknown),
            ("created_at", Dynamic::Unknown),
            ("updated_at", Dynamic::Unknown),
        ]))
    }

    #[test]
    fn request_follows_configured_blocks() {
        let request = PostConnectionResource::extract_request(&planned());
        let infrastructure = request.infrastructure.unwrap();

        assert_eq!(infrastructure.base, None);
        assert_eq!(
            infrastructure.bigquery,
            Some(BigQueryInfrastructure {
                traceforce_schema: Some("tf_dataset".to_string()),
                events_subscription_name: None,
            })
        );
        assert_eq!(
            infrastructure
                .salesforce
                .and_then(|s| s.salesforce_client_secret)
                .as_deref(),
            Some("secret")
        );
        assert_eq!(request.terraform_url.as_deref(), Some("https://example.com/tf"));
        assert_eq!(request.terraform_module_versions, None);
        assert_eq!(
            request.deployed_datalake_ids,
            Some(vec!["dl-1".to_string(), "dl-2".to_string()])
        );
        assert_eq!(request.deployed_source_app_ids, None);
    }

    #[test]
    fn missing_infrastructure_is_omitted() {
        let state = DynamicValue::new(object([
            ("project_id", "he-1".into()),
            ("infrastructure", Dynamic::Null),
        ]));
        let request = PostConnectionResource::extract_request(&state);
        assert_eq!(request.infrastructure, None);
    }

    #[tokio::test]
    async fn client_secret_is_sensitive() {
        let schema = PostConnectionResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;

        let infrastructure = schema.block.attribute("infrastructure").unwrap();
        let salesforce = infrastructure
            .nested_type
            .as_ref()
            .unwrap()
            .attributes
            .iter()
            .find(|a| a.name == "salesforce")
            .unwrap();
        let secret = salesforce
            .nested_type
            .as_ref()
            .unwrap()
            .attributes
            .iter()
            .find(|a| a.name == "salesforce_client_secret")
            .unwrap();
        assert!(secret.sensitive);
        assert!(secret.optional);
    }

    #[tokio::test]
    async fn import_sets_project_id_and_id() {
        let response = PostConnectionResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: "he-1".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("project_id")).unwrap(),
            "he-1"
        );
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "he-1");
    }

    #[tokio::test]
    async fn delete_needs_no_client() {
        let response = PostConnectionResource::new()
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: planned(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
    }
}
