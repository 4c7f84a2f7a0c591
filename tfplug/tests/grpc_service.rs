//! End-to-end tests of the gRPC provider service with an in-memory provider

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tfplug::context::Context;
use tfplug::data_source::*;
use tfplug::grpc::GrpcProviderServer;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::proto::{self, ProviderService};
use tfplug::provider::*;
use tfplug::resource::*;
use tfplug::schema::ObjectNestingMode;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::{import_state_passthrough_id, AttributeBuilder, Schema, SchemaBuilder};
use tonic::Request;

#[derive(Default)]
struct Store {
    widgets: Mutex<HashMap<String, String>>,
    next_id: AtomicU64,
}

struct TestProvider;

#[async_trait]
impl Provider for TestProvider {
    fn type_name(&self) -> &str {
        "tfplugtest"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "tfplugtest".to_string(),
            version: "0.0.1".to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(AttributeBuilder::string("label").optional().build())
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(Store::default())),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "tfplugtest_widget".to_string(),
            Box::new(|| -> Box<dyn ResourceHandle> { Box::new(WidgetResource { store: None }) }),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "tfplugtest_widgets".to_string(),
            Box::new(|| -> Box<dyn DataSourceHandle> {
                Box::new(WidgetsDataSource { store: None })
            }),
        );
        data_sources
    }
}

struct WidgetResource {
    store: Option<Arc<Store>>,
}

fn widget_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::string("id")
                .computed()
                .plan_modifier(Box::new(UseStateForUnknown))
                .build(),
        )
        .attribute(AttributeBuilder::string("name").required().build())
        .attribute(
            AttributeBuilder::string("kind")
                .required()
                .plan_modifier(Box::new(RequiresReplace))
                .build(),
        )
        .attribute(AttributeBuilder::string("updated_at").computed().build())
        .build()
}

fn not_configured() -> Diagnostic {
    Diagnostic::error("Provider not configured", "no store")
}

#[async_trait]
impl Resource for WidgetResource {
    fn type_name(&self) -> &str {
        "tfplugtest_widget"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: widget_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if request.config.get_string_opt(&AttributePath::new("name")).as_deref() == Some("") {
            diagnostics.push(
                Diagnostic::error("Invalid name", "name must not be empty")
                    .with_attribute(AttributePath::new("name")),
            );
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(store) = &self.store else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let name = request
            .planned_state
            .get_string(&AttributePath::new("name"))
            .unwrap();
        if name == "slow" {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if name == "broken" {
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error("Error creating widget", "backend refused")],
            };
        }

        let id = format!("w-{}", store.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        store.widgets.lock().unwrap().insert(id.clone(), name);

        let mut state = request.planned_state;
        state.set_string(&AttributePath::new("id"), id).unwrap();
        state
            .set_string(
                &AttributePath::new("updated_at"),
                "2024-01-01T00:00:00Z".to_string(),
            )
            .unwrap();
        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let store = self.store.as_ref().unwrap();
        let id = request
            .current_state
            .get_string_opt(&AttributePath::new("id"))
            .unwrap_or_default();
        let name = store.widgets.lock().unwrap().get(&id).cloned();

        let new_state = name.map(|name| {
            let mut state = request.current_state.clone();
            state.set_string(&AttributePath::new("name"), name).unwrap();
            state
        });
        ReadResourceResponse {
            new_state,
            diagnostics: vec![],
            private: request.private,
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let store = self.store.as_ref().unwrap();
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let name = request
            .planned_state
            .get_string(&AttributePath::new("name"))
            .unwrap();
        store.widgets.lock().unwrap().insert(id, name);

        let mut state = request.planned_state;
        state
            .set_string(
                &AttributePath::new("updated_at"),
                "2024-02-01T00:00:00Z".to_string(),
            )
            .unwrap();
        UpdateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let store = self.store.as_ref().unwrap();
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let removed = store.widgets.lock().unwrap().remove(&id);
        let diagnostics = match removed {
            Some(_) => vec![],
            None => vec![Diagnostic::error("Error deleting widget", "not found")],
        };
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for WidgetResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        if let Some(data) = request.provider_data {
            self.store = data.downcast::<Store>().ok();
        }
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithImportState for WidgetResource {
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

impl ResourceHandle for WidgetResource {
    fn as_importable(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

struct WidgetsDataSource {
    store: Option<Arc<Store>>,
}

#[async_trait]
impl DataSource for WidgetsDataSource {
    fn type_name(&self) -> &str {
        "tfplugtest_widgets"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::nested(
                        "widgets",
                        ObjectNestingMode::List,
                        vec![
                            AttributeBuilder::string("id").computed().build(),
                            AttributeBuilder::string("name").computed().build(),
                        ],
                    )
                    .computed()
                    .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(store) = &self.store else {
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: vec![not_configured()],
                deferred: None,
            };
        };
        let mut names: Vec<_> = store.widgets.lock().unwrap().values().cloned().collect();
        names.sort();

        // Only names are set; the framework fills the missing id with null
        let items = names
            .into_iter()
            .map(|name| Dynamic::Map(HashMap::from([("name".to_string(), Dynamic::String(name))])))
            .collect();

        let mut state = DynamicValue::object();
        state
            .set_list(&AttributePath::new("widgets"), items)
            .unwrap();
        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for WidgetsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        if let Some(data) = request.provider_data {
            self.store = data.downcast::<Store>().ok();
        }
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

fn wire(value: &DynamicValue) -> Option<proto::DynamicValue> {
    Some(proto::DynamicValue {
        msgpack: value.encode_msgpack().unwrap(),
        json: vec![],
    })
}

fn unwire(value: Option<proto::DynamicValue>) -> DynamicValue {
    DynamicValue::decode_msgpack(&value.unwrap().msgpack).unwrap()
}

fn widget(pairs: &[(&str, &str)]) -> DynamicValue {
    let mut value = DynamicValue::object();
    for (name, v) in pairs {
        value
            .set_string(&AttributePath::new(name), v.to_string())
            .unwrap();
    }
    value
}

async fn configured_server() -> GrpcProviderServer<TestProvider> {
    let server = GrpcProviderServer::new(TestProvider);
    let response = server
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: wire(&DynamicValue::object()),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(response.diagnostics.is_empty());
    server
}

async fn apply(
    server: &GrpcProviderServer<TestProvider>,
    prior: &DynamicValue,
    planned: &DynamicValue,
) -> proto::apply_resource_change::Response {
    server
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "tfplugtest_widget".to_string(),
            prior_state: wire(prior),
            planned_state: wire(planned),
            config: wire(planned),
            planned_private: vec![],
            provider_meta: None,
        }))
        .await
        .unwrap()
        .into_inner()
}

#[tokio::test]
async fn metadata_lists_resources_and_data_sources() {
    let server = GrpcProviderServer::new(TestProvider);
    let response = server
        .get_metadata(Request::new(proto::get_metadata::Request {}))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.resources.len(), 1);
    assert_eq!(response.resources[0].type_name, "tfplugtest_widget");
    assert_eq!(response.data_sources[0].type_name, "tfplugtest_widgets");
    assert!(response.server_capabilities.unwrap().plan_destroy);
}

#[tokio::test]
async fn provider_schema_contains_every_type() {
    let server = GrpcProviderServer::new(TestProvider);
    let response = server
        .get_provider_schema(Request::new(proto::get_provider_schema::Request {}))
        .await
        .unwrap()
        .into_inner();

    assert!(response.provider.is_some());
    let widget = response.resource_schemas.get("tfplugtest_widget").unwrap();
    let block = widget.block.as_ref().unwrap();
    assert_eq!(block.attributes.len(), 4);
    let id = block.attributes.iter().find(|a| a.name == "id").unwrap();
    assert!(id.computed);
    assert_eq!(id.r#type, b"\"string\"".to_vec());

    let widgets = response
        .data_source_schemas
        .get("tfplugtest_widgets")
        .unwrap();
    let list = &widgets.block.as_ref().unwrap().attributes[0];
    assert!(list.nested_type.is_some());
}

#[tokio::test]
async fn validate_runs_framework_and_resource_checks() {
    let server = GrpcProviderServer::new(TestProvider);

    let missing = server
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "tfplugtest_widget".to_string(),
            config: wire(&widget(&[("name", "a")])),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(missing.diagnostics.len(), 1);
    assert_eq!(missing.diagnostics[0].summary, "Missing required argument");

    let empty_name = server
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "tfplugtest_widget".to_string(),
            config: wire(&widget(&[("name", ""), ("kind", "round")])),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(empty_name.diagnostics.len(), 1);
    assert_eq!(empty_name.diagnostics[0].summary, "Invalid name");
}

#[tokio::test]
async fn unknown_resource_type_is_not_found() {
    let server = GrpcProviderServer::new(TestProvider);
    let status = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "tfplugtest_nope".to_string(),
            current_state: wire(&widget(&[("id", "x")])),
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::NotFound);
}

#[tokio::test]
async fn plan_create_marks_computed_unknown() {
    let server = configured_server().await;
    let config = widget(&[("name", "a"), ("kind", "round")]);

    let response = server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "tfplugtest_widget".to_string(),
            prior_state: wire(&DynamicValue::null()),
            proposed_new_state: wire(&config),
            config: wire(&config),
            prior_private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    let planned = unwire(response.planned_state);
    assert!(planned.get(&AttributePath::new("id")).unwrap().is_unknown());
    assert!(planned
        .get(&AttributePath::new("updated_at"))
        .unwrap()
        .is_unknown());
    assert!(response.requires_replace.is_empty());
}

#[tokio::test]
async fn plan_flags_replacement() {
    let server = configured_server().await;
    let prior = widget(&[
        ("id", "w-1"),
        ("name", "a"),
        ("kind", "round"),
        ("updated_at", "2024-01-01T00:00:00Z"),
    ]);
    let proposed = widget(&[
        ("id", "w-1"),
        ("name", "a"),
        ("kind", "square"),
        ("updated_at", "2024-01-01T00:00:00Z"),
    ]);

    let response = server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "tfplugtest_widget".to_string(),
            prior_state: wire(&prior),
            proposed_new_state: wire(&proposed),
            config: wire(&widget(&[("name", "a"), ("kind", "square")])),
            prior_private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.requires_replace.len(), 1);
    let planned = unwire(response.planned_state);
    assert_eq!(planned.get_string(&AttributePath::new("id")).unwrap(), "w-1");
}

#[tokio::test]
async fn apply_create_update_delete_lifecycle() {
    let server = configured_server().await;

    let created = apply(
        &server,
        &DynamicValue::null(),
        &widget(&[("name", "a"), ("kind", "round")]),
    )
    .await;
    assert!(created.diagnostics.is_empty());
    let state = unwire(created.new_state);
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "w-1");

    let mut renamed = state.clone();
    renamed
        .set_string(&AttributePath::new("name"), "b".to_string())
        .unwrap();
    let updated = apply(&server, &state, &renamed).await;
    assert!(updated.diagnostics.is_empty());
    let state = unwire(updated.new_state);
    assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "b");
    assert_eq!(
        state.get_string(&AttributePath::new("updated_at")).unwrap(),
        "2024-02-01T00:00:00Z"
    );

    let deleted = apply(&server, &state, &DynamicValue::null()).await;
    assert!(deleted.diagnostics.is_empty());
    assert!(unwire(deleted.new_state).is_null());
}

#[tokio::test]
async fn failed_create_returns_null_state() {
    let server = configured_server().await;
    let response = apply(
        &server,
        &DynamicValue::null(),
        &widget(&[("name", "broken"), ("kind", "round")]),
    )
    .await;

    assert_eq!(response.diagnostics[0].summary, "Error creating widget");
    assert!(unwire(response.new_state).is_null());
}

#[tokio::test]
async fn failed_delete_keeps_prior_state() {
    let server = configured_server().await;
    let prior = widget(&[("id", "w-404"), ("name", "a"), ("kind", "round")]);

    let response = apply(&server, &prior, &DynamicValue::null()).await;

    assert_eq!(response.diagnostics[0].summary, "Error deleting widget");
    let state = unwire(response.new_state);
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "w-404");
    assert!(state.get(&AttributePath::new("updated_at")).unwrap().is_null());
}

#[tokio::test]
async fn read_of_missing_resource_removes_it() {
    let server = configured_server().await;
    let response = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "tfplugtest_widget".to_string(),
            current_state: wire(&widget(&[("id", "w-99"), ("name", "a"), ("kind", "round")])),
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    assert!(unwire(response.new_state).is_null());
}

#[tokio::test]
async fn import_writes_id_and_conforms_state() {
    let server = configured_server().await;
    let response = server
        .import_resource_state(Request::new(proto::import_resource_state::Request {
            type_name: "tfplugtest_widget".to_string(),
            id: "w-7".to_string(),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.imported_resources.len(), 1);
    let state = unwire(response.imported_resources[0].state.clone());
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "w-7");
    assert!(state.get(&AttributePath::new("name")).unwrap().is_null());
}

#[tokio::test]
async fn upgrade_reencodes_json_state() {
    let server = GrpcProviderServer::new(TestProvider);
    let response = server
        .upgrade_resource_state(Request::new(proto::upgrade_resource_state::Request {
            type_name: "tfplugtest_widget".to_string(),
            version: 0,
            raw_state: Some(proto::RawState {
                json: br#"{"id":"w-1","name":"a","kind":"round","legacy":"x"}"#.to_vec(),
                flatmap: HashMap::new(),
            }),
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    let state = unwire(response.upgraded_state);
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "w-1");
    assert!(state.get(&AttributePath::new("legacy")).is_none());
    assert!(state.get(&AttributePath::new("updated_at")).unwrap().is_null());
}

#[tokio::test]
async fn data_source_reads_conformed_list() {
    let server = configured_server().await;
    apply(
        &server,
        &DynamicValue::null(),
        &widget(&[("name", "a"), ("kind", "round")]),
    )
    .await;

    let response = server
        .read_data_source(Request::new(proto::read_data_source::Request {
            type_name: "tfplugtest_widgets".to_string(),
            config: wire(&DynamicValue::object()),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    let state = unwire(response.state);
    let widgets = state.get_list(&AttributePath::new("widgets")).unwrap();
    assert_eq!(widgets.len(), 1);
    let first = AttributePath::new("widgets").index(0);
    assert_eq!(state.get_string(&first.clone().attribute("name")).unwrap(), "a");
    assert!(state.get(&first.attribute("id")).unwrap().is_null());
}

#[tokio::test]
async fn data_source_without_configuration_reports_error() {
    let server = GrpcProviderServer::new(TestProvider);
    let response = server
        .read_data_source(Request::new(proto::read_data_source::Request {
            type_name: "tfplugtest_widgets".to_string(),
            config: wire(&DynamicValue::object()),
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    assert!(response.state.is_none());
}

#[tokio::test]
async fn stop_provider_cancels_in_flight_apply() {
    let server = Arc::new(configured_server().await);

    let in_flight = {
        let server = server.clone();
        tokio::spawn(async move {
            apply(
                &server,
                &DynamicValue::null(),
                &widget(&[("name", "slow"), ("kind", "round")]),
            )
            .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stop = server
        .stop_provider(Request::new(proto::stop_provider::Request {}))
        .await
        .unwrap()
        .into_inner();
    assert!(stop.error.is_empty());

    let response = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.diagnostics[0].summary, "Provider stopped");
    assert!(unwire(response.new_state).is_null());
}
