//! gRPC service implementation for the Provider trait
//!
//! This module implements the Terraform Plugin Protocol v6 on top of the
//! factory-based provider architecture: every RPC builds a fresh resource or
//! data source instance, configures it with the stored provider data and
//! drops it when the call completes.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceFactory, DataSourceHandle, DataSourceSchemaRequest,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::plan_modifier::values_equal;
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderSchemaRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceFactory, ResourceHandle,
    ResourceSchemaRequest, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{Attribute, ObjectNestingMode, PlanModifierRequest, Schema, StringKind};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason,
    Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue,
};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

/// gRPC front of a Provider
pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    provider_data: RwLock<ProviderData>,
    /// Root of every RPC context; StopProvider cancels it
    stop: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();
        Self {
            provider: Arc::new(RwLock::new(provider)),
            resources,
            data_sources,
            provider_data: RwLock::new(None),
            stop: Context::new(),
        }
    }

    /// Context for one RPC, cancelled by StopProvider
    fn context(&self) -> Context {
        self.stop.child()
    }

    async fn resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn ResourceHandle>, Vec<Diagnostic>), Status> {
        let factory = self
            .resources
            .get(type_name)
            .ok_or_else(|| crate::TfplugError::ResourceNotFound(type_name.to_string()))?;
        let mut resource = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        Ok((resource, response.diagnostics))
    }

    async fn data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn DataSourceHandle>, Vec<Diagnostic>), Status> {
        let factory = self
            .data_sources
            .get(type_name)
            .ok_or_else(|| crate::TfplugError::DataSourceNotFound(type_name.to_string()))?;
        let mut data_source = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        Ok((data_source, response.diagnostics))
    }

    async fn resource_schema(&self, ctx: &Context, resource: &dyn ResourceHandle) -> Schema {
        resource
            .schema(ctx.clone(), ResourceSchemaRequest)
            .await
            .schema
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> Result<Response<proto::get_metadata::Response>, Status> {
        let mut resources: Vec<_> = self
            .resources
            .keys()
            .map(|name| proto::get_metadata::ResourceMetadata {
                type_name: name.clone(),
            })
            .collect();
        resources.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        let mut data_sources: Vec<_> = self
            .data_sources
            .keys()
            .map(|name| proto::get_metadata::DataSourceMetadata {
                type_name: name.clone(),
            })
            .collect();
        data_sources.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources,
            resources,
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> Result<Response<proto::get_provider_schema::Response>, Status> {
        let ctx = self.context();
        let mut diagnostics = Vec::new();

        let provider_schema = {
            let provider = self.provider.read().await;
            let response = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            response.schema
        };

        let mut resource_schemas = HashMap::new();
        for (name, factory) in &self.resources {
            let resource = factory();
            let response = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(name.clone(), schema_to_proto(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (name, factory) in &self.data_sources {
            let data_source = factory();
            let response = data_source
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(name.clone(), schema_to_proto(&response.schema));
        }

        debug!(
            resources = resource_schemas.len(),
            data_sources = data_source_schemas.len(),
            "serving provider schema"
        );

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let config = decode_value(req.config.as_ref())?;

        let provider = self.provider.read().await;
        let schema = provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .await
            .schema;
        let mut diagnostics = schema.validate_config(&config);
        if !has_errors(&diagnostics) {
            let response = provider
                .validate(ctx, ValidateProviderConfigRequest { config })
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        let config = decode_value(req.config.as_ref())?;

        let schema = self.resource_schema(&ctx, resource.as_ref()).await;
        diagnostics.extend(schema.validate_config(&config));
        if !has_errors(&diagnostics) {
            let response = resource
                .validate(
                    ctx,
                    ValidateResourceConfigRequest {
                        type_name: req.type_name,
                        config,
                        client_capabilities: client_capabilities(req.client_capabilities),
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (data_source, mut diagnostics) = self.data_source(&ctx, &req.type_name).await?;
        let config = decode_value(req.config.as_ref())?;

        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await
            .schema;
        diagnostics.extend(schema.validate_config(&config));
        if !has_errors(&diagnostics) {
            let response = data_source
                .validate(
                    ctx,
                    ValidateDataSourceConfigRequest {
                        type_name: req.type_name,
                        config,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(
            proto::validate_data_resource_config::Response {
                diagnostics: diagnostics_to_proto(diagnostics),
            },
        ))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (resource, _) = self.resource(&ctx, &req.type_name).await?;
        let schema = self.resource_schema(&ctx, resource.as_ref()).await;

        let raw = req.raw_state.unwrap_or_default();
        if raw.json.is_empty() && !raw.flatmap.is_empty() {
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: diagnostics_to_proto(vec![Diagnostic::error(
                    "Unable to Upgrade Resource State",
                    format!(
                        "The stored state for {} uses the legacy flatmap format, which this provider cannot read.",
                        req.type_name
                    ),
                )]),
            }));
        }
        if req.version > schema.version {
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: diagnostics_to_proto(vec![Diagnostic::error(
                    "Unable to Upgrade Resource State",
                    format!(
                        "The stored state for {} has schema version {}, newer than the provider's version {}.",
                        req.type_name, req.version, schema.version
                    ),
                )]),
            }));
        }

        let state = DynamicValue::decode_json(&raw.json)?;
        debug!(type_name = %req.type_name, version = req.version, "upgrading resource state");

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_state(&schema, state)?),
            diagnostics: vec![],
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let config = decode_value(req.config.as_ref())?;

        info!(terraform_version = %req.terraform_version, "configuring provider");

        let response = {
            let mut provider = self.provider.write().await;
            provider
                .configure(
                    ctx,
                    ConfigureProviderRequest {
                        terraform_version: req.terraform_version,
                        config,
                        client_capabilities: client_capabilities(req.client_capabilities),
                    },
                )
                .await
        };

        if has_errors(&response.diagnostics) {
            warn!("provider configuration failed");
        } else {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        let current_state = decode_value(req.current_state.as_ref())?;

        if has_errors(&diagnostics) || current_state.is_null() {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: req.current_state,
                diagnostics: diagnostics_to_proto(diagnostics),
                private: req.private,
                deferred: None,
            }));
        }

        let schema = self.resource_schema(&ctx, resource.as_ref()).await;
        debug!(type_name = %req.type_name, "reading resource");

        let read = resource.read(
            ctx.clone(),
            ReadResourceRequest {
                type_name: req.type_name.clone(),
                current_state: current_state.clone(),
                private: req.private.clone(),
                provider_meta: decode_optional(req.provider_meta.as_ref())?,
                client_capabilities: client_capabilities(req.client_capabilities),
            },
        );

        let Some(response) = until_stopped(&ctx, read).await else {
            diagnostics.push(stopped_diagnostic());
            return Ok(Response::new(proto::read_resource::Response {
                new_state: req.current_state,
                diagnostics: diagnostics_to_proto(diagnostics),
                private: req.private,
                deferred: None,
            }));
        };

        diagnostics.extend(response.diagnostics);
        let new_state = if has_errors(&diagnostics) {
            current_state
        } else {
            match response.new_state {
                Some(state) => state,
                None => {
                    info!(type_name = %req.type_name, "resource no longer exists, removing from state");
                    DynamicValue::null()
                }
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_state(&schema, new_state)?),
            diagnostics: diagnostics_to_proto(diagnostics),
            private: response.private,
            deferred: response.deferred.map(deferred_to_proto),
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        let schema = self.resource_schema(&ctx, resource.as_ref()).await;

        let prior_state = decode_value(req.prior_state.as_ref())?;
        let proposed_new_state = decode_value(req.proposed_new_state.as_ref())?;
        let config = decode_value(req.config.as_ref())?;

        let plan = plan_change(&schema, &prior_state, proposed_new_state, &config);
        diagnostics.extend(plan.diagnostics);

        debug!(
            type_name = %req.type_name,
            requires_replace = plan.requires_replace.len(),
            "planned resource change"
        );

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_state(&schema, plan.planned_state)?),
            requires_replace: plan.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
            deferred: None,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        let schema = self.resource_schema(&ctx, resource.as_ref()).await;

        let prior_state = decode_value(req.prior_state.as_ref())?;
        let planned_state = decode_value(req.planned_state.as_ref())?;
        let config = decode_value(req.config.as_ref())?;
        let provider_meta = decode_optional(req.provider_meta.as_ref())?;

        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: Some(encode_state(&schema, prior_state)?),
                private: req.planned_private,
                diagnostics: diagnostics_to_proto(diagnostics),
                legacy_type_system: false,
            }));
        }

        let (new_state, private) = match (prior_state.is_null(), planned_state.is_null()) {
            (true, true) => (DynamicValue::null(), Vec::new()),
            (true, false) => {
                info!(type_name = %req.type_name, "creating resource");
                let create = resource.create(
                    ctx.clone(),
                    CreateResourceRequest {
                        type_name: req.type_name.clone(),
                        planned_state,
                        config,
                        planned_private: req.planned_private.clone(),
                        provider_meta,
                    },
                );
                match until_stopped(&ctx, create).await {
                    Some(response) => {
                        diagnostics.extend(response.diagnostics);
                        if has_errors(&diagnostics) {
                            (DynamicValue::null(), Vec::new())
                        } else {
                            (response.new_state, response.private)
                        }
                    }
                    None => {
                        diagnostics.push(stopped_diagnostic());
                        (DynamicValue::null(), Vec::new())
                    }
                }
            }
            (false, true) => {
                info!(type_name = %req.type_name, "deleting resource");
                let delete = resource.delete(
                    ctx.clone(),
                    DeleteResourceRequest {
                        type_name: req.type_name.clone(),
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private.clone(),
                        provider_meta,
                    },
                );
                match until_stopped(&ctx, delete).await {
                    Some(response) => {
                        diagnostics.extend(response.diagnostics);
                        if has_errors(&diagnostics) {
                            (prior_state, req.planned_private)
                        } else {
                            (DynamicValue::null(), Vec::new())
                        }
                    }
                    None => {
                        diagnostics.push(stopped_diagnostic());
                        (prior_state, req.planned_private)
                    }
                }
            }
            (false, false) => {
                info!(type_name = %req.type_name, "updating resource");
                let update = resource.update(
                    ctx.clone(),
                    UpdateResourceRequest {
                        type_name: req.type_name.clone(),
                        prior_state: prior_state.clone(),
                        planned_state,
                        config,
                        planned_private: req.planned_private.clone(),
                        provider_meta,
                    },
                );
                match until_stopped(&ctx, update).await {
                    Some(response) => {
                        diagnostics.extend(response.diagnostics);
                        if has_errors(&diagnostics) {
                            (prior_state, req.planned_private)
                        } else {
                            (response.new_state, response.private)
                        }
                    }
                    None => {
                        diagnostics.push(stopped_diagnostic());
                        (prior_state, req.planned_private)
                    }
                }
            }
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_state(&schema, new_state)?),
            private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        let schema = self.resource_schema(&ctx, resource.as_ref()).await;

        let Some(importable) = resource.as_importable() else {
            diagnostics.push(Diagnostic::error(
                "Resource Import Not Implemented",
                format!(
                    "This resource does not support import. Please contact the provider developer for additional information. Resource type: {}",
                    req.type_name
                ),
            ));
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: None,
            }));
        };

        info!(type_name = %req.type_name, id = %req.id, "importing resource");
        let response = importable
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: client_capabilities(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode_state(&schema, imported.state)?),
                private: imported.private,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: response.deferred.map(deferred_to_proto),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        let ctx = self.context();
        let (data_source, mut diagnostics) = self.data_source(&ctx, &req.type_name).await?;
        let config = decode_value(req.config.as_ref())?;

        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_data_source::Response {
                state: None,
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: None,
            }));
        }

        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await
            .schema;
        debug!(type_name = %req.type_name, "reading data source");

        let read = data_source.read(
            ctx.clone(),
            ReadDataSourceRequest {
                type_name: req.type_name,
                config,
                provider_meta: decode_optional(req.provider_meta.as_ref())?,
                client_capabilities: client_capabilities(req.client_capabilities),
            },
        );

        let Some(response) = until_stopped(&ctx, read).await else {
            diagnostics.push(stopped_diagnostic());
            return Ok(Response::new(proto::read_data_source::Response {
                state: None,
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: None,
            }));
        };
        diagnostics.extend(response.diagnostics);

        let state = if has_errors(&diagnostics) {
            None
        } else {
            Some(encode_state(&schema, response.state)?)
        };

        Ok(Response::new(proto::read_data_source::Response {
            state,
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: response.deferred.map(deferred_to_proto),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> Result<Response<proto::stop_provider::Response>, Status> {
        info!("stop requested, cancelling in-flight operations");
        self.stop.cancel();
        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

/// Outcome of planning a resource change
#[derive(Debug)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Computes the planned state from the proposal Terraform sends
///
/// Computed attributes left unset in configuration become unknown on create
/// and whenever the proposal changes something; plan modifiers then run in
/// declaration order.
pub fn plan_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed_new_state: DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let mut planned_state = proposed_new_state;
    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    if planned_state.is_null() {
        return PlannedChange {
            planned_state,
            requires_replace,
            diagnostics,
        };
    }

    schema.conform(&mut planned_state);

    let mut prior = prior_state.clone();
    schema.conform(&mut prior);
    let changed = prior.is_null() || !values_equal(&prior.value, &planned_state.value);

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        let config_value = config.get(&path).cloned().unwrap_or(Dynamic::Null);

        if changed && attr.computed && config_value.is_null() {
            set_top_level(&mut planned_state, &attr.name, Dynamic::Unknown);
        }

        if attr.plan_modifiers.is_empty() {
            continue;
        }

        let state_value = prior.get(&path).cloned().unwrap_or(Dynamic::Null);
        let mut plan_value = planned_state.get(&path).cloned().unwrap_or(Dynamic::Null);

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: config_value.clone(),
                state_value: state_value.clone(),
                plan_value,
                path: path.clone(),
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !requires_replace.contains(&path) {
                requires_replace.push(path.clone());
            }
        }

        set_top_level(&mut planned_state, &attr.name, plan_value);
    }

    PlannedChange {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

fn set_top_level(state: &mut DynamicValue, name: &str, value: Dynamic) {
    if let Dynamic::Map(values) = &mut state.value {
        values.insert(name.to_string(), value);
    }
}

async fn until_stopped<F: Future>(ctx: &Context, operation: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        output = operation => Some(output),
        _ = ctx.cancelled() => None,
    }
}

fn stopped_diagnostic() -> Diagnostic {
    Diagnostic::error(
        "Provider stopped",
        "Terraform asked the provider to stop before the operation completed. The remote object may have been partially changed.",
    )
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: true,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

fn client_capabilities(capabilities: Option<proto::ClientCapabilities>) -> ClientCapabilities {
    capabilities
        .map(|c| ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
}

/// Decode a DynamicValue from the wire, msgpack preferred over JSON
fn decode_value(value: Option<&proto::DynamicValue>) -> crate::Result<DynamicValue> {
    match value {
        None => Ok(DynamicValue::null()),
        Some(v) if !v.msgpack.is_empty() => DynamicValue::decode_msgpack(&v.msgpack),
        Some(v) => DynamicValue::decode_json(&v.json),
    }
}

fn decode_optional(value: Option<&proto::DynamicValue>) -> crate::Result<Option<DynamicValue>> {
    value.map(|v| decode_value(Some(v))).transpose()
}

/// Conform a state to its schema and encode it as msgpack
fn encode_state(schema: &Schema, mut state: DynamicValue) -> crate::Result<proto::DynamicValue> {
    schema.conform(&mut state);
    Ok(proto::DynamicValue {
        msgpack: state.encode_msgpack()?,
        json: vec![],
    })
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| proto::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            } as i32,
            summary: d.summary,
            detail: d.detail,
            attribute: d.attribute.as_ref().map(path_to_proto),
        })
        .collect()
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn deferred_to_proto(deferred: Deferred) -> proto::Deferred {
    let reason = match deferred.reason {
        DeferredReason::Unknown => proto::deferred::Reason::Unknown,
        DeferredReason::ResourceConfigUnknown => proto::deferred::Reason::ResourceConfigUnknown,
        DeferredReason::ProviderConfigUnknown => proto::deferred::Reason::ProviderConfigUnknown,
        DeferredReason::AbsentPrereq => proto::deferred::Reason::AbsentPrereq,
    };
    proto::Deferred {
        reason: reason as i32,
    }
}

fn string_kind_to_proto(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

/// Convert a framework schema to its protobuf form
pub fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.block.version,
            attributes: schema.block.attributes.iter().map(attribute_to_proto).collect(),
            block_types: vec![],
            description: schema.block.description.clone(),
            description_kind: string_kind_to_proto(schema.block.description_kind),
            deprecated: schema.block.deprecated,
        }),
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    // Terraform expects either a type or a nested type, never both
    let (r#type, nested_type) = match &attr.nested_type {
        Some(nested) => {
            let nesting = match nested.nesting {
                ObjectNestingMode::Single => proto::schema::object::NestingMode::Single,
                ObjectNestingMode::List => proto::schema::object::NestingMode::List,
                ObjectNestingMode::Set => proto::schema::object::NestingMode::Set,
                ObjectNestingMode::Map => proto::schema::object::NestingMode::Map,
            };
            (
                Vec::new(),
                Some(proto::schema::Object {
                    attributes: nested.attributes.iter().map(attribute_to_proto).collect(),
                    nesting: nesting as i32,
                }),
            )
        }
        None => (attr.r#type.to_json_bytes(), None),
    };

    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type,
        nested_type,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attr.deprecated,
        write_only: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_modifier::{RequiresReplace, UseStateForUnknown};
    use crate::schema::{AttributeBuilder, SchemaBuilder};

    fn datalake_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("project_id")
                    .required()
                    .plan_modifier(Box::new(RequiresReplace))
                    .build(),
            )
            .attribute(AttributeBuilder::string("name").required().build())
            .attribute(AttributeBuilder::string("updated_at").computed().build())
            .build()
    }

    fn state(pairs: &[(&str, &str)]) -> DynamicValue {
        let mut value = DynamicValue::object();
        for (name, v) in pairs {
            value
                .set_string(&AttributePath::new(name), v.to_string())
                .unwrap();
        }
        value
    }

    #[test]
    fn plan_marks_computed_unknown_on_create() {
        let schema = datalake_schema();
        let config = state(&[("project_id", "p1"), ("name", "lake")]);

        let plan = plan_change(&schema, &DynamicValue::null(), config.clone(), &config);

        let planned = plan.planned_state;
        assert!(planned.get(&AttributePath::new("id")).unwrap().is_unknown());
        assert!(planned
            .get(&AttributePath::new("updated_at"))
            .unwrap()
            .is_unknown());
        assert_eq!(planned.get_string(&AttributePath::new("name")).unwrap(), "lake");
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn plan_keeps_prior_values_when_nothing_changed() {
        let schema = datalake_schema();
        let prior = state(&[
            ("id", "dl-1"),
            ("project_id", "p1"),
            ("name", "lake"),
            ("updated_at", "2024-01-01T00:00:00Z"),
        ]);
        let config = state(&[("project_id", "p1"), ("name", "lake")]);

        let plan = plan_change(&schema, &prior, prior.clone(), &config);

        assert_eq!(plan.planned_state, prior);
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn plan_update_reuses_id_and_recomputes_timestamps() {
        let schema = datalake_schema();
        let prior = state(&[
            ("id", "dl-1"),
            ("project_id", "p1"),
            ("name", "lake"),
            ("updated_at", "2024-01-01T00:00:00Z"),
        ]);
        let proposed = state(&[
            ("id", "dl-1"),
            ("project_id", "p1"),
            ("name", "renamed"),
            ("updated_at", "2024-01-01T00:00:00Z"),
        ]);
        let config = state(&[("project_id", "p1"), ("name", "renamed")]);

        let plan = plan_change(&schema, &prior, proposed, &config);

        let planned = plan.planned_state;
        assert_eq!(planned.get_string(&AttributePath::new("id")).unwrap(), "dl-1");
        assert!(planned
            .get(&AttributePath::new("updated_at"))
            .unwrap()
            .is_unknown());
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn plan_flags_replacement_for_changed_parent() {
        let schema = datalake_schema();
        let prior = state(&[("id", "dl-1"), ("project_id", "p1"), ("name", "lake")]);
        let proposed = state(&[("id", "dl-1"), ("project_id", "p2"), ("name", "lake")]);
        let config = state(&[("project_id", "p2"), ("name", "lake")]);

        let plan = plan_change(&schema, &prior, proposed, &config);

        assert_eq!(plan.requires_replace, vec![AttributePath::new("project_id")]);
    }

    #[test]
    fn plan_flags_replacement_when_parent_is_being_recreated() {
        let schema = datalake_schema();
        let prior = state(&[
            ("id", "dl-1"),
            ("project_id", "p1"),
            ("name", "lake"),
            ("updated_at", "2024-01-01T00:00:00Z"),
        ]);
        let mut proposed = prior.clone();
        proposed
            .mark_unknown(&AttributePath::new("project_id"))
            .unwrap();
        let mut config = state(&[("name", "lake")]);
        config.mark_unknown(&AttributePath::new("project_id")).unwrap();

        let plan = plan_change(&schema, &prior, proposed, &config);

        assert_eq!(plan.requires_replace, vec![AttributePath::new("project_id")]);
        assert!(plan
            .planned_state
            .get(&AttributePath::new("project_id"))
            .unwrap()
            .is_unknown());
    }

    #[test]
    fn plan_destroy_is_null() {
        let schema = datalake_schema();
        let prior = state(&[("id", "dl-1"), ("project_id", "p1"), ("name", "lake")]);

        let plan = plan_change(&schema, &prior, DynamicValue::null(), &DynamicValue::null());

        assert!(plan.planned_state.is_null());
        assert!(plan.requires_replace.is_empty());
    }

    #[test]
    fn nested_attributes_convert_to_objects() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::nested(
                    "infrastructure",
                    ObjectNestingMode::Single,
                    vec![AttributeBuilder::string("bucket").optional().build()],
                )
                .optional()
                .build(),
            )
            .build();

        let converted = schema_to_proto(&schema);
        let block = converted.block.unwrap();
        let attr = &block.attributes[0];
        assert!(attr.r#type.is_empty());
        let nested = attr.nested_type.as_ref().unwrap();
        assert_eq!(
            nested.nesting,
            proto::schema::object::NestingMode::Single as i32
        );
        assert_eq!(nested.attributes[0].name, "bucket");
        assert_eq!(nested.attributes[0].r#type, b"\"string\"".to_vec());
    }

    #[test]
    fn diagnostics_keep_attribute_paths() {
        let diags = diagnostics_to_proto(vec![Diagnostic::error("bad", "worse")
            .with_attribute(AttributePath::new("items").index(1).attribute("name"))]);

        assert_eq!(diags[0].severity, proto::diagnostic::Severity::Error as i32);
        let steps = &diags[0].attribute.as_ref().unwrap().steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1].selector,
            Some(proto::attribute_path::step::Selector::ElementKeyInt(1))
        );
    }

    #[test]
    fn json_payloads_decode_when_msgpack_is_empty() {
        let value = proto::DynamicValue {
            msgpack: vec![],
            json: br#"{"name":"lake"}"#.to_vec(),
        };
        let decoded = decode_value(Some(&value)).unwrap();
        assert_eq!(decoded.get_string(&AttributePath::new("name")).unwrap(), "lake");
        assert!(decode_value(None).unwrap().is_null());
    }
}
