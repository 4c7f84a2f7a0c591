//! Data source implementations
//!
//! Each data source lists one kind of Traceforce object into a computed
//! list attribute.

pub mod connections;
pub mod datalakes;
pub mod projects;
pub mod source_apps;

pub use connections::ConnectionsDataSource;
pub use datalakes::DatalakesDataSource;
pub use projects::ProjectsDataSource;
pub use source_apps::SourceAppsDataSource;

use tfplug::data_source::ReadDataSourceResponse;
use tfplug::schema::{Attribute, AttributeBuilder, ObjectNestingMode};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Computed list of objects whose fields are all computed strings
pub(crate) fn computed_list(name: &str, description: &str, fields: &[(&str, &str)]) -> Attribute {
    let attributes = fields
        .iter()
        .map(|(field, description)| {
            AttributeBuilder::string(field)
                .description(description)
                .computed()
                .build()
        })
        .collect();

    AttributeBuilder::nested(name, ObjectNestingMode::List, attributes)
        .description(description)
        .computed()
        .build()
}

pub(crate) fn optional_filter(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .description(description)
        .optional()
        .build()
}

/// Config with the listed items written to `attribute`
pub(crate) fn list_response(
    config: DynamicValue,
    attribute: &str,
    items: Vec<Dynamic>,
) -> ReadDataSourceResponse {
    let mut state = config;
    let diagnostics = match state.set_list(&AttributePath::new(attribute), items) {
        Ok(()) => vec![],
        Err(e) => vec![Diagnostic::error(
            "Failed to set state",
            format!("Could not set '{}': {}", attribute, e),
        )],
    };

    ReadDataSourceResponse {
        state,
        diagnostics,
        deferred: None,
    }
}

/// Config returned unchanged alongside an error
pub(crate) fn error_response(
    config: DynamicValue,
    diagnostics: Vec<Diagnostic>,
) -> ReadDataSourceResponse {
    ReadDataSourceResponse {
        state: config,
        diagnostics,
        deferred: None,
    }
}
