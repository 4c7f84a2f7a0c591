//! Resource implementations

pub mod connection;
pub mod datalake;
pub mod post_connection;
pub mod project;
pub mod source_app;
pub mod source_app_datalake_link;

pub use connection::ConnectionResource;
pub use datalake::DatalakeResource;
pub use post_connection::PostConnectionResource;
pub use project::ProjectResource;
pub use source_app::SourceAppResource;
pub use source_app_datalake_link::SourceAppDatalakeLinkResource;

use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::schema::{Attribute, AttributeBuilder};

/// Computed attribute that keeps its prior value across updates
pub(crate) fn stable_computed(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .description(description)
        .computed()
        .plan_modifier(Box::new(UseStateForUnknown))
        .build()
}

/// Computed attribute the server may change on any update, such as
/// `status` and `updated_at`
pub(crate) fn volatile_computed(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .description(description)
        .computed()
        .build()
}

pub(crate) fn required_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .description(description)
        .required()
        .build()
}

/// Required attribute whose change forces a new resource
pub(crate) fn replacing_attribute(name: &str, description: &str) -> Attribute {
    AttributeBuilder::string(name)
        .description(description)
        .required()
        .plan_modifier(Box::new(RequiresReplace))
        .build()
}
