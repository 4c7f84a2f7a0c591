//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining provider, resource and
//! data source schemas, including attribute types, nested attributes and plan
//! modifiers.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    /// JSON type notation understood by Terraform core
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_json()]),
            AttributeType::Object(attrs) => {
                let fields: serde_json::Map<String, serde_json::Value> = attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Checks that a known value has this type; null and unknown always pass
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (value, self) {
            (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
            (Dynamic::String(_), AttributeType::String) => true,
            (Dynamic::Number(_), AttributeType::Number) => true,
            (Dynamic::Bool(_), AttributeType::Bool) => true,
            (Dynamic::List(items), AttributeType::List(elem))
            | (Dynamic::List(items), AttributeType::Set(elem)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Map(elem)) => map.values().all(|v| elem.accepts(v)),
            (Dynamic::Map(map), AttributeType::Object(attrs)) => attrs
                .iter()
                .all(|(name, ty)| map.get(name).is_none_or(|v| ty.accepts(v))),
            _ => false,
        }
    }

    /// Rewrites a value so that it carries exactly the attributes of every
    /// object type it contains. Missing attributes become null.
    pub fn conform(&self, value: &mut Dynamic) {
        match (value, self) {
            (Dynamic::Map(map), AttributeType::Object(attrs)) => {
                map.retain(|name, _| attrs.contains_key(name));
                for (name, ty) in attrs {
                    ty.conform(map.entry(name.clone()).or_insert(Dynamic::Null));
                }
            }
            (Dynamic::List(items), AttributeType::List(elem))
            | (Dynamic::List(items), AttributeType::Set(elem)) => {
                for item in items {
                    elem.conform(item);
                }
            }
            (Dynamic::Map(map), AttributeType::Map(elem)) => {
                for v in map.values_mut() {
                    elem.conform(v);
                }
            }
            _ => {}
        }
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

impl Schema {
    /// Object type of the whole schema
    pub fn object_type(&self) -> AttributeType {
        self.block.object_type()
    }

    /// Fills absent attributes with null and drops unknown ones
    pub fn conform(&self, value: &mut DynamicValue) {
        self.object_type().conform(&mut value.value);
    }

    /// Framework-level configuration checks driven by attribute flags
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Dynamic::Map(values) = &config.value {
            validate_attributes(
                &self.block.attributes,
                values,
                &AttributePath::root(),
                &mut diagnostics,
            );
        }
        diagnostics
    }
}

fn validate_attributes(
    attributes: &[Attribute],
    values: &HashMap<String, Dynamic>,
    prefix: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for attr in attributes {
        let path = prefix.clone().attribute(&attr.name);
        let value = values.get(&attr.name).unwrap_or(&Dynamic::Null);

        if attr.required && value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("The argument \"{}\" is required, but no definition was found.", path),
                )
                .with_attribute(path.clone()),
            );
            continue;
        }

        if attr.computed && !attr.optional && !attr.required && !value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid Configuration for Read-Only Attribute",
                    format!(
                        "Cannot set value for attribute \"{}\" as it is computed by the provider.",
                        path
                    ),
                )
                .with_attribute(path.clone()),
            );
            continue;
        }

        if !attr.value_type().accepts(value) {
            diagnostics.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!(
                        "Inappropriate value for attribute \"{}\": got {}.",
                        path,
                        value.type_name()
                    ),
                )
                .with_attribute(path.clone()),
            );
            continue;
        }

        let Some(nested) = &attr.nested_type else {
            continue;
        };
        match (nested.nesting, value) {
            (ObjectNestingMode::Single, Dynamic::Map(inner)) => {
                validate_attributes(&nested.attributes, inner, &path, diagnostics);
            }
            (ObjectNestingMode::List, Dynamic::List(items))
            | (ObjectNestingMode::Set, Dynamic::List(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    if let Dynamic::Map(inner) = item {
                        let item_path = path.clone().index(idx as i64);
                        validate_attributes(&nested.attributes, inner, &item_path, diagnostics);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn object_type(&self) -> AttributeType {
        object_type_of(&self.attributes)
    }
}

fn object_type_of(attributes: &[Attribute]) -> AttributeType {
    AttributeType::Object(
        attributes
            .iter()
            .map(|a| (a.name.clone(), a.value_type()))
            .collect(),
    )
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub nested_type: Option<NestedType>,
    pub deprecated: bool,
}

impl Attribute {
    /// Value type, derived from the nested attributes when present
    pub fn value_type(&self) -> AttributeType {
        match &self.nested_type {
            None => self.r#type.clone(),
            Some(nested) => {
                let object = object_type_of(&nested.attributes);
                match nested.nesting {
                    ObjectNestingMode::Single => object,
                    ObjectNestingMode::List => AttributeType::List(Box::new(object)),
                    ObjectNestingMode::Set => AttributeType::Set(Box::new(object)),
                    ObjectNestingMode::Map => AttributeType::Map(Box::new(object)),
                }
            }
        }
    }
}

// Manual Debug implementation since modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "plan_modifiers",
                &self
                    .plan_modifiers
                    .iter()
                    .map(|m| m.description())
                    .collect::<Vec<_>>(),
            )
            .field("nested_type", &self.nested_type)
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

/// NestedType for attributes with nested structures
#[derive(Debug, Clone)]
pub struct NestedType {
    pub attributes: Vec<Attribute>,
    pub nesting: ObjectNestingMode,
}

/// ObjectNestingMode for nested attribute objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectNestingMode {
    Single,
    List,
    Set,
    Map,
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers
pub struct PlanModifierRequest {
    pub config_value: Dynamic,
    pub state_value: Dynamic,
    pub plan_value: Dynamic,
    pub path: AttributePath,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                plan_modifiers: Vec::new(),
                nested_type: None,
                deprecated: false,
            },
        }
    }

    /// Shorthand for a string attribute
    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    /// Attribute made of nested attributes
    pub fn nested(name: &str, nesting: ObjectNestingMode, attributes: Vec<Attribute>) -> Self {
        let mut builder = Self::new(name, AttributeType::Object(HashMap::new()));
        builder.attribute.nested_type = Some(NestedType {
            attributes,
            nesting,
        });
        builder.attribute.r#type = builder.attribute.value_type();
        builder
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Add plan modifier
    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Set description kind
    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
