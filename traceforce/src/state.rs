//! Helpers shared by resources and data sources for moving values between
//! Terraform state and API DTOs

use chrono::{DateTime, SecondsFormat, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::Client;
use crate::TraceforceProviderData;

/// Timestamps are stored as RFC3339 with second precision
pub fn rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn timestamp(value: &DateTime<Utc>) -> Dynamic {
    Dynamic::String(rfc3339(value))
}

/// Absent optional strings are stored as empty strings, never null
pub fn string_or_empty(value: Option<&str>) -> Dynamic {
    Dynamic::String(value.unwrap_or_default().to_string())
}

pub fn object<const N: usize>(fields: [(&str, Dynamic); N]) -> Dynamic {
    Dynamic::Map(
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect::<HashMap<_, _>>(),
    )
}

pub fn string_list(values: &[String]) -> Dynamic {
    Dynamic::List(values.iter().cloned().map(Dynamic::String).collect())
}

/// Known string value of a required attribute
pub fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    value.get_string(&AttributePath::new(name)).map_err(|_| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
        .with_attribute(AttributePath::new(name))
    })
}

/// Id recorded in state; empty when the resource was just imported by
/// another attribute
pub fn state_id(value: &DynamicValue) -> String {
    value
        .get_string_opt(&AttributePath::new("id"))
        .unwrap_or_default()
}

/// Downcasts provider data handed to a resource or data source
///
/// No provider data is not an error: Terraform may validate and plan
/// before the provider is configured.
pub fn downcast_provider_data(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    summary: &str,
) -> (Option<TraceforceProviderData>, Vec<Diagnostic>) {
    let Some(data) = provider_data else {
        return (None, vec![]);
    };

    match data.downcast_ref::<TraceforceProviderData>() {
        Some(provider_data) => (Some(provider_data.clone()), vec![]),
        None => (
            None,
            vec![Diagnostic::error(
                summary,
                "Expected TraceforceProviderData. Please report this issue to the provider developers.",
            )],
        ),
    }
}

/// Client of a configured resource or data source
pub fn configured_client(
    provider_data: &Option<TraceforceProviderData>,
) -> Result<&Client, Diagnostic> {
    provider_data
        .as_ref()
        .map(|data| data.client.as_ref())
        .ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })
}

/// Single error diagnostic carrying the API error verbatim as detail
pub fn api_error(summary: &str, err: &crate::api::ApiError) -> Vec<Diagnostic> {
    vec![Diagnostic::error(summary, err.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_rfc3339_utc() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(
            timestamp(&at),
            Dynamic::String("2024-05-01T10:00:00Z".to_string())
        );
    }

    #[test]
    fn required_string_reports_attribute() {
        let value = DynamicValue::new(object([("name", Dynamic::Null)]));
        let diag = required_string(&value, "name").unwrap_err();
        assert_eq!(diag.summary, "Missing name");
        assert_eq!(diag.attribute, Some(AttributePath::new("name")));

        let value = DynamicValue::new(object([("name", "prod".into())]));
        assert_eq!(required_string(&value, "name").unwrap(), "prod");
    }

    #[test]
    fn missing_provider_data_is_silent() {
        let (data, diagnostics) = downcast_provider_data(None, "Unexpected Resource Configure Type");
        assert!(data.is_none());
        assert!(diagnostics.is_empty());
        assert_eq!(
            configured_client(&data).err().map(|d| d.summary),
            Some("Provider not configured".to_string())
        );
    }

    #[test]
    fn wrong_provider_data_type_is_reported() {
        let (data, diagnostics) = downcast_provider_data(
            Some(Arc::new("not provider data")),
            "Unexpected Data Source Configure Type",
        );
        assert!(data.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Unexpected Data Source Configure Type");
    }

    #[test]
    fn configured_provider_data_is_kept() {
        let client = Client::new("key", "http://localhost:1").unwrap();
        let (data, diagnostics) = downcast_provider_data(
            Some(Arc::new(TraceforceProviderData::new(client))),
            "Unexpected Resource Configure Type",
        );
        assert!(diagnostics.is_empty());
        assert!(configured_client(&data).is_ok());
    }
}
