//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state. Terraform calls Read right
/// after import, which fills in everything else.
///
/// Example: ID "dl-123" -> state.id = "dl-123"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "traceforce_datalake".to_string(),
            id: id.to_string(),
            client_capabilities: ClientCapabilities::default(),
        }
    }

    fn empty_response() -> ImportResourceStateResponse {
        ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        }
    }

    #[test]
    fn passthrough_writes_id_into_attribute() {
        let ctx = Context::new();
        let mut response = empty_response();

        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request("dl-123"), &mut response);

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let imported = &response.imported_resources[0];
        assert_eq!(imported.type_name, "traceforce_datalake");
        assert_eq!(
            imported.state.get_string(&AttributePath::new("id")).unwrap(),
            "dl-123"
        );
    }

    #[test]
    fn passthrough_can_target_other_attributes() {
        let ctx = Context::new();
        let mut response = empty_response();

        import_state_passthrough_id(
            &ctx,
            AttributePath::new("name"),
            &request("analytics"),
            &mut response,
        );

        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "analytics");
        assert!(state.get(&AttributePath::new("id")).is_none());
    }

    #[test]
    fn invalid_path_reports_diagnostic() {
        let ctx = Context::new();
        let mut response = empty_response();

        import_state_passthrough_id(
            &ctx,
            AttributePath::new("items").index(3),
            &request("x"),
            &mut response,
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.starts_with("Failed to set import ID"));
    }
}
