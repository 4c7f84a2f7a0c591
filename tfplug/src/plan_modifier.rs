use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Marks an attribute as requiring replacement when it changes
///
/// Nothing is flagged during create (no prior state). An unknown planned value
/// against a known prior value counts as a change.
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "If the value of this attribute changes, Terraform will destroy and recreate the resource."
            .to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = !matches!(
            (&request.state_value, &request.plan_value),
            (Dynamic::Null, _) | (Dynamic::Unknown, _)
        ) && !values_equal(&request.state_value, &request.plan_value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }
}

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// This is particularly useful for computed attributes that should retain their value
/// during planning when Terraform doesn't know what the new value will be.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "Once set, the value of this attribute in state will not change.".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }
}

/// Structural equality, numbers compared within EPSILON
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: plan.clone(),
            state_value: state,
            plan_value: plan,
            path: AttributePath::new("test_attr"),
        }
    }

    #[test]
    fn requires_replace_when_value_changes() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("old".to_string()),
            Dynamic::String("new".to_string()),
        ));
        assert!(response.requires_replace);
        assert_eq!(response.plan_value, Dynamic::String("new".to_string()));
    }

    #[test]
    fn requires_replace_ignores_unchanged_value() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("same".to_string()),
            Dynamic::String("same".to_string()),
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_create() {
        let response =
            RequiresReplace.modify(request(Dynamic::Null, Dynamic::String("new".to_string())));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_when_plan_becomes_unknown() {
        let response =
            RequiresReplace.modify(request(Dynamic::String("old".to_string()), Dynamic::Unknown));
        assert!(response.requires_replace);
        assert_eq!(response.plan_value, Dynamic::Unknown);
    }

    #[test]
    fn requires_replace_when_value_removed() {
        let response =
            RequiresReplace.modify(request(Dynamic::String("old".to_string()), Dynamic::Null));
        assert!(response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_restores_prior_value() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("abc-123".to_string()),
            Dynamic::Unknown,
        ));
        assert_eq!(response.plan_value, Dynamic::String("abc-123".to_string()));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_keeps_unknown_on_create() {
        let response = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown));
        assert_eq!(response.plan_value, Dynamic::Unknown);
    }

    #[test]
    fn use_state_for_unknown_keeps_known_plan() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("old".to_string()),
            Dynamic::String("new".to_string()),
        ));
        assert_eq!(response.plan_value, Dynamic::String("new".to_string()));
    }

    #[test]
    fn values_equal_compares_nested_structures() {
        let mut a = HashMap::new();
        a.insert(
            "list".to_string(),
            Dynamic::List(vec![Dynamic::Number(1.0), Dynamic::Bool(true)]),
        );
        let b = a.clone();
        assert!(values_equal(&Dynamic::Map(a.clone()), &Dynamic::Map(b)));

        let mut c = a.clone();
        c.insert("extra".to_string(), Dynamic::Null);
        assert!(!values_equal(&Dynamic::Map(a), &Dynamic::Map(c)));
    }
}
