//! Submission validation
//!
//! Checks a submitted payload against a form's element list and collects every
//! failure instead of stopping at the first one, so the caller gets the full
//! per-field picture in a single response.
//!
//! Per element, at most one error is reported, in this order of precedence:
//! required, choice membership, declared rules. Layout elements never receive
//! values and are skipped entirely.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::element::FormElement;

/// One validation failure, keyed by the element id it concerns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validates a payload against the form's elements.
///
/// Returns an empty vec when the payload is acceptable. Errors follow the
/// form's element order, and unknown payload keys are ignored.
pub fn validate_submission(
    elements: &[FormElement],
    payload: &Map<String, Value>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for element in elements {
        if element.kind.is_layout() {
            continue;
        }

        let value = payload.get(&element.id);
        let empty = value.map(is_empty_value).unwrap_or(true);

        if element.required && empty {
            let message = element
                .validation
                .as_ref()
                .and_then(|rules| rules.custom_message.clone())
                .unwrap_or_else(|| "This field is required".to_string());
            errors.push(FieldError::new(&element.id, message));
            continue;
        }

        // Absent or empty optional fields are fine; nothing more to check
        if empty {
            continue;
        }
        let value = match value {
            Some(value) => value,
            None => continue,
        };

        // Choice elements only accept declared option values; a value that
        // passes membership still runs through any declared rules below
        if let Some(options) = element.kind.options() {
            let submitted = value.as_str();
            let valid = submitted
                .map(|submitted| options.contains_value(submitted))
                .unwrap_or(false);
            if !valid {
                errors.push(FieldError::new(&element.id, "Invalid option selected"));
                continue;
            }
        }

        let rules = match &element.validation {
            Some(rules) => rules,
            None => continue,
        };
        let custom = rules.custom_message.as_deref();

        if let Some(pattern) = &rules.pattern {
            // Anchor so the whole value must match, not just a substring
            match regex::Regex::new(&format!("^(?:{pattern})$")) {
                Ok(re) => {
                    let text = stringify(value);
                    if !re.is_match(&text) {
                        errors.push(FieldError::new(
                            &element.id,
                            custom.unwrap_or("Invalid format"),
                        ));
                        continue;
                    }
                }
                Err(err) => {
                    // A broken pattern is a form-definition bug; don't punish
                    // the submitter for it
                    tracing::warn!(
                        element = %element.id,
                        "skipping invalid validation pattern: {err}"
                    );
                }
            }
        }

        if rules.min.is_some() || rules.max.is_some() {
            match numeric(value) {
                Some(number) => {
                    if rules.min.is_some_and(|min| number < min) {
                        errors.push(FieldError::new(
                            &element.id,
                            custom.unwrap_or("Value is too small"),
                        ));
                        continue;
                    }
                    if rules.max.is_some_and(|max| number > max) {
                        errors.push(FieldError::new(
                            &element.id,
                            custom.unwrap_or("Value is too large"),
                        ));
                        continue;
                    }
                }
                None => {
                    errors.push(FieldError::new(
                        &element.id,
                        custom.unwrap_or("Must be a number"),
                    ));
                    continue;
                }
            }
        }

        if rules.min_length.is_some() || rules.max_length.is_some() {
            let length = stringify(value).chars().count();
            if rules.min_length.is_some_and(|min| length < min) {
                errors.push(FieldError::new(
                    &element.id,
                    custom.unwrap_or("Input is too short"),
                ));
                continue;
            }
            if rules.max_length.is_some_and(|max| length > max) {
                errors.push(FieldError::new(
                    &element.id,
                    custom.unwrap_or("Input is too long"),
                ));
                continue;
            }
        }
    }

    errors
}

/// Null, the empty string and the empty array count as "no answer".
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers pass through; numeric strings are parsed. Everything else fails.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(raw: Value) -> FormElement {
        serde_json::from_value(raw).unwrap()
    }

    fn payload(raw: Value) -> Map<String, Value> {
        match raw {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn accepts_valid_payload() {
        let elements = vec![
            element(json!({"id": "name", "type": "text", "label": "Name", "required": true})),
            element(json!({"id": "age", "type": "number", "label": "Age",
                           "validation": {"min": 0, "max": 130}})),
        ];
        let errors = validate_submission(&elements, &payload(json!({"name": "Ada", "age": 36})));
        assert!(errors.is_empty());
    }

    #[test]
    fn required_field_missing() {
        let elements =
            vec![element(json!({"id": "name", "type": "text", "label": "Name", "required": true}))];
        let errors = validate_submission(&elements, &payload(json!({})));
        assert_eq!(
            errors,
            vec![FieldError::new("name", "This field is required")]
        );
    }

    #[test]
    fn empty_string_and_empty_array_count_as_missing() {
        let elements =
            vec![element(json!({"id": "name", "type": "text", "label": "Name", "required": true}))];
        assert_eq!(
            validate_submission(&elements, &payload(json!({"name": ""}))).len(),
            1
        );
        assert_eq!(
            validate_submission(&elements, &payload(json!({"name": []}))).len(),
            1
        );
        assert_eq!(
            validate_submission(&elements, &payload(json!({"name": null}))).len(),
            1
        );
    }

    #[test]
    fn required_message_uses_custom_override() {
        let elements = vec![element(json!({
            "id": "name", "type": "text", "label": "Name", "required": true,
            "validation": {"customMessage": "Please tell us your name"}
        }))];
        let errors = validate_submission(&elements, &payload(json!({})));
        assert_eq!(errors[0].message, "Please tell us your name");
    }

    #[test]
    fn absent_optional_field_skips_rules() {
        let elements = vec![element(json!({
            "id": "nickname", "type": "text", "label": "Nickname",
            "validation": {"minLength": 3}
        }))];
        assert!(validate_submission(&elements, &payload(json!({}))).is_empty());
    }

    #[test]
    fn choice_membership_is_enforced() {
        let elements = vec![element(json!({
            "id": "color", "type": "radio", "label": "Color",
            "options": [{"label": "Red", "value": "red"}, {"label": "Blue", "value": "blue"}]
        }))];

        assert!(validate_submission(&elements, &payload(json!({"color": "red"}))).is_empty());

        let errors = validate_submission(&elements, &payload(json!({"color": "green"})));
        assert_eq!(
            errors,
            vec![FieldError::new("color", "Invalid option selected")]
        );

        // Non-string values can never match a declared option
        let errors = validate_submission(&elements, &payload(json!({"color": 3})));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn select_membership_is_enforced_too() {
        let elements = vec![element(json!({
            "id": "size", "type": "select", "label": "Size",
            "options": ["S", "M", "L"]
        }))];
        let errors = validate_submission(&elements, &payload(json!({"size": "XXL"})));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn choice_values_also_run_declared_rules() {
        let elements = vec![element(json!({
            "id": "ref", "type": "select", "label": "Reference",
            "options": ["A-1", "B-22"],
            "validation": {"maxLength": 3}
        }))];
        assert!(validate_submission(&elements, &payload(json!({"ref": "A-1"}))).is_empty());

        // A declared option can still violate the element's rules
        let errors = validate_submission(&elements, &payload(json!({"ref": "B-22"})));
        assert_eq!(errors, vec![FieldError::new("ref", "Input is too long")]);

        // Membership failure takes precedence over the rules
        let errors = validate_submission(&elements, &payload(json!({"ref": "Z"})));
        assert_eq!(
            errors,
            vec![FieldError::new("ref", "Invalid option selected")]
        );
    }

    #[test]
    fn pattern_must_match_entire_value() {
        let elements = vec![element(json!({
            "id": "code", "type": "text", "label": "Code",
            "validation": {"pattern": "[0-9]{4}"}
        }))];
        assert!(validate_submission(&elements, &payload(json!({"code": "1234"}))).is_empty());

        let errors = validate_submission(&elements, &payload(json!({"code": "x1234y"})));
        assert_eq!(errors, vec![FieldError::new("code", "Invalid format")]);
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let elements = vec![element(json!({
            "id": "code", "type": "text", "label": "Code",
            "validation": {"pattern": "[unclosed"}
        }))];
        assert!(validate_submission(&elements, &payload(json!({"code": "anything"}))).is_empty());
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let elements = vec![element(json!({
            "id": "age", "type": "number", "label": "Age",
            "validation": {"min": 18, "max": 65}
        }))];
        assert!(validate_submission(&elements, &payload(json!({"age": 18}))).is_empty());
        assert!(validate_submission(&elements, &payload(json!({"age": 65}))).is_empty());
        assert!(validate_submission(&elements, &payload(json!({"age": "42"}))).is_empty());

        let errors = validate_submission(&elements, &payload(json!({"age": 17})));
        assert_eq!(errors[0].message, "Value is too small");
        let errors = validate_submission(&elements, &payload(json!({"age": 66})));
        assert_eq!(errors[0].message, "Value is too large");
        let errors = validate_submission(&elements, &payload(json!({"age": "old"})));
        assert_eq!(errors[0].message, "Must be a number");
    }

    #[test]
    fn length_bounds_count_characters() {
        let elements = vec![element(json!({
            "id": "bio", "type": "textarea", "label": "Bio",
            "validation": {"minLength": 2, "maxLength": 5}
        }))];
        assert!(validate_submission(&elements, &payload(json!({"bio": "héllo"}))).is_empty());

        let errors = validate_submission(&elements, &payload(json!({"bio": "a"})));
        assert_eq!(errors[0].message, "Input is too short");
        let errors = validate_submission(&elements, &payload(json!({"bio": "abcdef"})));
        assert_eq!(errors[0].message, "Input is too long");
    }

    #[test]
    fn errors_aggregate_in_element_order() {
        let elements = vec![
            element(json!({"id": "name", "type": "text", "label": "Name", "required": true})),
            element(json!({"id": "divider", "type": "panel", "label": "Details"})),
            element(json!({"id": "color", "type": "radio", "label": "Color",
                           "options": ["red", "blue"]})),
        ];
        let errors = validate_submission(&elements, &payload(json!({"color": "green"})));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "name");
        assert_eq!(errors[1].field, "color");
    }

    #[test]
    fn validation_is_deterministic() {
        let elements = vec![
            element(json!({"id": "name", "type": "text", "label": "Name", "required": true})),
            element(json!({"id": "age", "type": "number", "label": "Age",
                           "validation": {"min": 0}})),
        ];
        let body = payload(json!({"age": -1}));
        let first = validate_submission(&elements, &body);
        let second = validate_submission(&elements, &body);
        assert_eq!(first, second);
    }
}
