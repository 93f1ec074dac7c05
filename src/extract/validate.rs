use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        "Could not process the model response."
    }

    /// The offending field, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field } => Some(field),
            ValidationError::NotAnObject { .. } => None,
        }
    }
}

/// `null`, `false`, zero and `""` count as absent. Empty arrays and
/// objects do not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Check `required` in order and stop at the first absent or falsy field.
/// Returns the input untouched on success.
pub fn validate<'a, S: AsRef<str>>(
    value: &'a Value,
    required: &[S],
) -> Result<&'a Value, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject {
        found: type_name(value),
    })?;

    for field in required {
        let field = field.as_ref();
        if !object.get(field).map_or(false, is_truthy) {
            tracing::debug!(field, "Required field missing from model output");
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }
    }

    Ok(value)
}

/// Owning variant of [`validate`].
pub fn validate_owned<S: AsRef<str>>(
    value: Value,
    required: &[S],
) -> Result<Value, ValidationError> {
    validate(&value, required)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_fields_present() {
        let world = json!({"name": "Tessel", "era": "Iron", "regions": []});
        assert_eq!(validate(&world, &["name", "era", "regions"]).unwrap(), &world);
    }

    #[test]
    fn test_reports_first_missing_in_order() {
        let world = json!({"a": 1});
        let err = validate(&world, &["a", "b", "c"]).unwrap_err();
        assert_eq!(err.field(), Some("b"));

        let world = json!({});
        let err = validate(&world, &["c", "b", "a"]).unwrap_err();
        assert_eq!(err.field(), Some("c"));
    }

    #[test]
    fn test_falsy_values_count_as_missing() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            let obj = json!({ "x": value });
            assert!(validate(&obj, &["x"]).is_err(), "{} should be falsy", value);
        }
        for value in [json!(true), json!(-1), json!("0"), json!([]), json!({})] {
            let obj = json!({ "x": value });
            assert!(validate(&obj, &["x"]).is_ok(), "{} should be truthy", value);
        }
    }

    #[test]
    fn test_non_object_rejected() {
        let err = validate(&json!([1, 2]), &["a"]).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject { found: "an array" });
    }

    #[test]
    fn test_empty_requirement_list() {
        let obj = json!({});
        let required: [&str; 0] = [];
        assert!(validate(&obj, &required).is_ok());
    }

    #[test]
    fn test_validate_owned_returns_input() {
        let obj = json!({"name": "Vel"});
        assert_eq!(validate_owned(obj.clone(), &["name"]).unwrap(), obj);
    }
}
