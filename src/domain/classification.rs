//! Model classification output.
//!
//! Model output is loosely typed: fields may come back as numbers, objects or
//! null. Everything goes through `StringOrAbsent::from_value` once, so label
//! matching downstream only ever sees non-empty strings.

use serde_json::Value;

use crate::error::{Result, TriageError};

/// A model field coerced to either a non-empty string or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StringOrAbsent {
    Present(String),
    #[default]
    Absent,
}

impl StringOrAbsent {
    /// Coerce an arbitrary JSON value.
    ///
    /// Strings are trimmed; numbers, booleans, arrays and objects use their JSON
    /// text; null and blank strings are Absent.
    pub fn from_value(value: Option<&Value>) -> Self {
        let text = match value {
            None | Some(Value::Null) => return Self::Absent,
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string(),
        };
        if text.is_empty() {
            Self::Absent
        } else {
            Self::Present(text)
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Present(s) => Some(s),
            Self::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Present(s) => Some(s),
            Self::Absent => None,
        }
    }
}

/// Urgency/importance verdict for one issue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    pub urgency: StringOrAbsent,
    pub importance: StringOrAbsent,
}

impl ClassificationResult {
    /// Build from a parsed model response. The value must be a JSON object.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| TriageError::Unparseable {
            message: "expected a JSON object with urgency/importance".to_string(),
            raw: value.to_string(),
        })?;

        Ok(Self {
            urgency: StringOrAbsent::from_value(object.get("urgency")),
            importance: StringOrAbsent::from_value(object.get("importance")),
        })
    }

    /// Present values, urgency first
    pub fn labels(&self) -> Vec<&str> {
        [&self.urgency, &self.importance]
            .into_iter()
            .filter_map(StringOrAbsent::as_deref)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_coerced_to_string() {
        let v = json!(123);
        assert_eq!(
            StringOrAbsent::from_value(Some(&v)),
            StringOrAbsent::Present("123".to_string())
        );
    }

    #[test]
    fn test_null_missing_and_empty_are_absent() {
        assert_eq!(StringOrAbsent::from_value(None), StringOrAbsent::Absent);
        assert_eq!(StringOrAbsent::from_value(Some(&json!(null))), StringOrAbsent::Absent);
        assert_eq!(StringOrAbsent::from_value(Some(&json!(""))), StringOrAbsent::Absent);
        assert_eq!(StringOrAbsent::from_value(Some(&json!("   "))), StringOrAbsent::Absent);
    }

    #[test]
    fn test_object_and_bool_coerced() {
        let obj = json!({"level": "high"});
        assert_eq!(
            StringOrAbsent::from_value(Some(&obj)).into_option().unwrap(),
            r#"{"level":"high"}"#
        );
        assert_eq!(StringOrAbsent::from_value(Some(&json!(true))).as_deref(), Some("true"));
    }

    #[test]
    fn test_string_is_trimmed() {
        let v = json!("  urgent\n");
        assert_eq!(StringOrAbsent::from_value(Some(&v)).as_deref(), Some("urgent"));
    }

    #[test]
    fn test_from_json_object() {
        let result = ClassificationResult::from_json(&json!({"urgency": "urgent", "importance": null})).unwrap();
        assert!(result.urgency.is_present());
        assert!(!result.importance.is_present());
        assert_eq!(result.labels(), vec!["urgent"]);
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = ClassificationResult::from_json(&json!(["urgent"])).unwrap_err();
        assert!(matches!(err, TriageError::Unparseable { .. }));
    }
}
