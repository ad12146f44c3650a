use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::template::FormTemplate;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No form template selected")]
    NoTemplate,
    #[error("No images added")]
    NoImages,
    #[error("Required fields are empty: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Field is not part of the selected template: {0}")]
    UnknownField(String),
    #[error("No work item at index {0}")]
    NoSuchItem(usize),
    #[error("No work item selected")]
    NoSelection,
    #[error("An upload is in progress; edits are disabled until it finishes")]
    UploadInProgress,
}

pub type Result<T> = std::result::Result<T, FormError>;

/// Which editing flow a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum EditMode {
    /// One photo, uploaded as soon as it is taken
    #[default]
    #[serde(rename = "single")]
    Single,
    /// Several photos, each with its own value snapshot, uploaded together
    #[serde(rename = "multi")]
    Batch,
}

impl EditMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EditMode::Single => "single",
            EditMode::Batch => "multi",
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Field Values
// =============================================================================

/// Field name to value mapping that keeps insertion order.
///
/// Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    entries: Vec<(String, String)>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// One empty entry per field
    pub fn for_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        fields
            .iter()
            .map(|f| (f.as_ref().to_string(), String::new()))
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    /// Insert or replace the value of a field
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exactly one entry per field, in field order. Known values are kept,
    /// everything else is empty.
    pub fn conform_to<S: AsRef<str>>(&self, fields: &[S]) -> Self {
        fields
            .iter()
            .map(|f| {
                let field = f.as_ref();
                (field.to_string(), self.get(field).unwrap_or("").to_string())
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FieldValues::new();
        for (k, v) in iter {
            values.set(k, v);
        }
        values
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValuesVisitor;

        impl<'de> Visitor<'de> for ValuesVisitor {
            type Value = FieldValues;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of field values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<FieldValues, A::Error> {
                let mut values = FieldValues::new();
                while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                    // Non-string values are kept as their JSON text, null as empty
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    values.set(key, value);
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(ValuesVisitor)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Fields currently flagged as missing, in template order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationState {
    invalid: Vec<String>,
}

impl ValidationState {
    /// Every template field is required; blank after trimming counts as missing
    pub fn check(template: &FormTemplate, values: &FieldValues) -> Self {
        let invalid = template
            .fields
            .iter()
            .filter(|field| values.get(field).is_none_or(|v| v.trim().is_empty()))
            .cloned()
            .collect();
        Self { invalid }
    }

    pub fn is_valid(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn is_invalid(&self, field: &str) -> bool {
        self.invalid.iter().any(|f| f == field)
    }

    pub fn invalid_fields(&self) -> &[String] {
        &self.invalid
    }

    pub(crate) fn clear_field(&mut self, field: &str) {
        self.invalid.retain(|f| f != field);
    }

    pub(crate) fn clear(&mut self) {
        self.invalid.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_keep_insertion_order() {
        let mut values = FieldValues::new();
        values.set("위치", "");
        values.set("날짜", "2026-10-19");
        values.set("위치", "3동-401호");

        let order: Vec<_> = values.iter().collect();
        assert_eq!(order, vec![("위치", "3동-401호"), ("날짜", "2026-10-19")]);
    }

    #[test]
    fn test_values_json_shape() {
        let values: FieldValues = [("b", "2"), ("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"b":"2","a":"1"}"#);

        let parsed: FieldValues = serde_json::from_str(r#"{"z":"x","n":3,"e":null}"#).unwrap();
        let order: Vec<_> = parsed.iter().collect();
        assert_eq!(order, vec![("z", "x"), ("n", "3"), ("e", "")]);
    }

    #[test]
    fn test_conform_to_fields() {
        let values: FieldValues = [("old", "x"), ("위치", "A")].into_iter().collect();
        let conformed = values.conform_to(&["날짜", "위치"]);
        let order: Vec<_> = conformed.iter().collect();
        assert_eq!(order, vec![("날짜", ""), ("위치", "A")]);
    }

    #[test]
    fn test_edit_mode_wire_names() {
        assert_eq!(serde_json::to_string(&EditMode::Batch).unwrap(), r#""multi""#);
        assert_eq!(
            serde_json::from_str::<EditMode>(r#""single""#).unwrap(),
            EditMode::Single
        );
    }
}
