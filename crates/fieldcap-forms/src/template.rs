//! Form templates as served by the form catalog

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Substrings that mark a field as a date when no explicit kind is set.
/// Matched against the lowercased field name.
pub const DATE_KEYWORDS: [&str; 4] = ["일자", "날짜", "공사일", "date"];

/// Substrings that mark a field as a building/unit location when no explicit
/// kind is set
pub const UNIT_KEYWORDS: [&str; 3] = ["위치", "호", "동"];

static UNIT_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,3})-([0-9]{1,4})$").expect("invalid unit regex"));

/// How a field is edited and normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Filled with today's date on template selection
    Date,
    /// Picked from the template's option list
    Enum,
    /// Building-unit notation, `3-401` becomes `3동-401호`
    Unit,
    Text,
}

impl FieldKind {
    /// Kind guessed from the field name alone
    pub fn infer(field: &str) -> Self {
        let lower = field.to_lowercase();
        if DATE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            FieldKind::Date
        } else if UNIT_KEYWORDS.iter().any(|k| field.contains(k)) {
            FieldKind::Unit
        } else {
            FieldKind::Text
        }
    }
}

/// Rewrite `{building}-{unit}` shorthand as `{building}동-{unit}호`.
///
/// Returns `None` when the value is not in shorthand form.
pub fn normalize_unit(value: &str) -> Option<String> {
    let captures = UNIT_SHORTHAND.captures(value)?;
    Some(format!("{}동-{}호", &captures[1], &captures[2]))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub form_name: String,
    /// Field names in table row order
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub fields: Vec<String>,
    #[serde(default, deserialize_with = "lenient::option_lists")]
    pub field_options: BTreeMap<String, Vec<String>>,
    /// Field names (or literal parts) the upload filename is built from
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub folder_structure: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Explicit per-field kinds; fields without one fall back to inference
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_kinds: BTreeMap<String, FieldKind>,
}

impl FormTemplate {
    /// Only an explicit `isActive: false` deactivates a template
    pub fn is_active(&self) -> bool {
        self.is_active != Some(false)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Non-empty option list for a field
    pub fn options_for(&self, field: &str) -> Option<&[String]> {
        self.field_options
            .get(field)
            .filter(|options| !options.is_empty())
            .map(Vec::as_slice)
    }

    /// Explicit tag first, then option lists, then name inference
    pub fn field_kind(&self, field: &str) -> FieldKind {
        if let Some(kind) = self.field_kinds.get(field) {
            return *kind;
        }
        if self.options_for(field).is_some() {
            return FieldKind::Enum;
        }
        FieldKind::infer(field)
    }

    /// Whether unit shorthand is rewritten for this field.
    ///
    /// An explicit tag decides; otherwise any unit keyword in the name does,
    /// even when the field also has options or a date keyword.
    pub fn normalizes_unit(&self, field: &str) -> bool {
        match self.field_kinds.get(field) {
            Some(kind) => *kind == FieldKind::Unit,
            None => UNIT_KEYWORDS.iter().any(|k| field.contains(k)),
        }
    }
}

/// Drop templates explicitly marked inactive, keeping catalog order
pub fn filter_active(templates: impl IntoIterator<Item = FormTemplate>) -> Vec<FormTemplate> {
    templates.into_iter().filter(FormTemplate::is_active).collect()
}

/// Deserializers that tolerate the loosely typed catalog payloads
mod lenient {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn strings(items: Vec<Value>) -> Vec<String> {
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Anything but an array reads as an empty list
    pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => strings(items),
            _ => Vec::new(),
        })
    }

    /// Entries whose value is not an array are dropped
    pub fn option_lists<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<String>>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(field, value)| match value {
                    Value::Array(items) => Some((field, strings(items))),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_kinds() {
        assert_eq!(FieldKind::infer("날짜"), FieldKind::Date);
        assert_eq!(FieldKind::infer("공사일자"), FieldKind::Date);
        assert_eq!(FieldKind::infer("Inspection DATE"), FieldKind::Date);
        assert_eq!(FieldKind::infer("위치"), FieldKind::Unit);
        assert_eq!(FieldKind::infer("동호수"), FieldKind::Unit);
        assert_eq!(FieldKind::infer("공종"), FieldKind::Text);
    }

    #[test]
    fn test_normalize_unit() {
        assert_eq!(normalize_unit("3-401").as_deref(), Some("3동-401호"));
        assert_eq!(normalize_unit("101-1203").as_deref(), Some("101동-1203호"));
        assert_eq!(normalize_unit("1234-1"), None);
        assert_eq!(normalize_unit("3-40123"), None);
        assert_eq!(normalize_unit(" 3-401"), None);
        assert_eq!(normalize_unit("3동-401호"), None);
        // Non-ASCII digits are not shorthand
        assert_eq!(normalize_unit("٣-401"), None);
    }

    #[test]
    fn test_field_kind_precedence() {
        let mut template = FormTemplate {
            fields: vec!["날짜".into(), "위치".into(), "공종".into()],
            ..Default::default()
        };
        template
            .field_options
            .insert("공종".into(), vec!["철근".into(), "타설".into()]);
        template.field_kinds.insert("위치".into(), FieldKind::Text);

        assert_eq!(template.field_kind("날짜"), FieldKind::Date);
        assert_eq!(template.field_kind("위치"), FieldKind::Text);
        assert_eq!(template.field_kind("공종"), FieldKind::Enum);
    }

    #[test]
    fn test_unit_normalization_follows_keywords() {
        let mut template = FormTemplate {
            fields: vec!["위치".into(), "동 공사일".into(), "공종".into(), "호수".into()],
            ..Default::default()
        };
        template.field_options.insert("위치".into(), vec!["3-401".into()]);
        template.field_kinds.insert("호수".into(), FieldKind::Text);
        template.field_kinds.insert("공종".into(), FieldKind::Unit);

        assert!(template.normalizes_unit("위치"));
        assert!(template.normalizes_unit("동 공사일"));
        assert!(template.normalizes_unit("공종"));
        assert!(!template.normalizes_unit("호수"));
    }

    #[test]
    fn test_empty_option_list_is_not_enum() {
        let mut template = FormTemplate::default();
        template.field_options.insert("비고".into(), Vec::new());
        assert_eq!(template.options_for("비고"), None);
        assert_eq!(template.field_kind("비고"), FieldKind::Text);
    }
}
