use crate::template::FormTemplate;
use crate::types::FieldValues;

/// Server-side filename for one uploaded composite.
///
/// Each `folderStructure` part resolves to the value of the field it names,
/// or to itself when no such value exists. Empty parts are dropped and the
/// rest joined with `_`. Without any parts the name falls back to
/// `{formName}_{index + 1}`. A `_{timestamp_ms}.jpg` suffix is always added.
pub fn upload_filename(
    template: &FormTemplate,
    values: &FieldValues,
    index: usize,
    timestamp_ms: i64,
) -> String {
    let parts: Vec<&str> = template
        .folder_structure
        .iter()
        .map(|part| {
            values
                .get(part)
                .filter(|value| !value.is_empty())
                .unwrap_or(part.as_str())
        })
        .filter(|part| !part.is_empty())
        .collect();

    let stem = if parts.is_empty() {
        format!("{}_{}", template.form_name, index + 1)
    } else {
        parts.join("_")
    };

    format!("{stem}_{timestamp_ms}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(parts: &[&str]) -> FormTemplate {
        FormTemplate {
            form_name: "골조검측".into(),
            fields: vec!["날짜".into(), "위치".into()],
            folder_structure: parts.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parts_resolve_to_values() {
        let values: FieldValues = [("날짜", "2026-10-19"), ("위치", "3동-401호")]
            .into_iter()
            .collect();
        let name = upload_filename(&template(&["위치", "날짜"]), &values, 0, 1700000000000);
        assert_eq!(name, "3동-401호_2026-10-19_1700000000000.jpg");
    }

    #[test]
    fn test_literal_parts_and_empty_values() {
        let values: FieldValues = [("날짜", "2026-10-19"), ("위치", "")].into_iter().collect();
        let name = upload_filename(&template(&["현장", "위치", "", "날짜"]), &values, 0, 42);
        // An empty value falls back to the part name itself
        assert_eq!(name, "현장_위치_2026-10-19_42.jpg");
    }

    #[test]
    fn test_fallback_to_form_name() {
        let values = FieldValues::new();
        assert_eq!(
            upload_filename(&template(&[]), &values, 2, 7),
            "골조검측_3_7.jpg"
        );
        assert_eq!(
            upload_filename(&template(&[""]), &values, 0, 7),
            "골조검측_1_7.jpg"
        );
    }
}
