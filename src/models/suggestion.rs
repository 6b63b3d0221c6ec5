use serde::{Deserialize, Serialize};

use crate::models::file_entry::EntryKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub current_name: String,
    pub new_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_folder: Option<String>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub reason: String,
}

impl Suggestion {
    /// Normalized target folder path, `None` when absent or only separators.
    pub fn target_folder(&self) -> Option<String> {
        self.new_folder
            .as_deref()
            .map(normalize_folder_path)
            .filter(|path| !path.is_empty())
    }
}

/// Trims each `/` segment and drops empty ones.
pub fn normalize_folder_path(path: &str) -> String {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_wire_shape() {
        let parsed: Suggestion = serde_json::from_str(
            r#"{
                "id": "file_1",
                "currentName": "ch25.pdf",
                "newName": "Chapter 25 Advanced Topics.pdf",
                "newFolder": "General/Guides",
                "type": "file",
                "reason": "clearer"
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.new_name, "Chapter 25 Advanced Topics.pdf");
        assert_eq!(parsed.target_folder().as_deref(), Some("General/Guides"));
    }

    #[test]
    fn blank_folder_paths_count_as_absent() {
        let suggestion = Suggestion {
            id: "a".into(),
            current_name: "a.pdf".into(),
            new_name: "b.pdf".into(),
            new_folder: Some(" / /".into()),
            kind: EntryKind::File,
            reason: String::new(),
        };
        assert_eq!(suggestion.target_folder(), None);
        assert_eq!(normalize_folder_path(" Acme / Reports/"), "Acme/Reports");
    }
}
