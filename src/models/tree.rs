use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<String>,
}

impl TreeNode {
    pub fn placeholder(id: &str) -> Self {
        Self {
            label: format!("Unknown Folder ({id})"),
            children: Vec::new(),
        }
    }
}
