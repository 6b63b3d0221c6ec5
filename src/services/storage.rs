use async_trait::async_trait;

use crate::error::AppError;
use crate::models::file_entry::{StorageEntry, FOLDER_MIME_TYPE};

/// Listing filter. Trashed entries are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub parent: Option<String>,
    pub name: Option<String>,
    pub folders_only: bool,
    pub owned_by_me: bool,
    pub page_size: Option<u32>,
}

impl EntryQuery {
    pub fn children_of(parent: &str) -> Self {
        Self {
            parent: Some(parent.to_string()),
            ..Self::default()
        }
    }

    pub fn folder_named(name: &str, parent: Option<&str>) -> Self {
        Self {
            parent: parent.map(ToOwned::to_owned),
            name: Some(name.to_string()),
            folders_only: true,
            ..Self::default()
        }
    }

    pub fn owned() -> Self {
        Self {
            owned_by_me: true,
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Renders the Drive `q` expression for this filter.
    pub fn to_query_string(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(name) = &self.name {
            clauses.push(format!("name = '{}'", escape_query_literal(name)));
        }
        if self.folders_only {
            clauses.push(format!("mimeType = '{FOLDER_MIME_TYPE}'"));
        }
        if let Some(parent) = &self.parent {
            clauses.push(format!("'{}' in parents", escape_query_literal(parent)));
        }
        if self.owned_by_me {
            clauses.push("'me' in owners".to_string());
        }
        clauses.push("trashed = false".to_string());
        clauses.join(" and ")
    }
}

pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<StorageEntry>,
    pub next_page_token: Option<String>,
}

/// One metadata update: optional rename plus parent edits, applied in a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub name: Option<String>,
    pub add_parents: Vec<String>,
    pub remove_parents: Vec<String>,
}

impl EntryUpdate {
    pub fn rename(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn rename_and_move(name: &str, target: &str, previous_parents: &[String]) -> Self {
        Self {
            name: Some(name.to_string()),
            add_parents: if previous_parents.iter().any(|p| p == target) {
                Vec::new()
            } else {
                vec![target.to_string()]
            },
            remove_parents: previous_parents
                .iter()
                .filter(|p| p.as_str() != target)
                .cloned()
                .collect(),
        }
    }
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn list_entries(
        &self,
        query: &EntryQuery,
        page_token: Option<&str>,
    ) -> Result<EntryPage, AppError>;

    async fn get_entry(&self, id: &str) -> Result<StorageEntry, AppError>;

    async fn download(&self, id: &str) -> Result<Vec<u8>, AppError>;

    /// Creates a folder and returns its id. `parent == None` means the drive root.
    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, AppError>;

    async fn update_entry(&self, id: &str, update: &EntryUpdate) -> Result<(), AppError>;

    async fn delete_entry(&self, id: &str) -> Result<(), AppError>;
}

/// Follows page tokens until the listing is exhausted.
pub async fn list_all(
    storage: &dyn StorageBackend,
    query: &EntryQuery,
) -> Result<Vec<StorageEntry>, AppError> {
    let mut all = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = storage.list_entries(query, page_token.as_deref()).await?;
        all.extend(page.entries);
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    Ok(all)
}
