use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::file_entry::{StorageEntry, FOLDER_MIME_TYPE};
use crate::services::storage::{EntryPage, EntryQuery, EntryUpdate, StorageBackend};

const ENTRY_FIELDS: &str = "id, name, mimeType, parents, owners, size";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, parents, owners, size)";

/// Drive v3 `files` endpoints over a bearer token.
pub struct DriveClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveOwner {
    #[serde(default)]
    me: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    owners: Vec<DriveOwner>,
    // Drive serializes int64 values as strings.
    #[serde(default)]
    size: Option<String>,
}

impl From<DriveFile> for StorageEntry {
    fn from(file: DriveFile) -> Self {
        // An entry with no owner info listed under `'me' in owners` is ours.
        let owned_by_me = file
            .owners
            .first()
            .map(|owner| owner.me.unwrap_or(true))
            .unwrap_or(true);
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            parents: file.parents,
            owned_by_me,
            size: file.size.and_then(|s| s.parse().ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

impl DriveClient {
    pub fn new(base_url: &str, access_token: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            client,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.base_url)
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{id}", self.base_url)
    }

    async fn check(&self, response: Response, action: &str) -> Result<Response, AppError> {
        let status = response.status();
        tracing::debug!("drive {action}: status={status}");
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "drive {action} rejected ({status}): {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!(
                "drive {action} failed ({status}): {body}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl StorageBackend for DriveClient {
    async fn list_entries(
        &self,
        query: &EntryQuery,
        page_token: Option<&str>,
    ) -> Result<EntryPage, AppError> {
        let mut params = vec![
            ("q", query.to_query_string()),
            ("spaces", "drive".to_string()),
            ("fields", LIST_FIELDS.to_string()),
        ];
        if let Some(size) = query.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response = self
            .client
            .get(self.files_url())
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;
        let listing: DriveFileList = self.check(response, "list").await?.json().await?;
        Ok(EntryPage {
            entries: listing.files.into_iter().map(StorageEntry::from).collect(),
            next_page_token: listing.next_page_token,
        })
    }

    async fn get_entry(&self, id: &str) -> Result<StorageEntry, AppError> {
        let response = self
            .client
            .get(self.file_url(id))
            .bearer_auth(&self.access_token)
            .query(&[("fields", ENTRY_FIELDS)])
            .send()
            .await?;
        let file: DriveFile = self.check(response, "get").await?.json().await?;
        Ok(file.into())
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .get(self.file_url(id))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let bytes = self.check(response, "download").await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, AppError> {
        let mut body = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent {
            body["parents"] = json!([parent]);
        }
        let response = self
            .client
            .post(self.files_url())
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id")])
            .json(&body)
            .send()
            .await?;
        let created: CreatedFile = self.check(response, "create").await?.json().await?;
        Ok(created.id)
    }

    async fn update_entry(&self, id: &str, update: &EntryUpdate) -> Result<(), AppError> {
        let mut params = vec![("fields", "id, name, parents".to_string())];
        if !update.add_parents.is_empty() {
            params.push(("addParents", update.add_parents.join(",")));
        }
        if !update.remove_parents.is_empty() {
            params.push(("removeParents", update.remove_parents.join(",")));
        }
        let body = match &update.name {
            Some(name) => json!({ "name": name }),
            None => json!({}),
        };
        let response = self
            .client
            .patch(self.file_url(id))
            .bearer_auth(&self.access_token)
            .query(&params)
            .json(&body)
            .send()
            .await?;
        self.check(response, "update").await?;
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> Result<(), AppError> {
        let response = self
            .client
            .delete(self.file_url(id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        self.check(response, "delete").await?;
        Ok(())
    }
}
