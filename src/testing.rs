//! In-memory doubles for the storage backend and the completion service.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::file_entry::{StorageEntry, FOLDER_MIME_TYPE};
use crate::services::completion::{CompletionRequest, CompletionService};
use crate::services::storage::{EntryPage, EntryQuery, EntryUpdate, StorageBackend};

pub const ROOT: &str = "root";

#[derive(Default)]
struct FakeState {
    entries: BTreeMap<String, StorageEntry>,
    contents: HashMap<String, Vec<u8>>,
    next_id: usize,
    page_size: Option<usize>,
    list_calls: usize,
    downloads: Vec<String>,
    creates: Vec<(String, Option<String>)>,
    updates: Vec<(String, EntryUpdate)>,
    deletes: Vec<String>,
    fail_create: HashSet<String>,
    fail_get: HashSet<String>,
    fail_update: HashSet<String>,
    fail_delete: HashSet<String>,
    fail_list_parent: HashSet<String>,
}

/// Drive-like tree keyed by id. Entries without a parent live under [`ROOT`].
#[derive(Default)]
pub struct FakeStorage {
    state: Mutex<FakeState>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, entry: StorageEntry) {
        self.lock().entries.insert(entry.id.clone(), entry);
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: Option<&str>) {
        self.insert(StorageEntry {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            parents: vec![parent.unwrap_or(ROOT).to_string()],
            owned_by_me: true,
            size: None,
        });
    }

    pub fn add_file(&self, id: &str, name: &str, mime_type: &str, parent: Option<&str>) {
        self.insert(StorageEntry {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parents: vec![parent.unwrap_or(ROOT).to_string()],
            owned_by_me: true,
            size: Some(0),
        });
    }

    pub fn set_content(&self, id: &str, bytes: Vec<u8>) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(id) {
            entry.size = Some(bytes.len() as u64);
        }
        state.contents.insert(id.to_string(), bytes);
    }

    pub fn set_page_size(&self, size: usize) {
        self.lock().page_size = Some(size);
    }

    pub fn fail_create_named(&self, name: &str) {
        self.lock().fail_create.insert(name.to_string());
    }

    pub fn fail_get(&self, id: &str) {
        self.lock().fail_get.insert(id.to_string());
    }

    pub fn fail_update(&self, id: &str) {
        self.lock().fail_update.insert(id.to_string());
    }

    pub fn fail_delete(&self, id: &str) {
        self.lock().fail_delete.insert(id.to_string());
    }

    pub fn fail_list_children_of(&self, parent: &str) {
        self.lock().fail_list_parent.insert(parent.to_string());
    }

    pub fn entry(&self, id: &str) -> Option<StorageEntry> {
        self.lock().entries.get(id).cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn downloads(&self) -> Vec<String> {
        self.lock().downloads.clone()
    }

    pub fn creates(&self) -> Vec<(String, Option<String>)> {
        self.lock().creates.clone()
    }

    pub fn updates(&self) -> Vec<(String, EntryUpdate)> {
        self.lock().updates.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.lock().deletes.clone()
    }

    pub fn children(&self, parent: &str) -> Vec<String> {
        self.lock()
            .entries
            .values()
            .filter(|e| e.parents.iter().any(|p| p == parent))
            .map(|e| e.id.clone())
            .collect()
    }
}

fn matches_query(entry: &StorageEntry, query: &EntryQuery) -> bool {
    if let Some(parent) = &query.parent {
        if !entry.parents.iter().any(|p| p == parent) {
            return false;
        }
    }
    if let Some(name) = &query.name {
        if &entry.name != name {
            return false;
        }
    }
    if query.folders_only && !entry.is_folder() {
        return false;
    }
    if query.owned_by_me && !entry.owned_by_me {
        return false;
    }
    true
}

#[async_trait]
impl StorageBackend for FakeStorage {
    async fn list_entries(
        &self,
        query: &EntryQuery,
        page_token: Option<&str>,
    ) -> Result<EntryPage, AppError> {
        let mut state = self.lock();
        state.list_calls += 1;
        if let Some(parent) = &query.parent {
            if state.fail_list_parent.contains(parent) {
                return Err(AppError::Storage(format!("listing {parent} failed")));
            }
        }
        let matching: Vec<StorageEntry> = state
            .entries
            .values()
            .filter(|entry| matches_query(entry, query))
            .cloned()
            .collect();
        let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let size = query
            .page_size
            .map(|s| s as usize)
            .or(state.page_size)
            .unwrap_or(usize::MAX);
        let end = offset.saturating_add(size).min(matching.len());
        let entries = matching.get(offset..end).unwrap_or_default().to_vec();
        let next_page_token = (end < matching.len()).then(|| end.to_string());
        Ok(EntryPage {
            entries,
            next_page_token,
        })
    }

    async fn get_entry(&self, id: &str) -> Result<StorageEntry, AppError> {
        let state = self.lock();
        if state.fail_get.contains(id) {
            return Err(AppError::Storage(format!("get {id} failed")));
        }
        state
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("File not found: {id}")))
    }

    async fn download(&self, id: &str) -> Result<Vec<u8>, AppError> {
        let mut state = self.lock();
        state.downloads.push(id.to_string());
        state
            .contents
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::Storage(format!("no content for {id}")))
    }

    async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<String, AppError> {
        let mut state = self.lock();
        state
            .creates
            .push((name.to_string(), parent.map(ToOwned::to_owned)));
        if state.fail_create.contains(name) {
            return Err(AppError::Storage(format!("create {name} failed")));
        }
        state.next_id += 1;
        let id = format!("created-{}", state.next_id);
        state.entries.insert(
            id.clone(),
            StorageEntry {
                id: id.clone(),
                name: name.to_string(),
                mime_type: FOLDER_MIME_TYPE.to_string(),
                parents: vec![parent.unwrap_or(ROOT).to_string()],
                owned_by_me: true,
                size: None,
            },
        );
        Ok(id)
    }

    async fn update_entry(&self, id: &str, update: &EntryUpdate) -> Result<(), AppError> {
        let mut state = self.lock();
        state.updates.push((id.to_string(), update.clone()));
        if state.fail_update.contains(id) {
            return Err(AppError::Storage(format!("update {id} failed")));
        }
        let entry = state
            .entries
            .get_mut(id)
            .ok_or_else(|| AppError::Storage(format!("File not found: {id}")))?;
        if let Some(name) = &update.name {
            entry.name = name.clone();
        }
        entry
            .parents
            .retain(|p| !update.remove_parents.contains(p));
        for parent in &update.add_parents {
            if !entry.parents.contains(parent) {
                entry.parents.push(parent.clone());
            }
        }
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> Result<(), AppError> {
        let mut state = self.lock();
        state.deletes.push(id.to_string());
        if state.fail_delete.contains(id) {
            return Err(AppError::Storage(format!("delete {id} failed")));
        }
        state.entries.remove(id);
        Ok(())
    }
}

/// Replays queued replies in order; an exhausted script fails the call.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(message.to_string()));
        self
    }

    fn push(&self, reply: Result<String, String>) {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AppError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        let next = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AppError::Completion(message)),
            None => Err(AppError::Completion("no scripted reply".to_string())),
        }
    }
}
