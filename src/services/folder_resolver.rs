use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::AppError;
use crate::services::storage::{EntryQuery, StorageBackend};

/// Drive alias for the caller's root folder.
pub const DRIVE_ROOT: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Id of the folder the path ends at.
    Folder(String),
    /// The path runs through the entry being moved.
    IntoItself,
    /// A segment could not be looked up or created.
    Failed,
}

/// Resolves `/`-delimited folder paths, creating missing segments.
///
/// One resolver belongs to one batch. Every resolved prefix is memoized, and the
/// cache lock is held for a whole path walk, so a (name, parent) pair is created
/// at most once per batch even when items execute concurrently.
pub struct FolderResolver {
    storage: Arc<dyn StorageBackend>,
    cache: Mutex<HashMap<String, String>>,
}

impl FolderResolver {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves `path` below `root_parent`, creating missing segments.
    ///
    /// When `moving` is set, the walk stops as soon as a segment resolves to
    /// that entry, before anything is created beneath it.
    pub async fn resolve(
        &self,
        path: &str,
        root_parent: Option<&str>,
        moving: Option<&str>,
    ) -> Resolution {
        let segments = split_segments(path);
        let root_key = root_parent.unwrap_or(DRIVE_ROOT);
        let mut cache = self.cache.lock().await;
        let mut current: Option<String> = root_parent.map(ToOwned::to_owned);

        for depth in 0..segments.len() {
            let key = format!("{root_key}/{}", segments[..=depth].join("/"));
            let name = segments[depth];
            let folder_id = match cache.get(&key) {
                Some(id) => id.clone(),
                None => match self.resolve_or_create(name, current.as_deref()).await {
                    Ok(id) => {
                        cache.insert(key, id.clone());
                        id
                    }
                    Err(err) => {
                        tracing::warn!("failed to resolve folder {name:?} in {path:?}: {err}");
                        return Resolution::Failed;
                    }
                },
            };
            if moving == Some(folder_id.as_str()) {
                return Resolution::IntoItself;
            }
            current = Some(folder_id);
        }
        Resolution::Folder(current.unwrap_or_else(|| DRIVE_ROOT.to_string()))
    }

    async fn resolve_or_create(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, AppError> {
        let query =
            EntryQuery::folder_named(name, Some(parent.unwrap_or(DRIVE_ROOT))).with_page_size(1);
        let page = self.storage.list_entries(&query, None).await?;
        if let Some(existing) = page.entries.into_iter().next() {
            return Ok(existing.id);
        }
        let id = self.storage.create_folder(name, parent).await?;
        tracing::info!("created folder {name:?} ({id})");
        Ok(id)
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStorage;

    fn resolver_with(storage: &Arc<FakeStorage>) -> FolderResolver {
        FolderResolver::new(storage.clone())
    }

    async fn folder_id(
        resolver: &FolderResolver,
        path: &str,
        root: Option<&str>,
    ) -> Option<String> {
        match resolver.resolve(path, root, None).await {
            Resolution::Folder(id) => Some(id),
            _ => None,
        }
    }

    #[tokio::test]
    async fn reuses_existing_prefix_and_creates_missing_segment() {
        let storage = Arc::new(FakeStorage::new());
        storage.add_folder("acme", "Acme", None);
        let resolver = resolver_with(&storage);

        let id = folder_id(&resolver, "Acme/Reports", None).await.unwrap();

        assert_eq!(
            storage.creates(),
            vec![("Reports".to_string(), Some("acme".to_string()))]
        );
        assert_eq!(storage.entry(&id).unwrap().parents, vec!["acme".to_string()]);
    }

    #[tokio::test]
    async fn repeated_resolution_hits_cache() {
        let storage = Arc::new(FakeStorage::new());
        let resolver = resolver_with(&storage);

        let first = folder_id(&resolver, "General/Guides", None).await.unwrap();
        let lists_after_first = storage.list_calls();
        let second = folder_id(&resolver, " General / Guides ", None).await.unwrap();
        let sibling = folder_id(&resolver, "General/Reports", None).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, sibling);
        assert_eq!(storage.list_calls(), lists_after_first + 1);
        let created: Vec<String> = storage.creates().into_iter().map(|(name, _)| name).collect();
        assert_eq!(created, vec!["General", "Guides", "Reports"]);
    }

    #[tokio::test]
    async fn same_name_under_different_parents_is_distinct() {
        let storage = Arc::new(FakeStorage::new());
        let resolver = resolver_with(&storage);

        let a = folder_id(&resolver, "Acme/Reports", None).await.unwrap();
        let b = folder_id(&resolver, "Globex/Reports", None).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn root_parent_scopes_lookup_and_cache() {
        let storage = Arc::new(FakeStorage::new());
        storage.add_folder("base", "Base", None);
        storage.add_folder("top-guides", "Guides", None);
        let resolver = resolver_with(&storage);

        let scoped = folder_id(&resolver, "Guides", Some("base")).await.unwrap();
        let top = folder_id(&resolver, "Guides", None).await.unwrap();

        assert_ne!(scoped, "top-guides");
        assert_eq!(top, "top-guides");
        assert_eq!(storage.entry(&scoped).unwrap().parents, vec!["base".to_string()]);
    }

    #[tokio::test]
    async fn create_failure_fails_and_keeps_resolved_prefix() {
        let storage = Arc::new(FakeStorage::new());
        storage.fail_create_named("Reports");
        let resolver = resolver_with(&storage);
        let acme_creates = |storage: &FakeStorage| {
            storage
                .creates()
                .iter()
                .filter(|(name, _)| name == "Acme")
                .count()
        };

        assert_eq!(resolver.resolve("Acme/Reports", None, None).await, Resolution::Failed);
        assert_eq!(acme_creates(&storage), 1);
        assert_eq!(resolver.resolve("Acme/Reports", None, None).await, Resolution::Failed);
        assert_eq!(acme_creates(&storage), 1);
    }

    #[tokio::test]
    async fn empty_path_is_the_root_parent() {
        let storage = Arc::new(FakeStorage::new());
        let resolver = resolver_with(&storage);
        assert_eq!(
            resolver.resolve(" / ", None, None).await,
            Resolution::Folder(DRIVE_ROOT.to_string())
        );
        assert_eq!(folder_id(&resolver, "", Some("base")).await.as_deref(), Some("base"));
        assert!(storage.creates().is_empty());
    }

    #[tokio::test]
    async fn stops_at_the_moving_entry_before_creating_below_it() {
        let storage = Arc::new(FakeStorage::new());
        storage.add_folder("acme", "Acme", None);
        let resolver = resolver_with(&storage);

        let resolution = resolver.resolve("Acme/Reports/Q3", None, Some("acme")).await;

        assert_eq!(resolution, Resolution::IntoItself);
        assert!(storage.creates().is_empty());
        // Other entries still resolve through the same prefix.
        assert!(folder_id(&resolver, "Acme/Reports", None).await.is_some());
    }

    #[tokio::test]
    async fn concurrent_resolution_creates_once() {
        let storage = Arc::new(FakeStorage::new());
        let resolver = Arc::new(resolver_with(&storage));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver.resolve("Acme/Reports", None, None).await
            }));
        }
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        outcomes.dedup();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], Resolution::Folder(_)));
        assert_eq!(storage.creates().len(), 2);
    }
}
