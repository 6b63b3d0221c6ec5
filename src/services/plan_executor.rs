use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::AppError;
use crate::models::operation::{tally, ExecutionReport, ExecutionResult, ExecutionStatus};
use crate::models::suggestion::Suggestion;
use crate::services::folder_resolver::{FolderResolver, Resolution};
use crate::services::storage::{EntryQuery, EntryUpdate, StorageBackend};

/// Outcome of applying one suggestion plus the parents it had before the move.
#[derive(Debug)]
struct AppliedItem {
    idx: usize,
    result: ExecutionResult,
    touched: Vec<String>,
}

pub struct PlanExecutor {
    storage: Arc<dyn StorageBackend>,
    concurrency: usize,
}

impl PlanExecutor {
    pub fn new(storage: Arc<dyn StorageBackend>, concurrency: usize) -> Self {
        Self {
            storage,
            concurrency: concurrency.max(1),
        }
    }

    /// Applies every suggestion, then removes folders the batch left empty.
    /// Each suggestion yields exactly one result, in input order.
    pub async fn execute(&self, suggestions: Vec<Suggestion>) -> ExecutionReport {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now().to_rfc3339();
        let total = suggestions.len();
        tracing::info!("batch {batch_id}: applying {total} suggestions");

        let resolver = Arc::new(FolderResolver::new(self.storage.clone()));
        let (results, touched) = self.apply_all(suggestions, resolver).await;
        let deleted_folders = self.cleanup_empty_folders(&touched).await;

        let counts = tally(&results);
        tracing::info!(
            "batch {batch_id}: {} succeeded, {} partial, {} failed, {} folders removed",
            counts.successful,
            counts.partial,
            counts.failed,
            deleted_folders.len()
        );

        ExecutionReport {
            success: true,
            results,
            total,
            successful: counts.successful,
            partial: counts.partial,
            failed: counts.failed,
            deleted_folders,
            batch_id,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn apply_all(
        &self,
        suggestions: Vec<Suggestion>,
        resolver: Arc<FolderResolver>,
    ) -> (Vec<ExecutionResult>, BTreeSet<String>) {
        let total = suggestions.len();
        let ids: Vec<String> = suggestions.iter().map(|s| s.id.clone()).collect();
        let semaphore = Arc::new(Semaphore::new(self.concurrency.min(total.max(1))));
        let mut join_set: JoinSet<AppliedItem> = JoinSet::new();

        for (idx, suggestion) in suggestions.into_iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let storage = self.storage.clone();
            let resolver = resolver.clone();
            join_set.spawn(async move {
                let _permit = permit;
                let mut touched = Vec::new();
                let result =
                    match apply_suggestion(storage.as_ref(), &resolver, &suggestion, &mut touched)
                        .await
                    {
                        Ok(result) => result,
                        Err(err) => {
                            tracing::warn!("suggestion for {} failed: {err}", suggestion.id);
                            ExecutionResult {
                                id: suggestion.id.clone(),
                                status: ExecutionStatus::Error,
                                message: format!("Error: {err}"),
                            }
                        }
                    };
                tracing::debug!("suggestion {} -> {}", result.id, result.status);
                AppliedItem {
                    idx,
                    result,
                    touched,
                }
            });
        }

        let mut ordered: Vec<Option<ExecutionResult>> = (0..total).map(|_| None).collect();
        let mut touched = BTreeSet::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(item) if item.idx < total => {
                    touched.extend(item.touched);
                    ordered[item.idx] = Some(item.result);
                }
                Ok(item) => tracing::warn!("discarding out-of-range result {}", item.idx),
                Err(join_err) => tracing::warn!("suggestion worker failed: {join_err}"),
            }
        }

        let results = ordered
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| ExecutionResult {
                    id,
                    status: ExecutionStatus::Error,
                    message: "Error: worker task did not complete".to_string(),
                })
            })
            .collect();
        (results, touched)
    }

    /// Runs only after every apply has finished.
    async fn cleanup_empty_folders(&self, touched: &BTreeSet<String>) -> Vec<String> {
        let mut deleted = Vec::new();
        for folder_id in touched {
            match self.delete_if_empty(folder_id).await {
                Ok(true) => {
                    tracing::info!("deleted empty folder {folder_id}");
                    deleted.push(folder_id.clone());
                }
                Ok(false) => {}
                Err(err) => tracing::warn!("failed to check/delete folder {folder_id}: {err}"),
            }
        }
        deleted
    }

    async fn delete_if_empty(&self, folder_id: &str) -> Result<bool, AppError> {
        let query = EntryQuery::children_of(folder_id).with_page_size(1);
        let page = self.storage.list_entries(&query, None).await?;
        if !page.entries.is_empty() {
            return Ok(false);
        }
        self.storage.delete_entry(folder_id).await?;
        Ok(true)
    }
}

async fn apply_suggestion(
    storage: &dyn StorageBackend,
    resolver: &FolderResolver,
    suggestion: &Suggestion,
    touched: &mut Vec<String>,
) -> Result<ExecutionResult, AppError> {
    let id = suggestion.id.trim();
    let new_name = suggestion.new_name.trim();
    if id.is_empty() || new_name.is_empty() {
        return Err(AppError::Validation(
            "suggestion is missing id or newName".to_string(),
        ));
    }

    let entry = storage.get_entry(id).await?;
    touched.extend(entry.parents.iter().cloned());

    let Some(path) = suggestion.target_folder() else {
        storage.update_entry(id, &EntryUpdate::rename(new_name)).await?;
        return Ok(ExecutionResult {
            id: id.to_string(),
            status: ExecutionStatus::Success,
            message: format!("Renamed to \"{new_name}\""),
        });
    };

    match resolver.resolve(&path, None, Some(id)).await {
        Resolution::Folder(target) => {
            let update = EntryUpdate::rename_and_move(new_name, &target, &entry.parents);
            storage.update_entry(id, &update).await?;
            Ok(ExecutionResult {
                id: id.to_string(),
                status: ExecutionStatus::Success,
                message: format!("Renamed to \"{new_name}\" and moved to \"{path}\""),
            })
        }
        Resolution::IntoItself => {
            storage.update_entry(id, &EntryUpdate::rename(new_name)).await?;
            Ok(ExecutionResult {
                id: id.to_string(),
                status: ExecutionStatus::Partial,
                message: format!(
                    "Renamed to \"{new_name}\" but \"{path}\" is inside the folder itself"
                ),
            })
        }
        Resolution::Failed => {
            storage.update_entry(id, &EntryUpdate::rename(new_name)).await?;
            Ok(ExecutionResult {
                id: id.to_string(),
                status: ExecutionStatus::Partial,
                message: format!("Renamed to \"{new_name}\" but folder creation failed"),
            })
        }
    }
}
