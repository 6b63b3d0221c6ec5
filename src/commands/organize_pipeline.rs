use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::AppError;
use crate::models::file_entry::{EnrichedFile, EntryKind, SelectedFile};
use crate::models::operation::ExecutionReport;
use crate::models::suggestion::Suggestion;
use crate::services::content_sampler::sample_content;
use crate::services::plan_executor::PlanExecutor;
use crate::services::prompt_builder::build_rename_prompt;
use crate::services::storage::{list_all, EntryQuery, StorageBackend};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Stage 1: enrichment
// ---------------------------------------------------------------------------

async fn enrich_one(storage: &dyn StorageBackend, selected: &SelectedFile) -> String {
    if selected.kind == EntryKind::Folder {
        return String::new();
    }
    match storage.get_entry(&selected.id).await {
        Ok(entry) => sample_content(storage, &entry).await,
        Err(err) => {
            tracing::warn!("metadata lookup failed for {}: {err}", selected.id);
            String::new()
        }
    }
}

/// Samples every selected file through a bounded pool; output order matches `selection`.
pub async fn enrich_selection(
    storage: Arc<dyn StorageBackend>,
    selection: &[SelectedFile],
    concurrency: usize,
) -> Result<Vec<EnrichedFile>, AppError> {
    if selection.is_empty() {
        return Ok(Vec::new());
    }

    let total = selection.len();
    let parallelism = concurrency.max(1).min(total);
    let semaphore = Arc::new(Semaphore::new(parallelism));
    let mut join_set: JoinSet<(usize, String)> = JoinSet::new();

    for (idx, selected) in selection.iter().enumerate() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::General("sampling worker pool closed".to_string()))?;
        let storage = storage.clone();
        let selected = selected.clone();
        join_set.spawn(async move {
            let _permit = permit;
            (idx, enrich_one(storage.as_ref(), &selected).await)
        });
    }

    let mut contents: Vec<String> = vec![String::new(); total];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, content)) => {
                if let Some(slot) = contents.get_mut(idx) {
                    *slot = content;
                }
            }
            Err(join_err) => tracing::warn!("sampling worker failed: {join_err}"),
        }
    }

    let enriched = selection
        .iter()
        .zip(contents)
        .map(|(selected, content)| EnrichedFile {
            id: selected.id.clone(),
            name: selected.name.clone(),
            kind: selected.kind,
            content,
        })
        .collect::<Vec<_>>();
    let sampled = enriched.iter().filter(|f| !f.content.is_empty()).count();
    tracing::debug!("enriched {total} entries, {sampled} with content samples");
    Ok(enriched)
}

/// Direct, non-trashed children of `folder_id`, every page.
pub async fn list_folder_selection(
    storage: &dyn StorageBackend,
    folder_id: &str,
) -> Result<Vec<SelectedFile>, AppError> {
    let entries = list_all(storage, &EntryQuery::children_of(folder_id)).await?;
    Ok(entries.iter().map(SelectedFile::from).collect())
}

// ---------------------------------------------------------------------------
// Stage 2: suggestions
// ---------------------------------------------------------------------------

pub async fn run_preview_pipeline(
    state: &AppState,
    storage: Arc<dyn StorageBackend>,
    selection: &[SelectedFile],
    naming_pattern: Option<&str>,
) -> Result<Vec<Suggestion>, AppError> {
    let enriched = enrich_selection(storage, selection, state.config.sample_concurrency).await?;
    let prompt = build_rename_prompt(&enriched, naming_pattern, &state.config.taxonomy);
    let request_ids: Vec<String> = enriched.iter().map(|f| f.id.clone()).collect();
    let suggestions = state
        .suggestion_client()
        .suggest(&prompt, &request_ids)
        .await;
    tracing::info!(
        "preview produced {} suggestions for {} entries",
        suggestions.len(),
        request_ids.len()
    );
    Ok(suggestions)
}

// ---------------------------------------------------------------------------
// Stage 3: apply
// ---------------------------------------------------------------------------

pub async fn run_execute_pipeline(
    state: &AppState,
    storage: Arc<dyn StorageBackend>,
    suggestions: Vec<Suggestion>,
) -> ExecutionReport {
    PlanExecutor::new(storage, state.config.execute_concurrency)
        .execute(suggestions)
        .await
}
