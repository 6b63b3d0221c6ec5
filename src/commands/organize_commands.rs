use serde::{Deserialize, Serialize};

use crate::commands::organize_pipeline;
use crate::error::AppError;
use crate::models::file_entry::SelectedFile;
use crate::models::operation::ExecutionReport;
use crate::models::suggestion::Suggestion;
use crate::state::{AppState, Session};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRenameRequest {
    #[serde(default)]
    pub selected_files: Vec<SelectedFile>,
    #[serde(default)]
    pub naming_pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRenameRequest {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOrganizeRequest {
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub naming_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOrganizeResponse {
    pub suggestions: Vec<Suggestion>,
    pub total_files: usize,
}

fn validate_execute_request(request: &ExecuteRenameRequest) -> Result<(), AppError> {
    if request.suggestions.is_empty() {
        return Err(AppError::Validation("No suggestions provided".to_string()));
    }
    for (i, suggestion) in request.suggestions.iter().enumerate() {
        if suggestion.id.trim().is_empty() {
            return Err(AppError::Validation(format!("suggestion {i} has no id")));
        }
        if suggestion.new_name.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "suggestion {i} ({}) has no newName",
                suggestion.id
            )));
        }
    }
    Ok(())
}

/// Samples the selection and asks for rename/move suggestions. Nothing is changed.
pub async fn preview_rename(
    state: &AppState,
    session: &Session,
    request: PreviewRenameRequest,
) -> Result<Vec<Suggestion>, AppError> {
    let storage = state.storage_for(session)?;
    if request.selected_files.is_empty() {
        return Err(AppError::Validation("No files selected".to_string()));
    }
    organize_pipeline::run_preview_pipeline(
        state,
        storage,
        &request.selected_files,
        request.naming_pattern.as_deref(),
    )
    .await
}

pub async fn execute_rename(
    state: &AppState,
    session: &Session,
    request: ExecuteRenameRequest,
) -> Result<ExecutionReport, AppError> {
    let storage = state.storage_for(session)?;
    validate_execute_request(&request)?;
    Ok(organize_pipeline::run_execute_pipeline(state, storage, request.suggestions).await)
}

/// Previews every direct child of one folder.
pub async fn batch_organize(
    state: &AppState,
    session: &Session,
    request: BatchOrganizeRequest,
) -> Result<BatchOrganizeResponse, AppError> {
    let storage = state.storage_for(session)?;
    let folder_id = request
        .folder_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("No folder ID provided".to_string()))?;

    let selection = organize_pipeline::list_folder_selection(storage.as_ref(), folder_id).await?;
    if selection.is_empty() {
        return Err(AppError::Validation("No files found in folder".to_string()));
    }

    let suggestions = organize_pipeline::run_preview_pipeline(
        state,
        storage,
        &selection,
        request.naming_pattern.as_deref(),
    )
    .await?;
    Ok(BatchOrganizeResponse {
        suggestions,
        total_files: selection.len(),
    })
}
