use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AppError;
use crate::models::tree::TreeNode;
use crate::services::ownership_tree;
use crate::state::{AppState, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriveStatus {
    pub connected: bool,
}

pub async fn build_ownership_report(
    state: &AppState,
    session: &Session,
) -> Result<BTreeMap<String, TreeNode>, AppError> {
    let storage = state.storage_for(session)?;
    ownership_tree::build_ownership_tree(storage.as_ref()).await
}

/// Same listing as [`build_ownership_report`], rendered as an indented text outline.
pub async fn build_ownership_outline(
    state: &AppState,
    session: &Session,
) -> Result<String, AppError> {
    let tree = build_ownership_report(state, session).await?;
    Ok(ownership_tree::render_outline(&tree))
}

pub fn drive_status(session: &Session) -> DriveStatus {
    DriveStatus {
        connected: session.require_credentials().is_ok(),
    }
}
