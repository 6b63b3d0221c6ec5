use std::collections::{BTreeMap, HashSet};

use crate::error::AppError;
use crate::models::file_entry::StorageEntry;
use crate::models::tree::TreeNode;
use crate::services::storage::{list_all, EntryQuery, StorageBackend};

pub fn entry_label(entry: &StorageEntry) -> String {
    if entry.is_folder() {
        return format!("{} (folder)", entry.name);
    }
    let subtype = entry
        .mime_type
        .rsplit('/')
        .next()
        .unwrap_or(entry.mime_type.as_str());
    format!("{} ({subtype})", entry.name)
}

/// Parent-to-children graph over `entries`.
///
/// Parents outside the set become placeholder nodes until (and unless) the
/// real entry shows up. Children keep the order they were first seen in.
pub fn build_tree(entries: &[StorageEntry]) -> BTreeMap<String, TreeNode> {
    let mut tree: BTreeMap<String, TreeNode> = BTreeMap::new();
    for entry in entries {
        let label = entry_label(entry);
        match tree.get_mut(&entry.id) {
            Some(node) => node.label = label,
            None => {
                tree.insert(
                    entry.id.clone(),
                    TreeNode {
                        label,
                        children: Vec::new(),
                    },
                );
            }
        }

        for parent in &entry.parents {
            let node = tree
                .entry(parent.clone())
                .or_insert_with(|| TreeNode::placeholder(parent));
            if !node.children.contains(&entry.id) {
                node.children.push(entry.id.clone());
            }
        }
    }
    tree
}

/// Lists every owned, non-trashed entry and builds the tree from them.
pub async fn build_ownership_tree(
    storage: &dyn StorageBackend,
) -> Result<BTreeMap<String, TreeNode>, AppError> {
    let entries: Vec<StorageEntry> = list_all(storage, &EntryQuery::owned())
        .await?
        .into_iter()
        .filter(|entry| entry.owned_by_me)
        .collect();
    let tree = build_tree(&entries);
    tracing::info!(
        "ownership tree: {} owned entries, {} nodes",
        entries.len(),
        tree.len()
    );
    Ok(tree)
}

/// Indented outline, two spaces per level. Safe on cyclic input: nodes only
/// reachable through a cycle are printed as extra roots.
pub fn render_outline(tree: &BTreeMap<String, TreeNode>) -> String {
    let child_ids: HashSet<&str> = tree
        .values()
        .flat_map(|node| node.children.iter().map(String::as_str))
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut out = String::new();
    let roots = tree
        .keys()
        .map(String::as_str)
        .filter(|id| !child_ids.contains(id));
    for root in roots {
        render_node(tree, root, 0, &mut visited, &mut out);
    }
    for id in tree.keys() {
        if !visited.contains(id.as_str()) {
            render_node(tree, id, 0, &mut visited, &mut out);
        }
    }
    out
}

fn render_node<'a>(
    tree: &'a BTreeMap<String, TreeNode>,
    id: &'a str,
    depth: usize,
    visited: &mut HashSet<&'a str>,
    out: &mut String,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(node) = tree.get(id) else {
        return;
    };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&node.label);
    out.push('\n');
    for child in &node.children {
        render_node(tree, child, depth + 1, visited, out);
    }
}
