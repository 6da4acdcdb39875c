use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind, RenameMode};

/// Kind of change recorded against the watched file map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Change,
    Delete,
}

/// Flatten a notify event into per-path changes.
///
/// Renames become a delete of the old path and an add of the new one; a rename
/// whose direction the backend does not report is resolved by checking whether
/// the path still exists. Access and unclassified events produce nothing.
pub(super) fn changes_from_event(event: &notify::Event) -> Vec<(PathBuf, ChangeKind)> {
    let paths = &event.paths;
    let uniform = |kind: ChangeKind| -> Vec<(PathBuf, ChangeKind)> {
        paths.iter().map(|path| (path.clone(), kind)).collect()
    };
    match event.kind {
        EventKind::Create(_) => uniform(ChangeKind::Add),
        EventKind::Remove(_) => uniform(ChangeKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => uniform(ChangeKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => uniform(ChangeKind::Add),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::with_capacity(paths.len());
            if let Some(from) = paths.first() {
                changes.push((from.clone(), ChangeKind::Delete));
            }
            for to in paths.iter().skip(1) {
                changes.push((to.clone(), ChangeKind::Add));
            }
            changes
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|path| {
                let kind = if path.exists() {
                    ChangeKind::Add
                } else {
                    ChangeKind::Delete
                };
                (path.clone(), kind)
            })
            .collect(),
        EventKind::Modify(_) => uniform(ChangeKind::Change),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
