//! Pending row action (update / delete dialogs)

use std::fmt;

use crate::model::Row;

/// What the user asked to do with a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowActionKind {
    Update,
    Delete,
}

impl RowActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowActionKind::Update => "update",
            RowActionKind::Delete => "delete",
        }
    }
}

impl fmt::Display for RowActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action on one row. The row is referenced by id, not owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAction {
    pub row_id: String,
    pub kind: RowActionKind,
}

impl RowAction {
    pub fn update(row_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            kind: RowActionKind::Update,
        }
    }

    pub fn delete(row_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            kind: RowActionKind::Delete,
        }
    }
}

/// Holds at most one pending [`RowAction`] for a table.
///
/// Setting a new action replaces the pending one; there is no queue. The
/// dialog driven by the action closes only when the slot is cleared, which
/// the owner does on success and on cancel. A failed mutation leaves the
/// action pending so the user can retry.
#[derive(Debug, Clone, Default)]
pub struct RowActionDispatcher {
    pending: Option<RowAction>,
}

impl RowActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or clears the pending action.
    pub fn set(&mut self, action: Option<RowAction>) {
        if let (Some(previous), Some(next)) = (&self.pending, &action) {
            log::debug!(
                "Replacing pending {} on '{}' with {} on '{}'",
                previous.kind,
                previous.row_id,
                next.kind,
                next.row_id
            );
        }
        self.pending = action;
    }

    /// Clears the pending action, returning it.
    pub fn clear(&mut self) -> Option<RowAction> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&RowAction> {
        self.pending.as_ref()
    }

    /// Returns `true` if an action of this kind is pending.
    pub fn is_open(&self, kind: RowActionKind) -> bool {
        self.pending.as_ref().is_some_and(|a| a.kind == kind)
    }

    /// Finds the pending action's row among the loaded rows.
    ///
    /// Returns `None` when nothing is pending or the row is no longer loaded.
    pub fn resolve<'a, R: Row>(&self, rows: &'a [R]) -> Option<&'a R> {
        let action = self.pending.as_ref()?;
        rows.iter().find(|r| r.id() == action.row_id)
    }
}
