//! Table session: a controller wired to its gateway and row action slot.

use std::collections::BTreeSet;

use crate::error::Error;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::gateway::fetch_page;
use crate::table::FetchOutcome;
use crate::table::RowAction;
use crate::table::RowActionDispatcher;
use crate::table::RowActionKind;
use crate::table::TableController;

/// Drives one table against a gateway.
///
/// The session owns the [`TableController`], the gateway and the table's
/// [`RowActionDispatcher`]. State transitions go through
/// [`controller_mut`](Self::controller_mut); [`sync`](Self::sync) then loads
/// whatever the transitions scheduled.
///
/// Mutations never touch local state before the gateway confirms them: a
/// failed delete keeps the selection, a failed update keeps the pending
/// action.
pub struct TableSession<G: Gateway> {
    controller: TableController<G::Row>,
    gateway: G,
    actions: RowActionDispatcher,
}

impl<G: Gateway> TableSession<G> {
    pub fn new(controller: TableController<G::Row>, gateway: G) -> Self {
        Self {
            controller,
            gateway,
            actions: RowActionDispatcher::new(),
        }
    }

    pub fn controller(&self) -> &TableController<G::Row> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TableController<G::Row> {
        &mut self.controller
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn actions(&self) -> &RowActionDispatcher {
        &self.actions
    }

    /// Opens (or replaces) the row action dialog.
    pub fn set_action(&mut self, action: Option<RowAction>) {
        self.actions.set(action);
    }

    /// Closes the row action dialog without doing anything.
    pub fn cancel_action(&mut self) {
        self.actions.clear();
    }

    /// The loaded row the pending action refers to.
    pub fn pending_row(&self) -> Option<&G::Row> {
        self.actions.resolve(self.controller.rows())
    }

    /// Loads the current page if a transition scheduled a fetch.
    pub async fn sync(&mut self) -> Result<Option<FetchOutcome>, Error> {
        let Some(ticket) = self.controller.begin_fetch() else {
            return Ok(None);
        };
        let result = fetch_page(&self.gateway, ticket.request()).await;
        self.controller.complete_fetch(ticket, result).map(Some)
    }

    /// Reloads the current page unconditionally.
    pub async fn refresh(&mut self) -> Result<FetchOutcome, Error> {
        self.controller.invalidate();
        Ok(self.sync().await?.unwrap_or(FetchOutcome::Stale))
    }

    /// Deletes every selected row as one batch.
    ///
    /// On success the rows leave the selection and a reload is scheduled. On
    /// failure nothing changes locally; a gateway that applied the batch
    /// only partially is reported as [`Error::BatchPartiality`].
    ///
    /// After a partial batch the selection still holds the ids the gateway
    /// did remove, so retrying fails with [`GatewayError::NotFound`] until
    /// those rows are deselected. The scheduled reload shows which rows are
    /// left.
    pub async fn delete_selected(&mut self) -> Result<usize, Error> {
        let ids = self.controller.selection().clone();
        if ids.is_empty() {
            return Ok(0);
        }

        match self.gateway.delete(&ids).await {
            Ok(()) => {
                log::info!("Deleted {} selected row(s)", ids.len());
                for id in &ids {
                    self.controller.toggle_row(id, false);
                }
                if self.actions.pending().is_some_and(|a| ids.contains(&a.row_id)) {
                    self.actions.clear();
                }
                self.controller.invalidate();
                Ok(ids.len())
            }
            Err(GatewayError::Partial { removed, .. }) => {
                log::warn!("Batch delete of {} rows only removed {}", ids.len(), removed);
                self.controller.invalidate();
                Err(Error::BatchPartiality {
                    requested: ids.len(),
                    removed,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the row of the pending delete action and closes the dialog.
    pub async fn confirm_delete(&mut self) -> Result<(), Error> {
        let id = self.pending_id(RowActionKind::Delete)?;
        let ids: BTreeSet<String> = [id.clone()].into();
        self.gateway.delete(&ids).await?;

        self.actions.clear();
        self.controller.toggle_row(&id, false);
        self.controller.invalidate();
        Ok(())
    }

    /// Applies `patch` to the row of the pending update action and closes the dialog.
    pub async fn submit_update(&mut self, patch: G::Patch) -> Result<G::Row, Error> {
        let id = self.pending_id(RowActionKind::Update)?;
        let row = self.gateway.update(&id, patch).await?;

        self.actions.clear();
        self.controller.invalidate();
        Ok(row)
    }

    /// Creates a row and schedules a reload.
    pub async fn create(&mut self, fields: G::Fields) -> Result<G::Row, Error> {
        let row = self.gateway.create(fields).await?;
        self.controller.invalidate();
        Ok(row)
    }

    fn pending_id(&self, kind: RowActionKind) -> Result<String, Error> {
        match self.actions.pending() {
            Some(action) if action.kind == kind => Ok(action.row_id.clone()),
            _ => Err(Error::NoPendingAction(kind)),
        }
    }
}
