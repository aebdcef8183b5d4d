//! Application state for the API server.

use crate::actions::ActionContext;
use crate::books::BookProvider;
use crate::db::Database;
use crate::subscription::PlanCatalog;

/// Shared application state.
///
/// Generic over `D: Database` and `P: BookProvider` so tests can run the
/// router against an in-memory database and a canned provider.
pub struct AppState<D: Database, P: BookProvider> {
    ctx: ActionContext<D, P>,
}

// Manual Clone impl - ActionContext is Arc-backed, D and P need not be Clone
impl<D: Database, P: BookProvider> Clone for AppState<D, P> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
        }
    }
}

impl<D: Database, P: BookProvider> AppState<D, P> {
    pub fn new(ctx: ActionContext<D, P>) -> Self {
        Self { ctx }
    }

    /// Context handed to actions.
    pub fn ctx(&self) -> &ActionContext<D, P> {
        &self.ctx
    }

    pub fn db(&self) -> &D {
        self.ctx.db()
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.ctx.plans
    }
}
