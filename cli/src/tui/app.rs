use ratatui::widgets::TableState;
use tracing::debug;

use logicore_core::error::AppError;
use logicore_core::usecase::fetch::FetchTicket;
use logicore_core::{DashboardState, DashboardView};

/// A finished fetch as sent back by the loader task.
pub type Loaded = (FetchTicket, Result<Option<DashboardView>, AppError>);

pub struct App {
    pub state: DashboardState,
    pub view: Option<DashboardView>,
    pub error: Option<String>,
    pub table: TableState,
    pending: Option<FetchTicket>,
}

impl App {
    pub fn new(state: DashboardState) -> App {
        App {
            state,
            view: None,
            error: None,
            table: TableState::default(),
            pending: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Records the ticket of the fetch just started; earlier ones are ignored.
    pub fn begin(&mut self, ticket: FetchTicket) {
        self.pending = Some(ticket);
    }

    pub fn apply(&mut self, ticket: FetchTicket, result: Result<Option<DashboardView>, AppError>) {
        if self.pending != Some(ticket) {
            debug!("Ignoring result of ticket {}", ticket.value());
            return;
        }
        match result {
            Ok(Some(view)) => {
                self.table.select(if view.rows.is_empty() { None } else { Some(0) });
                self.view = Some(view);
                self.error = None;
                self.pending = None;
            }
            // Superseded inside the use case; a newer result is on its way.
            Ok(None) => {}
            Err(e) => {
                self.error = Some(e.user_message());
                self.pending = None;
            }
        }
    }

    fn row_count(&self) -> usize {
        self.view.as_ref().map(|v| v.rows.len()).unwrap_or(0)
    }

    pub fn next_row(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.table.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.table.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.table.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table.select(Some(i));
    }
}
