pub mod app;
pub mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

use logicore_core::time::today;
use logicore_core::{DashboardState, DashboardUseCase, Identity, JapaneseHolidays, RangeSelector, RowStore};

use crate::tui::app::{App, Loaded};
use crate::Context;

type Dashboard = DashboardUseCase<Arc<dyn RowStore>, JapaneseHolidays>;

pub async fn run(ctx: &Context, identity: Identity, selector: RangeSelector) -> Result<()> {
    let usecase = Arc::new(DashboardUseCase::new(ctx.store.clone(), ctx.calendar.clone()));
    let mut app = App::new(DashboardState { identity, selector });
    let (tx, rx) = mpsc::unbounded_channel();
    spawn_load(&usecase, &mut app, &tx);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &usecase, &tx, rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// Starts a fetch for the current selector on a separate task. The result
/// comes back over `tx` tagged with its ticket.
fn spawn_load(usecase: &Arc<Dashboard>, app: &mut App, tx: &UnboundedSender<Loaded>) {
    let ticket = usecase.begin();
    app.begin(ticket);
    let usecase = Arc::clone(usecase);
    let state = app.state.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = usecase.load_with(ticket, &state, today()).await;
        // The receiver is gone once the UI has quit.
        let _ = tx.send((ticket, result));
    });
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    usecase: &Arc<Dashboard>,
    tx: &UnboundedSender<Loaded>,
    mut rx: UnboundedReceiver<Loaded>,
) -> Result<()> {
    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .map_err(|e| io::Error::other(e.to_string()))?;

        while let Ok((ticket, result)) = rx.try_recv() {
            app.apply(ticket, result);
        }

        let ready = tokio::task::block_in_place(|| event::poll(Duration::from_millis(100)))?;
        if !ready {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    info!("Dashboard closed");
                    return Ok(());
                }
                KeyCode::Left | KeyCode::Char('h') => {
                    app.state.selector.previous();
                    spawn_load(usecase, app, tx);
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    app.state.selector.next();
                    spawn_load(usecase, app, tx);
                }
                KeyCode::Char('w') => {
                    app.state.selector.toggle_mode();
                    spawn_load(usecase, app, tx);
                }
                KeyCode::Char('r') => spawn_load(usecase, app, tx),
                KeyCode::Down | KeyCode::Char('j') => app.next_row(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_row(),
                _ => {}
            }
        }
    }
}
