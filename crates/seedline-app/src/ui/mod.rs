//! Terminal user interface.
//!
//! Layout: `input.rs` (reader thread, keymap), `app.rs` (foreground state,
//! dialogs), `view.rs` (search, category filter, sort, selection), `render.rs`
//! (widgets and overlays), `humanize.rs` (value formatting).
//!
//! # Design
//! - One cooperative loop owns the terminal: it waits on key events, command
//!   notices, snapshot changes, and health changes, handling one at a time.
//! - The loop never mutates the store itself; every status change goes through
//!   the dispatcher and every refresh through the synchronizer's handle.

mod app;
mod humanize;
mod input;
mod render;
mod view;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::Event;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use seedline_state::{Dispatcher, Notice, StateStore, SyncHandle};
use tokio::sync::mpsc;
use tracing::{debug, info};

use app::{App, Command};
use input::map_key;

type Backend = CrosstermBackend<Stdout>;

const STATUS_TICK: Duration = Duration::from_millis(500);

/// Collaborators the interface drives.
pub(crate) struct UiContext<'a> {
    pub(crate) daemon: &'a str,
    pub(crate) store: &'a StateStore,
    pub(crate) dispatcher: &'a Dispatcher,
    pub(crate) sync: &'a SyncHandle,
    pub(crate) notices: mpsc::UnboundedReceiver<Notice>,
}

/// Run the interface until the operator quits. The terminal is restored on
/// every exit path.
pub(crate) async fn run(ctx: UiContext<'_>) -> anyhow::Result<()> {
    let mut terminal = setup_terminal().context("failed to prepare the terminal")?;
    let result = event_loop(&mut terminal, ctx).await;
    let restored = restore_terminal(&mut terminal).context("failed to restore the terminal");
    result.and(restored)
}

async fn event_loop(terminal: &mut Terminal<Backend>, ctx: UiContext<'_>) -> anyhow::Result<()> {
    let UiContext {
        daemon,
        store,
        dispatcher,
        sync,
        mut notices,
    } = ctx;

    let (event_tx, mut events) = mpsc::unbounded_channel();
    input::spawn_reader(event_tx).context("failed to start the input reader")?;
    let mut snapshots = store.subscribe();
    let mut health = sync.health();
    let mut health_open = true;
    let mut ticker = tokio::time::interval(STATUS_TICK);

    let mut app = App::new(daemon, store.read());
    app.set_health(health.borrow().clone());
    info!("terminal interface started");

    loop {
        terminal.draw(|frame| render::draw(frame, &app))?;

        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let Event::Key(key) = event
                    && let Some(action) = map_key(app.mode, key)
                    && let Some(command) = app.handle(action)
                {
                    execute_command(&mut app, dispatcher, sync, command);
                }
            }
            Some(notice) = notices.recv() => app.notify(&notice),
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                app.set_snapshot(snapshot);
            }
            changed = health.changed(), if health_open => {
                if changed.is_ok() {
                    let current = health.borrow_and_update().clone();
                    app.set_health(current);
                } else {
                    health_open = false;
                }
            }
            _ = ticker.tick() => app.expire_status(Instant::now()),
        }

        if app.should_quit {
            break;
        }
    }

    // Closing the channel lets the reader thread exit on its next poll.
    drop(events);
    info!("terminal interface stopped");
    Ok(())
}

fn execute_command(app: &mut App, dispatcher: &Dispatcher, sync: &SyncHandle, command: Command) {
    match command {
        Command::Refresh => sync.refresh_now(),
        Command::Dispatch(intent) => {
            debug!(?intent, "dispatching intent");
            // The task reports through the notice channel; its handle is not needed.
            if let Err(err) = dispatcher.dispatch(intent) {
                app.reject(&err);
            }
        }
    }
}

fn setup_terminal() -> io::Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
