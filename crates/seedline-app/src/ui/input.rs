//! Keyboard input: a background reader thread and the key-to-action mapping.

use std::io;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Which keymap is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    Normal,
    Search,
    Help,
    Confirm,
    Categories,
    Files,
}

/// Operator action decoded from one key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    Up,
    Down,
    Top,
    Bottom,
    Pause,
    Resume,
    Toggle,
    Delete { delete_files: bool },
    Open,
    OpenFolder,
    Refresh,
    CycleSort,
    ToggleInfo,
    ShowHelp,
    ShowCategories,
    ShowFiles,
    StartSearch,
    SearchInput(char),
    SearchBackspace,
    SearchCommit,
    SearchCancel,
    ConfirmToggle,
    ConfirmAccept,
    Choose,
    CloseOverlay,
}

/// Decode a key press for the given mode. Releases and repeats are ignored.
pub(crate) fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Action::Quit);
    }
    match mode {
        InputMode::Normal => normal_key(key.code),
        InputMode::Search => search_key(key.code),
        InputMode::Help => match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::F(1) | KeyCode::Char('?' | 'q') => {
                Some(Action::CloseOverlay)
            }
            _ => None,
        },
        InputMode::Confirm => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::CloseOverlay),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h' | 'l') => {
                Some(Action::ConfirmToggle)
            }
            KeyCode::Enter => Some(Action::ConfirmAccept),
            _ => None,
        },
        InputMode::Categories | InputMode::Files => list_key(mode, key.code),
    }
}

const fn normal_key(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('k') | KeyCode::Up => Action::Up,
        KeyCode::Char('j') | KeyCode::Down => Action::Down,
        KeyCode::Char('g') | KeyCode::Home => Action::Top,
        KeyCode::Char('G') | KeyCode::End => Action::Bottom,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('s') => Action::Resume,
        KeyCode::Char(' ') => Action::Toggle,
        KeyCode::Char('x') | KeyCode::Delete => Action::Delete {
            delete_files: false,
        },
        KeyCode::Char('X') => Action::Delete { delete_files: true },
        KeyCode::Char('o') | KeyCode::Enter => Action::Open,
        KeyCode::Char('O') => Action::OpenFolder,
        KeyCode::Char('f') => Action::ShowFiles,
        KeyCode::Char('c') => Action::ShowCategories,
        KeyCode::Char('r') => Action::Refresh,
        KeyCode::Char('t') => Action::CycleSort,
        KeyCode::Char('i') => Action::ToggleInfo,
        KeyCode::Char('?') | KeyCode::F(1) => Action::ShowHelp,
        KeyCode::Char('/') => Action::StartSearch,
        _ => return None,
    };
    Some(action)
}

const fn search_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Esc => Some(Action::SearchCancel),
        KeyCode::Enter => Some(Action::SearchCommit),
        KeyCode::Backspace => Some(Action::SearchBackspace),
        KeyCode::Char(ch) => Some(Action::SearchInput(ch)),
        _ => None,
    }
}

/// Keys shared by the category picker and the file list.
const fn list_key(mode: InputMode, code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::CloseOverlay),
        KeyCode::Char('c') if matches!(mode, InputMode::Categories) => Some(Action::CloseOverlay),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Enter => Some(Action::Choose),
        KeyCode::Char('o') if matches!(mode, InputMode::Files) => Some(Action::Choose),
        _ => None,
    }
}

/// Bindings shown by the help overlay.
pub(crate) const BINDINGS: &[(&str, &str)] = &[
    ("j / k, ↓ / ↑", "move selection"),
    ("g / G", "first / last item"),
    ("p", "pause"),
    ("s", "resume"),
    ("space", "toggle pause / resume"),
    ("x", "delete (keep files), asks first"),
    ("X", "delete with files, asks first"),
    ("o, enter", "open content"),
    ("O", "open containing folder"),
    ("f", "list files"),
    ("c", "filter by category"),
    ("r", "refresh now"),
    ("/", "search by name"),
    ("t", "cycle sort order"),
    ("i", "toggle info pane"),
    ("h / l, ← / →", "switch Ok / Cancel in dialogs"),
    ("?, F1", "this help"),
    ("q, esc", "close overlay / quit"),
];

/// Read terminal events on a detached thread.
///
/// The thread exits within one poll interval once the receiver is dropped.
pub(crate) fn spawn_reader(tx: mpsc::UnboundedSender<Event>) -> io::Result<()> {
    thread::Builder::new()
        .name("seedline-input".into())
        .spawn(move || forward_events(&tx, || event::poll(POLL_INTERVAL), event::read))?;
    Ok(())
}

/// Forward events until the receiver goes away or polling fails.
fn forward_events(
    tx: &mpsc::UnboundedSender<Event>,
    mut poll: impl FnMut() -> io::Result<bool>,
    mut read: impl FnMut() -> io::Result<Event>,
) {
    while !tx.is_closed() {
        match poll() {
            Ok(true) => match read() {
                Ok(evt) => {
                    if tx.send(evt).is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "failed to read terminal event"),
            },
            Ok(false) => {}
            Err(err) => {
                warn!(error = %err, "terminal event poll failed");
                break;
            }
        }
    }
}
