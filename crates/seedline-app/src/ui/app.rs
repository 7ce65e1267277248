//! Foreground state of the terminal UI and its reaction to operator actions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use seedline_state::{DispatchError, Intent, Notice, Snapshot, SyncHealth};
use seedline_torrent_core::{Item, ItemFile, ItemId};

use super::input::{Action, InputMode};
use super::view::{CategoryFilter, ViewState};

const INFO_TTL: Duration = Duration::from_secs(4);
const ERROR_TTL: Duration = Duration::from_secs(8);

/// Work the event loop performs on behalf of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Dispatch(Intent),
    Refresh,
}

/// Transient message shown in the status line.
#[derive(Debug, Clone)]
pub(crate) struct StatusMessage {
    pub(crate) text: String,
    pub(crate) is_error: bool,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(text: impl Into<String>, is_error: bool) -> Self {
        let ttl = if is_error { ERROR_TTL } else { INFO_TTL };
        Self {
            text: text.into(),
            is_error,
            expires_at: Instant::now() + ttl,
        }
    }
}

/// Delete awaiting the operator's answer; `confirm` is the highlighted button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeletePrompt {
    pub(crate) id: ItemId,
    pub(crate) name: String,
    pub(crate) delete_files: bool,
    pub(crate) confirm: bool,
}

/// Files of one item as last listed by the daemon.
#[derive(Debug, Clone)]
pub(crate) struct FilesView {
    pub(crate) id: ItemId,
    pub(crate) name: String,
    pub(crate) files: Vec<ItemFile>,
    pub(crate) cursor: usize,
}

pub(crate) struct App {
    pub(crate) daemon: String,
    pub(crate) snapshot: Arc<Snapshot>,
    pub(crate) health: SyncHealth,
    pub(crate) view: ViewState,
    pub(crate) mode: InputMode,
    pub(crate) show_info: bool,
    pub(crate) status: Option<StatusMessage>,
    pub(crate) prompt: Option<DeletePrompt>,
    pub(crate) category_cursor: usize,
    pub(crate) files: Option<FilesView>,
    pub(crate) should_quit: bool,
}

impl App {
    pub(crate) fn new(daemon: impl Into<String>, snapshot: Arc<Snapshot>) -> Self {
        let mut app = Self {
            daemon: daemon.into(),
            snapshot,
            health: SyncHealth::default(),
            view: ViewState::default(),
            mode: InputMode::Normal,
            show_info: false,
            status: None,
            prompt: None,
            category_cursor: 0,
            files: None,
            should_quit: false,
        };
        app.resync_selection();
        app
    }

    pub(crate) fn rows(&self) -> Vec<&Item> {
        self.view.visible(&self.snapshot.items)
    }

    pub(crate) fn selected_item(&self) -> Option<&Item> {
        self.view
            .selected_id()
            .and_then(|id| self.snapshot.get(id))
    }

    pub(crate) fn category_choices(&self) -> Vec<CategoryFilter> {
        CategoryFilter::choices(&self.snapshot.items)
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshot = snapshot;
        self.view.drop_vanished_category(&self.snapshot.items);
        self.category_cursor = self
            .category_cursor
            .min(self.category_choices().len().saturating_sub(1));
        self.resync_selection();
    }

    pub(crate) fn set_health(&mut self, health: SyncHealth) {
        self.health = health;
    }

    pub(crate) fn notify(&mut self, notice: &Notice) {
        self.status = Some(StatusMessage::new(notice.message.clone(), notice.is_error));
        let Some(files) = &notice.files else {
            return;
        };
        if self.mode != InputMode::Normal {
            return;
        }
        if files.is_empty() {
            self.info("the daemon listed no files");
            return;
        }
        let name = self
            .snapshot
            .get(&notice.item_id)
            .map_or_else(|| notice.item_id.to_string(), |item| item.name.clone());
        self.files = Some(FilesView {
            id: notice.item_id.clone(),
            name,
            files: files.clone(),
            cursor: 0,
        });
        self.mode = InputMode::Files;
    }

    pub(crate) fn reject(&mut self, error: &DispatchError) {
        self.status = Some(StatusMessage::new(error.to_string(), true));
    }

    pub(crate) fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage::new(text, false));
    }

    pub(crate) fn expire_status(&mut self, now: Instant) {
        if self
            .status
            .as_ref()
            .is_some_and(|status| status.expires_at <= now)
        {
            self.status = None;
        }
    }

    /// Apply an action to the view and return the work it asks for.
    pub(crate) fn handle(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Up => self.move_cursor(-1),
            Action::Down => self.move_cursor(1),
            Action::Top => {
                let rows = self.view.visible(&self.snapshot.items);
                self.view.select_first(&rows);
            }
            Action::Bottom => {
                let rows = self.view.visible(&self.snapshot.items);
                self.view.select_last(&rows);
            }
            Action::Pause => return self.intent(Intent::Pause),
            Action::Resume => return self.intent(Intent::Resume),
            Action::Toggle => return self.intent(Intent::Toggle),
            Action::Delete { delete_files } => self.prompt_delete(delete_files),
            Action::ConfirmToggle => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.confirm = !prompt.confirm;
                }
            }
            Action::ConfirmAccept => {
                self.mode = InputMode::Normal;
                let prompt = self.prompt.take()?;
                if prompt.confirm {
                    return Some(Command::Dispatch(Intent::Delete {
                        id: prompt.id,
                        delete_files: prompt.delete_files,
                    }));
                }
            }
            Action::Open => return self.intent(Intent::Open),
            Action::OpenFolder => return self.intent(Intent::OpenFolder),
            Action::Refresh => {
                self.info("refreshing");
                return Some(Command::Refresh);
            }
            Action::CycleSort => {
                self.view.cycle_sort();
                self.resync_selection();
            }
            Action::ToggleInfo => self.show_info = !self.show_info,
            Action::ShowHelp => self.mode = InputMode::Help,
            Action::ShowCategories => {
                let current = self.view.category();
                self.category_cursor = self
                    .category_choices()
                    .iter()
                    .position(|choice| choice == current)
                    .unwrap_or(0);
                self.mode = InputMode::Categories;
            }
            Action::ShowFiles => {
                let command = self.intent(Intent::Files);
                if command.is_some() {
                    self.info("listing files");
                }
                return command;
            }
            Action::Choose => return self.choose(),
            Action::CloseOverlay => {
                self.mode = InputMode::Normal;
                self.prompt = None;
                self.files = None;
            }
            Action::StartSearch => self.mode = InputMode::Search,
            Action::SearchInput(ch) => {
                self.view.push_query(ch);
                self.resync_selection();
            }
            Action::SearchBackspace => {
                self.view.pop_query();
                self.resync_selection();
            }
            Action::SearchCommit => self.mode = InputMode::Normal,
            Action::SearchCancel => {
                self.view.clear_query();
                self.mode = InputMode::Normal;
                self.resync_selection();
            }
        }
        None
    }

    fn intent(&mut self, build: impl FnOnce(ItemId) -> Intent) -> Option<Command> {
        let Some(id) = self.selected_item().map(|item| item.id.clone()) else {
            self.info("no item selected");
            return None;
        };
        Some(Command::Dispatch(build(id)))
    }

    fn prompt_delete(&mut self, delete_files: bool) {
        let Some(item) = self.selected_item() else {
            self.info("no item selected");
            return;
        };
        self.prompt = Some(DeletePrompt {
            id: item.id.clone(),
            name: item.name.clone(),
            delete_files,
            confirm: false,
        });
        self.mode = InputMode::Confirm;
    }

    fn choose(&mut self) -> Option<Command> {
        match self.mode {
            InputMode::Categories => {
                if let Some(choice) = self.category_choices().into_iter().nth(self.category_cursor) {
                    self.view.set_category(choice);
                }
                self.mode = InputMode::Normal;
                self.resync_selection();
                None
            }
            InputMode::Files => {
                let view = self.files.as_ref()?;
                let file = view.files.get(view.cursor)?;
                if !file.is_complete() {
                    let text = format!("{} is not complete yet", file.name);
                    self.status = Some(StatusMessage::new(text, true));
                    return None;
                }
                Some(Command::Dispatch(Intent::OpenFile {
                    id: view.id.clone(),
                    name: file.name.clone(),
                }))
            }
            _ => None,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        match self.mode {
            InputMode::Categories => {
                let last = self.category_choices().len().saturating_sub(1);
                self.category_cursor = self.category_cursor.saturating_add_signed(delta).min(last);
            }
            InputMode::Files => {
                if let Some(view) = self.files.as_mut() {
                    let last = view.files.len().saturating_sub(1);
                    view.cursor = view.cursor.saturating_add_signed(delta).min(last);
                }
            }
            _ => {
                let rows = self.view.visible(&self.snapshot.items);
                self.view.move_selection(&rows, delta);
            }
        }
    }

    fn resync_selection(&mut self) {
        let rows = self.view.visible(&self.snapshot.items);
        self.view.sync_selection(&rows);
    }
}
