//! Search, category filter, sort, and selection over the store's snapshot.
//!
//! None of this touches the store: the view derives the visible rows from
//! whichever snapshot is current and remembers the selection by item id, so a
//! refresh that reorders or drops rows keeps the cursor on the same item when
//! it is still visible.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use seedline_torrent_core::{Item, ItemId};

/// Column the table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SortKey {
    Name,
    Status,
    Progress,
    Size,
}

impl SortKey {
    const fn next(self) -> Option<Self> {
        match self {
            Self::Name => Some(Self::Status),
            Self::Status => Some(Self::Progress),
            Self::Progress => Some(Self::Size),
            Self::Size => None,
        }
    }

    fn compare(self, left: &Item, right: &Item) -> Ordering {
        match self {
            Self::Name => left.name.to_lowercase().cmp(&right.name.to_lowercase()),
            Self::Status => left.status.label().cmp(right.status.label()),
            Self::Progress => left.progress.total_cmp(&right.progress),
            Self::Size => left.size_bytes.cmp(&right.size_bytes),
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SortOrder {
    pub(crate) key: SortKey,
    pub(crate) descending: bool,
}

impl Display for SortOrder {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let key = match self.key {
            SortKey::Name => "name",
            SortKey::Status => "status",
            SortKey::Progress => "progress",
            SortKey::Size => "size",
        };
        let arrow = if self.descending { "↓" } else { "↑" };
        write!(formatter, "{key} {arrow}")
    }
}

/// Which categories the table shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum CategoryFilter {
    #[default]
    All,
    Uncategorized,
    Named(String),
}

impl CategoryFilter {
    pub(crate) fn matches(&self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::Uncategorized => item.category.is_none(),
            Self::Named(name) => item.category.as_deref() == Some(name.as_str()),
        }
    }

    /// `All`, `Uncategorized`, then every category present in `items`, by name.
    pub(crate) fn choices(items: &[Item]) -> Vec<Self> {
        let mut names: Vec<&str> = items
            .iter()
            .filter_map(|item| item.category.as_deref())
            .collect();
        names.sort_by_key(|name| name.to_lowercase());
        names.dedup();
        let mut choices = vec![Self::All, Self::Uncategorized];
        choices.extend(names.into_iter().map(|name| Self::Named(name.to_string())));
        choices
    }
}

impl Display for CategoryFilter {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => formatter.write_str("All"),
            Self::Uncategorized => formatter.write_str("Uncategorized"),
            Self::Named(name) => formatter.write_str(name),
        }
    }
}

/// Operator-controlled presentation state.
#[derive(Debug, Default)]
pub(crate) struct ViewState {
    query: String,
    category: CategoryFilter,
    sort: Option<SortOrder>,
    selected: Option<ItemId>,
    last_index: usize,
}

impl ViewState {
    pub(crate) fn query(&self) -> &str {
        &self.query
    }

    pub(crate) const fn category(&self) -> &CategoryFilter {
        &self.category
    }

    pub(crate) fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
    }

    /// Fall back to every category once the chosen one has no items left.
    pub(crate) fn drop_vanished_category(&mut self, items: &[Item]) {
        if let CategoryFilter::Named(name) = &self.category
            && !items
                .iter()
                .any(|item| item.category.as_deref() == Some(name.as_str()))
        {
            self.category = CategoryFilter::All;
        }
    }

    pub(crate) const fn sort(&self) -> Option<SortOrder> {
        self.sort
    }

    pub(crate) const fn selected_id(&self) -> Option<&ItemId> {
        self.selected.as_ref()
    }

    pub(crate) fn push_query(&mut self, ch: char) {
        self.query.push(ch);
    }

    pub(crate) fn pop_query(&mut self) {
        self.query.pop();
    }

    pub(crate) fn clear_query(&mut self) {
        self.query.clear();
    }

    /// Daemon order, then each column ascending and descending, then back.
    pub(crate) fn cycle_sort(&mut self) {
        self.sort = match self.sort {
            None => Some(SortOrder {
                key: SortKey::Name,
                descending: false,
            }),
            Some(SortOrder {
                key,
                descending: false,
            }) => Some(SortOrder {
                key,
                descending: true,
            }),
            Some(SortOrder {
                key,
                descending: true,
            }) => key.next().map(|key| SortOrder {
                key,
                descending: false,
            }),
        };
    }

    /// Rows matching the category filter and the query, in display order.
    pub(crate) fn visible<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        let needle = self.query.to_lowercase();
        let dotted = needle.replace(' ', ".");
        let mut rows: Vec<&Item> = items
            .iter()
            .filter(|item| self.category.matches(item))
            .filter(|item| {
                if needle.is_empty() {
                    return true;
                }
                let name = item.name.to_lowercase();
                name.contains(&needle) || name.contains(&dotted)
            })
            .collect();
        if let Some(order) = self.sort {
            rows.sort_by(|left, right| {
                let ordering = order.key.compare(left, right);
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        rows
    }

    /// Re-anchor the selection after the visible rows changed.
    ///
    /// Keeps the selected id when it is still visible; otherwise selects the row
    /// now occupying the previous position.
    pub(crate) fn sync_selection(&mut self, rows: &[&Item]) -> Option<usize> {
        if rows.is_empty() {
            self.selected = None;
            return None;
        }
        let index = self
            .selected
            .as_ref()
            .and_then(|id| rows.iter().position(|item| &item.id == id))
            .unwrap_or_else(|| self.last_index.min(rows.len() - 1));
        self.select_index(rows, index);
        Some(index)
    }

    pub(crate) fn move_selection(&mut self, rows: &[&Item], delta: isize) {
        let Some(current) = self.sync_selection(rows) else {
            return;
        };
        let target = current.saturating_add_signed(delta).min(rows.len() - 1);
        self.select_index(rows, target);
    }

    pub(crate) fn select_first(&mut self, rows: &[&Item]) {
        if !rows.is_empty() {
            self.select_index(rows, 0);
        }
    }

    pub(crate) fn select_last(&mut self, rows: &[&Item]) {
        if let Some(last) = rows.len().checked_sub(1) {
            self.select_index(rows, last);
        }
    }

    fn select_index(&mut self, rows: &[&Item], index: usize) {
        self.selected = Some(rows[index].id.clone());
        self.last_index = index;
    }
}
