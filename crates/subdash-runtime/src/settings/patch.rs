#![forbid(unsafe_code)]

//! Partial updates to the settings record.
//!
//! Every field is an `Option`: `None` leaves the stored value alone, `Some`
//! writes it, so `Some(String::new())` and an empty filter object are real
//! values rather than "unset".

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::types::{
    ChartSortOrder, DashboardWidgets, SortOrder, SortPreference, Theme, UserSettings, WidgetSize,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableSettingsUpdate {
    /// Merged key by key into the stored widths.
    pub column_widths: Option<BTreeMap<String, u32>>,
    pub visible_columns: Option<Vec<String>>,
    /// Applied only together with `sort_order`.
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub page_size: Option<u32>,
}

impl TableSettingsUpdate {
    #[must_use]
    pub fn column_width(mut self, column: impl Into<String>, width: u32) -> Self {
        self.column_widths
            .get_or_insert_with(BTreeMap::new)
            .insert(column.into(), width);
        self
    }

    #[must_use]
    pub fn visible_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn sort(mut self, sort_by: impl Into<String>, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(sort_order);
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSettingsUpdate {
    pub active_filters: Option<Value>,
    pub search_term: Option<String>,
}

impl FilterSettingsUpdate {
    #[must_use]
    pub fn active_filters(mut self, filters: Value) -> Self {
        self.active_filters = Some(filters);
        self
    }

    #[must_use]
    pub fn search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettingsUpdate {
    pub enabled: Option<Vec<String>>,
    pub order: Option<Vec<String>>,
    /// Merged key by key into the stored sizes.
    pub sizes: Option<BTreeMap<String, WidgetSize>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartPreferencesUpdate {
    pub sort_order: Option<ChartSortOrder>,
    pub colors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutSettingsUpdate {
    pub sidebar_collapsed: Option<bool>,
    pub theme: Option<Theme>,
}

/// Group of settings cleared by a component reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsCategory {
    Table,
    Filters,
    Widgets,
    Charts,
    Layout,
}

impl SettingsCategory {
    pub const ALL: [Self; 5] = [
        Self::Table,
        Self::Filters,
        Self::Widgets,
        Self::Charts,
        Self::Layout,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Filters => "filters",
            Self::Widgets => "widgets",
            Self::Charts => "charts",
            Self::Layout => "layout",
        }
    }
}

impl fmt::Display for SettingsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown settings category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for SettingsCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// One change to the record, kept so pre-load edits can be replayed.
#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    Table(String, TableSettingsUpdate),
    Filter(String, FilterSettingsUpdate),
    Widgets(WidgetSettingsUpdate),
    Chart(String, ChartPreferencesUpdate),
    Layout(LayoutSettingsUpdate),
    ToggleWidget(String),
    MoveWidget { widget_id: String, to: usize },
    Reset,
    ResetComponent(SettingsCategory, Option<String>),
    Replace(Box<UserSettings>),
}

impl Mutation {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Table(..) => "table",
            Self::Filter(..) => "filters",
            Self::Widgets(_) => "widgets",
            Self::Chart(..) => "chart",
            Self::Layout(_) => "layout",
            Self::ToggleWidget(_) => "toggle_widget",
            Self::MoveWidget { .. } => "move_widget",
            Self::Reset => "reset",
            Self::ResetComponent(..) => "reset_component",
            Self::Replace(_) => "import",
        }
    }

    /// Imports keep the `lastUpdated` they carry; everything else restamps.
    pub(crate) fn restamps(&self) -> bool {
        !matches!(self, Self::Replace(_))
    }

    pub(crate) fn apply_to(&self, record: &mut UserSettings) {
        match self {
            Self::Table(table_id, update) => apply_table(record, table_id, update),
            Self::Filter(view_id, update) => {
                if let Some(filters) = &update.active_filters {
                    record.active_filters.insert(view_id.clone(), filters.clone());
                }
                if let Some(term) = &update.search_term {
                    record.search_terms.insert(view_id.clone(), term.clone());
                }
            }
            Self::Widgets(update) => {
                let widgets = &mut record.dashboard_widgets;
                if let Some(enabled) = &update.enabled {
                    widgets.enabled.clone_from(enabled);
                }
                if let Some(order) = &update.order {
                    widgets.order.clone_from(order);
                }
                if let Some(sizes) = &update.sizes {
                    for (id, size) in sizes {
                        if size.is_finite() {
                            widgets.sizes.insert(id.clone(), *size);
                        } else {
                            warn!(widget = %id, ?size, "ignoring non-finite widget size");
                        }
                    }
                }
            }
            Self::Chart(chart_id, update) => {
                let pref = record.chart_preferences.entry(chart_id.clone()).or_default();
                if let Some(sort_order) = update.sort_order {
                    pref.sort_order = sort_order;
                }
                if let Some(colors) = &update.colors {
                    pref.colors.clone_from(colors);
                }
            }
            Self::Layout(update) => {
                if let Some(collapsed) = update.sidebar_collapsed {
                    record.sidebar_collapsed = collapsed;
                }
                if let Some(theme) = update.theme {
                    record.theme = theme;
                }
            }
            Self::ToggleWidget(widget_id) => {
                toggle_widget(&mut record.dashboard_widgets, widget_id);
            }
            Self::MoveWidget { widget_id, to } => {
                move_widget(&mut record.dashboard_widgets, widget_id, *to);
            }
            Self::Reset => *record = UserSettings::default(),
            Self::ResetComponent(category, scope) => {
                reset_component(record, *category, scope.as_deref());
            }
            Self::Replace(settings) => *record = (**settings).clone(),
        }
    }
}

fn apply_table(record: &mut UserSettings, table_id: &str, update: &TableSettingsUpdate) {
    if let Some(widths) = &update.column_widths {
        record
            .column_widths
            .entry(table_id.to_owned())
            .or_default()
            .extend(widths.iter().map(|(col, w)| (col.clone(), *w)));
    }
    if let Some(columns) = &update.visible_columns {
        record
            .visible_columns
            .insert(table_id.to_owned(), columns.clone());
    }
    // A half-specified sort is ignored.
    if let (Some(sort_by), Some(sort_order)) = (&update.sort_by, update.sort_order) {
        record.sort_preferences.insert(
            table_id.to_owned(),
            SortPreference {
                sort_by: sort_by.clone(),
                sort_order,
            },
        );
    }
    if let Some(page_size) = update.page_size {
        record.page_size.insert(table_id.to_owned(), page_size);
    }
}

/// Flip a widget's visibility. Enabling an unplaced widget appends it to
/// `order`; disabling keeps its slot so re-enabling restores the position.
fn toggle_widget(widgets: &mut DashboardWidgets, widget_id: &str) {
    if let Some(pos) = widgets.enabled.iter().position(|w| w == widget_id) {
        widgets.enabled.remove(pos);
        return;
    }
    if !widgets.order.iter().any(|w| w == widget_id) {
        widgets.order.push(widget_id.to_owned());
    }
    widgets.enabled.push(widget_id.to_owned());
    // Keep `enabled` in display order.
    let order = &widgets.order;
    widgets
        .enabled
        .sort_by_key(|w| order.iter().position(|o| o == w).unwrap_or(usize::MAX));
}

/// Move a placed widget to index `to` (clamped). Unknown widgets are ignored.
fn move_widget(widgets: &mut DashboardWidgets, widget_id: &str, to: usize) {
    let Some(from) = widgets.order.iter().position(|w| w == widget_id) else {
        return;
    };
    let id = widgets.order.remove(from);
    let to = to.min(widgets.order.len());
    widgets.order.insert(to, id);
    let order = &widgets.order;
    widgets
        .enabled
        .sort_by_key(|w| order.iter().position(|o| o == w).unwrap_or(usize::MAX));
}

fn reset_component(record: &mut UserSettings, category: SettingsCategory, scope: Option<&str>) {
    match (category, scope) {
        (SettingsCategory::Table, Some(id)) => {
            record.column_widths.remove(id);
            record.visible_columns.remove(id);
            record.sort_preferences.remove(id);
            record.page_size.remove(id);
        }
        (SettingsCategory::Table, None) => {
            record.column_widths.clear();
            record.visible_columns.clear();
            record.sort_preferences.clear();
            record.page_size.clear();
        }
        (SettingsCategory::Filters, Some(id)) => {
            record.active_filters.remove(id);
            record.search_terms.remove(id);
        }
        (SettingsCategory::Filters, None) => {
            record.active_filters.clear();
            record.search_terms.clear();
        }
        (SettingsCategory::Widgets, Some(id)) => {
            record.dashboard_widgets.sizes.remove(id);
        }
        (SettingsCategory::Widgets, None) => {
            record.dashboard_widgets = DashboardWidgets::default();
        }
        (SettingsCategory::Charts, Some(id)) => {
            record.chart_preferences.remove(id);
        }
        (SettingsCategory::Charts, None) => record.chart_preferences.clear(),
        (SettingsCategory::Layout, _) => {
            let defaults = UserSettings::default();
            record.sidebar_collapsed = defaults.sidebar_collapsed;
            record.theme = defaults.theme;
        }
    }
}
