#![forbid(unsafe_code)]

//! The persisted settings record and its per-scope projections.
//!
//! Field names serialize in camelCase so the stored blob matches what the
//! dashboard front end writes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page size reported for a table that never stored one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Widgets shown on a fresh dashboard, in display order.
pub const DEFAULT_WIDGETS: [&str; 3] = ["stats", "charts", "analytics"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortPreference {
    pub sort_by: String,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidgetSize {
    pub width: f64,
    pub height: f64,
}

impl WidgetSize {
    /// JSON has no encoding for NaN or infinity, so only finite sizes can be
    /// stored.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }
}

/// Dashboard widget layout.
///
/// `order` lists every widget the user has placed; `enabled` is the subset
/// currently shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardWidgets {
    pub enabled: Vec<String>,
    pub order: Vec<String>,
    pub sizes: BTreeMap<String, WidgetSize>,
}

impl Default for DashboardWidgets {
    fn default() -> Self {
        let widgets: Vec<String> = DEFAULT_WIDGETS.iter().map(|&w| w.to_owned()).collect();
        Self {
            enabled: widgets.clone(),
            order: widgets,
            sizes: BTreeMap::new(),
        }
    }
}

impl DashboardWidgets {
    #[must_use]
    pub fn is_enabled(&self, widget_id: &str) -> bool {
        self.enabled.iter().any(|w| w == widget_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartSortOrder {
    #[default]
    None,
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartPreference {
    pub sort_order: ChartSortOrder,
    pub colors: Vec<String>,
}

/// Every persisted UI preference for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    /// table id -> column -> pixel width
    pub column_widths: BTreeMap<String, BTreeMap<String, u32>>,
    /// table id -> ordered visible columns
    pub visible_columns: BTreeMap<String, Vec<String>>,
    pub sort_preferences: BTreeMap<String, SortPreference>,
    pub page_size: BTreeMap<String, u32>,
    /// view id -> opaque filter object
    pub active_filters: BTreeMap<String, Value>,
    pub search_terms: BTreeMap<String, String>,
    pub dashboard_widgets: DashboardWidgets,
    pub chart_preferences: BTreeMap<String, ChartPreference>,
    pub sidebar_collapsed: bool,
    pub theme: Theme,
    pub last_updated: DateTime<Utc>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            column_widths: BTreeMap::new(),
            visible_columns: BTreeMap::new(),
            sort_preferences: BTreeMap::new(),
            page_size: BTreeMap::new(),
            active_filters: BTreeMap::new(),
            search_terms: BTreeMap::new(),
            dashboard_widgets: DashboardWidgets::default(),
            chart_preferences: BTreeMap::new(),
            sidebar_collapsed: false,
            theme: Theme::System,
            last_updated: Utc::now(),
        }
    }
}

impl UserSettings {
    /// Table projection, with defaults for a table that was never written.
    #[must_use]
    pub fn table(&self, table_id: &str) -> TableSettings {
        TableSettings {
            column_widths: self.column_widths.get(table_id).cloned().unwrap_or_default(),
            visible_columns: self
                .visible_columns
                .get(table_id)
                .cloned()
                .unwrap_or_default(),
            sort: self.sort_preferences.get(table_id).cloned(),
            page_size: self
                .page_size
                .get(table_id)
                .copied()
                .unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Filter projection, with defaults for a view that was never written.
    #[must_use]
    pub fn filters(&self, view_id: &str) -> FilterSettings {
        FilterSettings {
            active_filters: self
                .active_filters
                .get(view_id)
                .cloned()
                .unwrap_or_else(empty_object),
            search_term: self.search_terms.get(view_id).cloned().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn chart(&self, chart_id: &str) -> ChartPreference {
        self.chart_preferences
            .get(chart_id)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn layout(&self) -> LayoutSettings {
        LayoutSettings {
            sidebar_collapsed: self.sidebar_collapsed,
            theme: self.theme,
        }
    }
}

pub(crate) fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Settings of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSettings {
    pub column_widths: BTreeMap<String, u32>,
    pub visible_columns: Vec<String>,
    pub sort: Option<SortPreference>,
    pub page_size: u32,
}

/// Filters of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    pub active_filters: Value,
    pub search_term: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSettings {
    pub sidebar_collapsed: bool,
    pub theme: Theme,
}
