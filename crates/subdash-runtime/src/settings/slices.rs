#![forbid(unsafe_code)]

//! Scoped views over [`SettingsManager`].
//!
//! A table, filter bar or chart only cares about its own corner of the
//! record. Each handle binds the manager to that corner: typed getters and
//! setters, plus a `watch` that fires only when the corner changes.
//!
//! ```ignore
//! let table = settings.table("subscriptions");
//! let _sub = table.watch(|t| redraw_columns(&t.visible_columns));
//! table.set_page_size(50);
//! ```

use serde_json::Value;

use super::patch::{
    ChartPreferencesUpdate, FilterSettingsUpdate, LayoutSettingsUpdate, SettingsCategory,
    TableSettingsUpdate, WidgetSettingsUpdate,
};
use super::store::SettingsManager;
use super::types::{
    ChartPreference, ChartSortOrder, DashboardWidgets, FilterSettings, LayoutSettings, SortOrder,
    TableSettings, Theme, WidgetSize,
};
use crate::reactive::Subscription;

impl SettingsManager {
    #[must_use]
    pub fn table(&self, table_id: impl Into<String>) -> TableSettingsHandle {
        TableSettingsHandle {
            manager: self.clone(),
            table_id: table_id.into(),
        }
    }

    #[must_use]
    pub fn filters(&self, view_id: impl Into<String>) -> FilterSettingsHandle {
        FilterSettingsHandle {
            manager: self.clone(),
            view_id: view_id.into(),
        }
    }

    #[must_use]
    pub fn widgets(&self) -> WidgetSettingsHandle {
        WidgetSettingsHandle {
            manager: self.clone(),
        }
    }

    #[must_use]
    pub fn chart(&self, chart_id: impl Into<String>) -> ChartPreferencesHandle {
        ChartPreferencesHandle {
            manager: self.clone(),
            chart_id: chart_id.into(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> LayoutHandle {
        LayoutHandle {
            manager: self.clone(),
        }
    }
}

// ============================================================================
// Table
// ============================================================================

#[derive(Debug, Clone)]
pub struct TableSettingsHandle {
    manager: SettingsManager,
    table_id: String,
}

impl TableSettingsHandle {
    #[must_use]
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    #[must_use]
    pub fn get(&self) -> TableSettings {
        self.manager.get_table_settings(&self.table_id)
    }

    pub fn update(&self, update: TableSettingsUpdate) {
        self.manager.update_table_settings(&self.table_id, update);
    }

    pub fn set_column_width(&self, column: impl Into<String>, width: u32) {
        self.update(TableSettingsUpdate::default().column_width(column, width));
    }

    pub fn set_visible_columns<I, S>(&self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update(TableSettingsUpdate::default().visible_columns(columns));
    }

    pub fn set_sort(&self, sort_by: impl Into<String>, sort_order: SortOrder) {
        self.update(TableSettingsUpdate::default().sort(sort_by, sort_order));
    }

    pub fn set_page_size(&self, page_size: u32) {
        self.update(TableSettingsUpdate::default().page_size(page_size));
    }

    pub fn reset(&self) {
        self.manager
            .reset_component_settings(SettingsCategory::Table, Some(&self.table_id));
    }

    pub fn watch(&self, listener: impl Fn(&TableSettings) + 'static) -> Subscription {
        let table_id = self.table_id.clone();
        self.manager
            .watch(move |record| record.table(&table_id), listener)
    }
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone)]
pub struct FilterSettingsHandle {
    manager: SettingsManager,
    view_id: String,
}

impl FilterSettingsHandle {
    #[must_use]
    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    #[must_use]
    pub fn get(&self) -> FilterSettings {
        self.manager.get_filter_settings(&self.view_id)
    }

    pub fn update(&self, update: FilterSettingsUpdate) {
        self.manager.update_filter_settings(&self.view_id, update);
    }

    pub fn set_active_filters(&self, filters: Value) {
        self.update(FilterSettingsUpdate::default().active_filters(filters));
    }

    pub fn set_search_term(&self, term: impl Into<String>) {
        self.update(FilterSettingsUpdate::default().search_term(term));
    }

    pub fn reset(&self) {
        self.manager
            .reset_component_settings(SettingsCategory::Filters, Some(&self.view_id));
    }

    pub fn watch(&self, listener: impl Fn(&FilterSettings) + 'static) -> Subscription {
        let view_id = self.view_id.clone();
        self.manager
            .watch(move |record| record.filters(&view_id), listener)
    }
}

// ============================================================================
// Widgets
// ============================================================================

#[derive(Debug, Clone)]
pub struct WidgetSettingsHandle {
    manager: SettingsManager,
}

impl WidgetSettingsHandle {
    #[must_use]
    pub fn get(&self) -> DashboardWidgets {
        self.manager.get_widget_settings()
    }

    #[must_use]
    pub fn is_enabled(&self, widget_id: &str) -> bool {
        self.get().is_enabled(widget_id)
    }

    pub fn update(&self, update: WidgetSettingsUpdate) {
        self.manager.update_widget_settings(update);
    }

    pub fn toggle(&self, widget_id: &str) {
        self.manager.toggle_widget(widget_id);
    }

    pub fn move_to(&self, widget_id: &str, to: usize) {
        self.manager.move_widget(widget_id, to);
    }

    pub fn resize(&self, widget_id: impl Into<String>, size: WidgetSize) {
        self.update(WidgetSettingsUpdate {
            sizes: Some([(widget_id.into(), size)].into_iter().collect()),
            ..Default::default()
        });
    }

    /// Restore the default layout.
    pub fn reset(&self) {
        self.manager
            .reset_component_settings(SettingsCategory::Widgets, None);
    }

    pub fn watch(&self, listener: impl Fn(&DashboardWidgets) + 'static) -> Subscription {
        self.manager
            .watch(|record| record.dashboard_widgets.clone(), listener)
    }
}

// ============================================================================
// Charts
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChartPreferencesHandle {
    manager: SettingsManager,
    chart_id: String,
}

impl ChartPreferencesHandle {
    #[must_use]
    pub fn chart_id(&self) -> &str {
        &self.chart_id
    }

    #[must_use]
    pub fn get(&self) -> ChartPreference {
        self.manager.get_chart_preferences(&self.chart_id)
    }

    pub fn update(&self, update: ChartPreferencesUpdate) {
        self.manager.update_chart_preferences(&self.chart_id, update);
    }

    pub fn set_sort_order(&self, sort_order: ChartSortOrder) {
        self.update(ChartPreferencesUpdate {
            sort_order: Some(sort_order),
            ..Default::default()
        });
    }

    pub fn set_colors(&self, colors: Vec<String>) {
        self.update(ChartPreferencesUpdate {
            colors: Some(colors),
            ..Default::default()
        });
    }

    pub fn reset(&self) {
        self.manager
            .reset_component_settings(SettingsCategory::Charts, Some(&self.chart_id));
    }

    pub fn watch(&self, listener: impl Fn(&ChartPreference) + 'static) -> Subscription {
        let chart_id = self.chart_id.clone();
        self.manager
            .watch(move |record| record.chart(&chart_id), listener)
    }
}

// ============================================================================
// Layout
// ============================================================================

#[derive(Debug, Clone)]
pub struct LayoutHandle {
    manager: SettingsManager,
}

impl LayoutHandle {
    #[must_use]
    pub fn get(&self) -> LayoutSettings {
        self.manager.get_layout_settings()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.manager.update_layout_settings(LayoutSettingsUpdate {
            theme: Some(theme),
            ..Default::default()
        });
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) {
        self.manager.update_layout_settings(LayoutSettingsUpdate {
            sidebar_collapsed: Some(collapsed),
            ..Default::default()
        });
    }

    pub fn toggle_sidebar(&self) {
        self.set_sidebar_collapsed(!self.get().sidebar_collapsed);
    }

    pub fn reset(&self) {
        self.manager
            .reset_component_settings(SettingsCategory::Layout, None);
    }

    pub fn watch(&self, listener: impl Fn(&LayoutSettings) + 'static) -> Subscription {
        self.manager.watch(|record| record.layout(), listener)
    }
}
