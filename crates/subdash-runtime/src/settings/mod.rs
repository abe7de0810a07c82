#![forbid(unsafe_code)]

//! Persistent user settings.
//!
//! [`SettingsManager`] owns one [`UserSettings`] record, writes it through a
//! [`StorageBackend`] as a single JSON blob, and tells subscribers about every
//! change. Regions of the UI usually go through a scoped handle
//! ([`TableSettingsHandle`], [`LayoutHandle`], ...) instead of the raw record.
//!
//! [`StorageBackend`]: crate::state_persistence::StorageBackend

use thiserror::Error;

use crate::state_persistence::StorageError;

pub mod merge;
pub mod patch;
pub mod slices;
pub mod store;
pub mod types;

pub use merge::{merge_field_by_field, merge_with_defaults};
pub use patch::{
    ChartPreferencesUpdate, FilterSettingsUpdate, LayoutSettingsUpdate, SettingsCategory,
    TableSettingsUpdate, UnknownCategory, WidgetSettingsUpdate,
};
pub use slices::{
    ChartPreferencesHandle, FilterSettingsHandle, LayoutHandle, TableSettingsHandle,
    WidgetSettingsHandle,
};
pub use store::{DEFAULT_STORAGE_KEY, LoadState, LoadTask, SettingsManager, parse_settings};
pub use types::{
    ChartPreference, ChartSortOrder, DEFAULT_PAGE_SIZE, DashboardWidgets, FilterSettings,
    LayoutSettings, SortOrder, SortPreference, TableSettings, Theme, UserSettings, WidgetSize,
};

/// Errors from importing, exporting or flushing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("settings have an invalid shape: {0}")]
    InvalidShape(String),
    #[error("settings could not be stored: {0}")]
    Storage(#[from] StorageError),
}
