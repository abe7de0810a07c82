#![forbid(unsafe_code)]

//! The settings manager: one record, persisted as one JSON blob.
//!
//! # Lifecycle
//!
//! ```text
//!   new()            begin_load()          LoadTask::run()
//! Uninitialized ─────────► Loading ───────────────► Ready
//!      │                      │                       │
//!      └──── edits apply in memory and queue ─────────┘
//!            (replayed onto the loaded record)    edits persist
//! ```
//!
//! The load runs as a separate [`LoadTask`] so the host can paint with
//! defaults first. Edits made before the load finishes are applied to the
//! in-memory record straight away and replayed on top of whatever the load
//! reads, so nothing the user does early is lost.
//!
//! # Failure Handling
//!
//! A failed write is logged at `warn` and the in-memory record keeps the
//! edit. The next successful write (or [`SettingsManager::flush`]) stores the
//! latest state.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, debug_span, info, warn};

use super::SettingsError;
use super::merge::{merge_field_by_field, merge_with_defaults};
use super::patch::{
    ChartPreferencesUpdate, FilterSettingsUpdate, LayoutSettingsUpdate, Mutation,
    SettingsCategory, TableSettingsUpdate, WidgetSettingsUpdate,
};
use super::types::{
    ChartPreference, DashboardWidgets, FilterSettings, LayoutSettings, TableSettings,
    UserSettings,
};
use crate::reactive::{ListenerSet, Subscription};
use crate::state_persistence::StorageBackend;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "subscription-dashboard-settings";

/// Where the manager is in its load sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Built; no load scheduled.
    Uninitialized,
    /// A [`LoadTask`] exists but has not run.
    Loading,
    /// The persisted record is merged in; edits are written through.
    Ready,
}

struct State {
    record: UserSettings,
    load_state: LoadState,
    /// Edits made before `Ready`, oldest first.
    pending: Vec<Mutation>,
}

struct Shared {
    state: RefCell<State>,
    listeners: ListenerSet<UserSettings>,
    storage: Rc<dyn StorageBackend>,
    storage_key: String,
}

/// Settings handle.
///
/// Clones share the same record, storage and subscribers.
#[derive(Clone)]
pub struct SettingsManager {
    shared: Rc<Shared>,
}

impl fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("SettingsManager")
            .field("load_state", &state.load_state)
            .field("pending", &state.pending.len())
            .field("storage", &self.shared.storage.name())
            .field("storage_key", &self.shared.storage_key)
            .field("listeners", &self.shared.listeners.len())
            .finish()
    }
}

/// Deferred initial load, handed to the host by [`SettingsManager::begin_load`].
#[must_use = "settings stay on defaults until the load task runs"]
pub struct LoadTask {
    shared: Weak<Shared>,
}

impl fmt::Debug for LoadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTask")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl LoadTask {
    /// Read, merge and publish the persisted record.
    ///
    /// Returns `false` without doing anything if the manager is gone or the
    /// load already completed.
    pub fn run(self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => SettingsManager { shared }.finish_load(),
            None => {
                debug!("settings manager dropped before load");
                false
            }
        }
    }
}

impl SettingsManager {
    /// Create a manager holding defaults. Nothing is read until a
    /// [`LoadTask`] from [`Self::begin_load`] runs.
    pub fn new(storage: Rc<dyn StorageBackend>, storage_key: impl Into<String>) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(State {
                    record: UserSettings::default(),
                    load_state: LoadState::Uninitialized,
                    pending: Vec::new(),
                }),
                listeners: ListenerSet::new(),
                storage,
                storage_key: storage_key.into(),
            }),
        }
    }

    /// [`Self::new`] followed by [`Self::begin_load`].
    pub fn open(
        storage: Rc<dyn StorageBackend>,
        storage_key: impl Into<String>,
    ) -> (Self, LoadTask) {
        let manager = Self::new(storage, storage_key);
        let task = manager.begin_load();
        (manager, task)
    }

    /// Schedule the initial load. Moves `Uninitialized` to `Loading`; once
    /// `Ready`, the returned task is a no-op.
    pub fn begin_load(&self) -> LoadTask {
        {
            let mut state = self.shared.state.borrow_mut();
            if state.load_state == LoadState::Uninitialized {
                state.load_state = LoadState::Loading;
            }
        }
        LoadTask {
            shared: Rc::downgrade(&self.shared),
        }
    }

    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.shared.state.borrow().load_state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.load_state() == LoadState::Ready
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.shared.storage_key
    }

    fn finish_load(&self) -> bool {
        if self.load_state() == LoadState::Ready {
            debug!(key = %self.shared.storage_key, "settings already loaded");
            return false;
        }

        let loaded = self.read_persisted();
        let replayed = {
            let mut state = self.shared.state.borrow_mut();
            let pending = std::mem::take(&mut state.pending);
            let mut record = loaded;
            for mutation in &pending {
                apply(&mut record, mutation);
            }
            state.record = record;
            state.load_state = LoadState::Ready;
            pending.len()
        };

        info!(
            key = %self.shared.storage_key,
            storage = self.shared.storage.name(),
            replayed,
            "settings ready"
        );
        if replayed > 0 {
            self.persist();
        }
        self.notify();
        true
    }

    fn read_persisted(&self) -> UserSettings {
        let key = &self.shared.storage_key;
        match self.shared.storage.get(key) {
            Ok(Some(blob)) => match parse_persisted(&blob) {
                Ok((record, rejected)) => {
                    for field in &rejected {
                        warn!(
                            key = %key,
                            field = %field,
                            "unreadable persisted setting; using default"
                        );
                    }
                    record
                }
                Err(error) => {
                    warn!(
                        key = %key,
                        error = %error,
                        "malformed persisted settings; using defaults"
                    );
                    UserSettings::default()
                }
            },
            Ok(None) => {
                debug!(key = %key, "no persisted settings");
                UserSettings::default()
            }
            Err(error) => {
                warn!(key = %key, error = %error, "settings read failed; using defaults");
                UserSettings::default()
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Copy of the full record.
    #[must_use]
    pub fn get_settings(&self) -> UserSettings {
        self.shared.state.borrow().record.clone()
    }

    #[must_use]
    pub fn get_table_settings(&self, table_id: &str) -> TableSettings {
        self.shared.state.borrow().record.table(table_id)
    }

    #[must_use]
    pub fn get_filter_settings(&self, view_id: &str) -> FilterSettings {
        self.shared.state.borrow().record.filters(view_id)
    }

    #[must_use]
    pub fn get_widget_settings(&self) -> DashboardWidgets {
        self.shared.state.borrow().record.dashboard_widgets.clone()
    }

    #[must_use]
    pub fn get_chart_preferences(&self, chart_id: &str) -> ChartPreference {
        self.shared.state.borrow().record.chart(chart_id)
    }

    #[must_use]
    pub fn get_layout_settings(&self) -> LayoutSettings {
        self.shared.state.borrow().record.layout()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub fn update_table_settings(&self, table_id: &str, update: TableSettingsUpdate) {
        self.mutate(Mutation::Table(table_id.to_owned(), update));
    }

    pub fn update_filter_settings(&self, view_id: &str, update: FilterSettingsUpdate) {
        self.mutate(Mutation::Filter(view_id.to_owned(), update));
    }

    pub fn update_widget_settings(&self, update: WidgetSettingsUpdate) {
        self.mutate(Mutation::Widgets(update));
    }

    pub fn update_chart_preferences(&self, chart_id: &str, update: ChartPreferencesUpdate) {
        self.mutate(Mutation::Chart(chart_id.to_owned(), update));
    }

    pub fn update_layout_settings(&self, update: LayoutSettingsUpdate) {
        self.mutate(Mutation::Layout(update));
    }

    /// Show a hidden widget or hide a shown one.
    pub fn toggle_widget(&self, widget_id: &str) {
        self.mutate(Mutation::ToggleWidget(widget_id.to_owned()));
    }

    /// Move a widget to position `to` in the dashboard order.
    pub fn move_widget(&self, widget_id: &str, to: usize) {
        self.mutate(Mutation::MoveWidget {
            widget_id: widget_id.to_owned(),
            to,
        });
    }

    /// Restore every setting to its default.
    pub fn reset_settings(&self) {
        info!(key = %self.shared.storage_key, "settings reset");
        self.mutate(Mutation::Reset);
    }

    /// Clear one scope of `category`, or the whole category when `scope_id`
    /// is `None`.
    pub fn reset_component_settings(&self, category: SettingsCategory, scope_id: Option<&str>) {
        info!(
            key = %self.shared.storage_key,
            category = category.as_str(),
            scope = scope_id.unwrap_or("*"),
            "settings component reset"
        );
        self.mutate(Mutation::ResetComponent(category, scope_id.map(str::to_owned)));
    }

    fn mutate(&self, mutation: Mutation) {
        let ready = {
            let mut state = self.shared.state.borrow_mut();
            apply(&mut state.record, &mutation);
            let ready = state.load_state == LoadState::Ready;
            if !ready {
                state.pending.push(mutation.clone());
            }
            ready
        };
        debug!(
            key = %self.shared.storage_key,
            change = mutation.label(),
            persisted = ready,
            "settings updated"
        );
        if ready {
            self.persist();
        }
        self.notify();
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Write the current record now.
    ///
    /// # Errors
    ///
    /// Returns the storage or serialization failure. Unlike the automatic
    /// write after each edit, this does not swallow it.
    pub fn flush(&self) -> Result<(), SettingsError> {
        let blob = serde_json::to_string(&self.shared.state.borrow().record)?;
        self.shared.storage.set(&self.shared.storage_key, &blob)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(error) = self.flush() {
            warn!(
                key = %self.shared.storage_key,
                storage = self.shared.storage.name(),
                error = %error,
                "failed to persist settings"
            );
        }
    }

    /// The full record as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Serialization failure only.
    pub fn export_settings(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(&self.shared.state.borrow().record)?)
    }

    /// Replace the record with `json`, merged with defaults like a load.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Parse`] or [`SettingsError::InvalidShape`]; the
    /// current record is untouched and no one is notified.
    pub fn import_settings(&self, json: &str) -> Result<(), SettingsError> {
        let record = parse_settings(json).inspect_err(|error| {
            warn!(key = %self.shared.storage_key, error = %error, "settings import rejected");
        })?;
        info!(key = %self.shared.storage_key, "settings imported");
        self.mutate(Mutation::Replace(Box::new(record)));
        Ok(())
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Invoke `listener` with the full record after every change.
    pub fn subscribe(&self, listener: impl Fn(&UserSettings) + 'static) -> Subscription {
        self.shared.listeners.subscribe(listener)
    }

    /// Invoke `listener` with `project(record)` whenever that projection
    /// differs from the last one delivered.
    ///
    /// The baseline is taken at subscription time, so the listener does not
    /// fire until something it can see changes.
    pub fn watch<P>(
        &self,
        project: impl Fn(&UserSettings) -> P + 'static,
        listener: impl Fn(&P) + 'static,
    ) -> Subscription
    where
        P: PartialEq + Clone + 'static,
    {
        let last = RefCell::new(project(&self.shared.state.borrow().record));
        let weak = Rc::downgrade(&self.shared);
        self.shared.listeners.subscribe(move |_: &UserSettings| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // Project the live record; an outer notify may carry a stale one.
            let next = project(&shared.state.borrow().record);
            let changed = {
                let mut last = last.borrow_mut();
                if *last == next {
                    false
                } else {
                    *last = next.clone();
                    true
                }
            };
            if changed {
                listener(&next);
            }
        })
    }

    fn notify(&self) {
        let record = self.get_settings();
        let span = debug_span!("settings.notify", listeners = tracing::field::Empty);
        let _enter = span.enter();
        let invoked = self.shared.listeners.notify(&record);
        span.record("listeners", invoked as u64);
    }
}

fn apply(record: &mut UserSettings, mutation: &Mutation) {
    mutation.apply_to(record);
    if mutation.restamps() {
        record.last_updated = Utc::now();
    }
}

/// Parse a settings blob and merge it with defaults.
///
/// # Errors
///
/// [`SettingsError::Parse`] for malformed JSON, [`SettingsError::InvalidShape`]
/// for valid JSON that is not a settings object.
pub fn parse_settings(json: &str) -> Result<UserSettings, SettingsError> {
    let blob: Value = serde_json::from_str(json)?;
    merge_with_defaults(blob)
}

fn parse_persisted(json: &str) -> Result<(UserSettings, Vec<String>), SettingsError> {
    let blob: Value = serde_json::from_str(json)?;
    merge_field_by_field(blob)
}

// ============================================================================
// Tests
// ============================================================================
