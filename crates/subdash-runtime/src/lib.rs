#![forbid(unsafe_code)]

//! Subscription Dashboard Runtime
//!
//! This crate provides the two stateful services behind the subscription
//! dashboard UI: a reversible action history and a persistent settings
//! store.
//!
//! # Key Components
//!
//! - [`UndoRedoManager`] - Two-stack history of reversible actions
//! - [`ActionBuilder`] - Builds actions for imports and renewals
//! - [`SharedList`] - List handle whose edits record undoable snapshots
//! - [`SettingsManager`] - Persistent user preferences with subscriptions
//! - [`StorageBackend`] - Where the settings blob lives
//! - [`Services`] - Composition root wiring both managers from a [`RuntimeConfig`]
//!
//! # Threading
//! Everything here is single-threaded. Handles are `Rc`-shared and cheap to
//! clone; pass clones to whichever UI region needs them.
//!
//! # Logging
//! The crate emits `tracing` events and never installs a subscriber.

pub mod config;
pub mod reactive;
pub mod services;
pub mod settings;
pub mod state_persistence;
pub mod undo;

pub use config::{ConfigError, RuntimeConfig, SettingsConfig};
pub use reactive::{ListenerSet, Subscription};
pub use services::Services;
pub use settings::{
    LoadState, LoadTask, SettingsCategory, SettingsError, SettingsManager, UserSettings,
};
#[cfg(feature = "file-storage")]
pub use state_persistence::FileStorage;
pub use state_persistence::{MemoryStorage, StorageBackend, StorageError, StorageResult};
pub use undo::{
    ActionBuilder, ActionId, ActionSnapshot, CommandError, CommandResult, HistoryConfig,
    HistoryShortcut, HistoryStatus, Modifiers, SharedList, UndoRedoAction, UndoRedoManager,
};
