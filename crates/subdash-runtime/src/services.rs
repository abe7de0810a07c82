#![forbid(unsafe_code)]

//! Composition root.
//!
//! The host builds one [`Services`] at startup and passes clones of its
//! handles to whatever needs them. There are no globals.
//!
//! ```ignore
//! let (services, load) = Services::bootstrap(&RuntimeConfig::default())?;
//! render_first_frame(&services);
//! load.run();
//! ```

use std::rc::Rc;

use tracing::info;

use crate::config::{ConfigError, RuntimeConfig};
use crate::settings::{LoadTask, SettingsManager};
use crate::state_persistence::{MemoryStorage, StorageBackend};
use crate::undo::UndoRedoManager;

/// The shared managers of one dashboard session.
#[derive(Debug, Clone)]
pub struct Services {
    pub history: UndoRedoManager,
    pub settings: SettingsManager,
}

impl Services {
    /// Validate `config`, choose a storage backend and build both managers.
    ///
    /// The settings start on defaults; run the returned [`LoadTask`] once the
    /// first frame is up.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when `config` fails validation.
    pub fn bootstrap(config: &RuntimeConfig) -> Result<(Self, LoadTask), ConfigError> {
        let config = config.clone().validated()?;
        let storage = storage_for(&config);
        Ok(Self::with_storage(&config, storage))
    }

    /// Build both managers over an explicit backend. Skips validation.
    pub fn with_storage(
        config: &RuntimeConfig,
        storage: Rc<dyn StorageBackend>,
    ) -> (Self, LoadTask) {
        info!(
            storage = storage.name(),
            key = %config.settings.storage_key,
            max_depth = ?config.history.max_depth,
            "services bootstrapped"
        );
        let history = UndoRedoManager::new(config.history);
        let (settings, load) = SettingsManager::open(storage, config.settings.storage_key.clone());
        (Self { history, settings }, load)
    }
}

fn storage_for(config: &RuntimeConfig) -> Rc<dyn StorageBackend> {
    #[cfg(feature = "file-storage")]
    {
        if let Some(dir) = &config.settings.storage_dir {
            return Rc::new(crate::state_persistence::FileStorage::new(dir.clone()));
        }
    }
    match config.settings.quota_bytes {
        Some(quota) => Rc::new(MemoryStorage::with_quota(quota)),
        None => Rc::new(MemoryStorage::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{LoadState, Theme};
    use crate::undo::ActionBuilder;

    #[test]
    fn bootstrap_defaults() {
        let (services, load) = Services::bootstrap(&RuntimeConfig::default()).unwrap();
        assert_eq!(services.settings.load_state(), LoadState::Loading);
        assert_eq!(services.history.config().max_depth, None);
        assert!(load.run());
        assert!(services.settings.is_ready());
    }

    #[test]
    fn bootstrap_rejects_invalid_config() {
        let mut config = RuntimeConfig::default();
        config.history.max_depth = Some(0);
        assert!(matches!(
            Services::bootstrap(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn bounded_history_from_config() {
        let config = RuntimeConfig::from_toml_str("[history]\nmax_depth = 2\n").unwrap();
        let (services, _load) = Services::bootstrap(&config).unwrap();
        for i in 0..4 {
            services
                .history
                .push(ActionBuilder::new("noop", format!("step {i}")).build(|| Ok(()), || Ok(())));
        }
        assert_eq!(services.history.undo_depth(), 2);
    }

    #[test]
    fn clones_share_state() {
        let (services, load) = Services::bootstrap(&RuntimeConfig::default()).unwrap();
        load.run();
        let other = services.clone();
        other.settings.layout().set_theme(Theme::Dark);
        assert_eq!(services.settings.get_layout_settings().theme, Theme::Dark);
    }

    #[cfg(feature = "file-storage")]
    #[test]
    fn storage_dir_selects_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RuntimeConfig::default();
        config.settings.storage_dir = Some(dir.path().to_path_buf());
        let (services, load) = Services::bootstrap(&config).unwrap();
        load.run();
        services.settings.layout().set_theme(Theme::Light);
        assert!(dir.path().join("subscription-dashboard-settings.json").exists());
    }
}
