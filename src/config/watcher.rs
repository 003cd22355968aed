//! Hot reload of the configuration file.
//!
//! Editors usually emit several modify events per save, so a reload is only
//! forwarded when the validated configuration differs from the last one sent.
//! Invalid edits are logged and dropped; the running configuration stays.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ResilienceConfig;

/// Watches one configuration file and publishes validated changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: ResilienceConfig,
    update_tx: mpsc::UnboundedSender<ResilienceConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration already applied; identical reloads are
    /// not forwarded.
    pub fn new(
        path: &Path,
        current: ResilienceConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ResilienceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let ConfigWatcher {
            path,
            mut current,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if triggers_reload(&event.kind) => {
                    if let Some(next) = reload(&path, &current) {
                        current = next.clone();
                        if update_tx.send(next).is_err() {
                            tracing::debug!("Config receiver dropped, ignoring reload");
                        }
                    }
                }
                Ok(event) if event.kind.is_remove() => {
                    tracing::warn!(path = %path.display(), "Config file removed, keeping current configuration");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %watched.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn triggers_reload(kind: &EventKind) -> bool {
    kind.is_modify() || kind.is_create()
}

/// Load `path` and return it when valid and different from `current`.
fn reload(path: &Path, current: &ResilienceConfig) -> Option<ResilienceConfig> {
    match load_config(path) {
        Ok(next) if next == *current => {
            tracing::debug!(path = %path.display(), "Config unchanged, skipping reload");
            None
        }
        Ok(next) => {
            tracing::info!(
                path = %path.display(),
                services = next.services.len(),
                "Config change detected"
            );
            Some(next)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}
