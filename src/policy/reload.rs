//! Snapshot hot-reload support.
//!
//! The live [`PolicySnapshot`] sits behind [`SharedSnapshot`]. Request
//! handlers clone the inner `Arc` under a momentary read lock and then
//! evaluate lock-free; a reload builds the complete new snapshot first and
//! swaps the `Arc` in a single write, so no evaluation ever sees half of an
//! update.
//!
//! Reload triggers:
//!
//! - **File change**: [`start_file_watcher`] uses the [`notify`] crate to
//!   detect writes to the settings file.
//! - **SIGHUP** (Unix only): [`start_sighup_handler`] reloads on
//!   `kill -HUP <pid>`.
//!
//! A failed reload keeps the old snapshot and logs a warning.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use super::config::Settings;
use crate::error::Result;
use crate::inspect::PolicySnapshot;

/// Atomically swappable handle to the current snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<Arc<PolicySnapshot>>>,
}

impl SharedSnapshot {
    pub fn new(snapshot: PolicySnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The snapshot to evaluate the next request against.
    pub fn current(&self) -> Arc<PolicySnapshot> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the whole snapshot. In-flight evaluations keep the one they
    /// already hold.
    pub fn replace(&self, snapshot: PolicySnapshot) {
        let next = Arc::new(snapshot);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// Reload settings from disk and swap in a fresh snapshot.
///
/// On failure (I/O error, parse error, missing env var) the old snapshot
/// is retained and the error returned.
pub fn reload_snapshot(shared: &SharedSnapshot, path: &Path) -> Result<()> {
    let settings = Settings::load_from_path(path)?;
    let snapshot = PolicySnapshot::from_settings(&settings);
    let (rules, secrets) = (snapshot.network.len(), snapshot.secrets.len());
    shared.replace(snapshot);
    info!(
        "Settings reloaded from {} ({} rules, {} secrets)",
        path.display(),
        rules,
        secrets
    );
    Ok(())
}

/// Start a file-system watcher that calls [`reload_snapshot`] when the
/// settings file changes.
///
/// The parent directory is watched so that editors replacing the file by
/// rename are still seen. Dropping the returned handle stops the watch.
pub fn start_file_watcher(
    settings_path: PathBuf,
    shared: SharedSnapshot,
) -> Result<RecommendedWatcher> {
    let watch_dir = match settings_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = settings_path.file_name().map(|n| n.to_os_string());
    let path = settings_path.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                && event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if relevant {
                info!("Settings file changed, reloading...");
                if let Err(e) = reload_snapshot(&shared, &path) {
                    warn!("Settings reload failed (keeping old snapshot): {}", e);
                }
            }
        }
        Err(e) => {
            warn!("File watcher error: {}", e);
        }
    })?;

    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
    info!("Watching {} for changes", settings_path.display());
    Ok(watcher)
}

/// Start a SIGHUP handler that reloads the snapshot on signal.
///
/// Must be called from within a Tokio runtime.
#[cfg(unix)]
pub fn start_sighup_handler(settings_path: PathBuf, shared: SharedSnapshot) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sig = match signal(SignalKind::hangup()) {
            Ok(sig) => sig,
            Err(e) => {
                warn!("Failed to register SIGHUP handler: {}", e);
                return;
            }
        };
        while sig.recv().await.is_some() {
            info!("SIGHUP received, reloading settings...");
            if let Err(e) = reload_snapshot(&shared, &settings_path) {
                warn!("Settings reload on SIGHUP failed (keeping old snapshot): {}", e);
            }
        }
    });
}

/// No-op SIGHUP handler for non-Unix platforms.
#[cfg(not(unix))]
pub fn start_sighup_handler(_settings_path: PathBuf, _shared: SharedSnapshot) {}
