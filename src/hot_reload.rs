//! # Hot Reload Module
//!
//! Watches a route manifest and swaps in a freshly built [`RouteTable`] when
//! the file changes.
//!
//! The live table sits behind an [`ArcSwap`], so readers never block: each
//! request loads the current `Arc<RouteTable>` and keeps using it even if a
//! reload lands mid-request.
//!
//! ```rust,no_run
//! use arc_swap::ArcSwap;
//! use signpost::hot_reload::watch_manifest;
//! use signpost::manifest::load_table;
//! use std::sync::Arc;
//!
//! let live = Arc::new(ArcSwap::from_pointee(load_table("routes.yaml")?));
//! let _watcher = watch_manifest("routes.yaml", Arc::clone(&live), |table| {
//!     println!("reloaded {} routes", table.len());
//! })?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! A manifest that fails to load or compile is logged and ignored; the
//! previous table stays active. Dropping the returned watcher stops watching.

use arc_swap::ArcSwap;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::manifest::load_table;
use crate::table::RouteTable;

/// Reload `live` from `manifest_path` whenever the file is modified or
/// recreated, then call `on_reload` with the new table.
pub fn watch_manifest<P, F>(
    manifest_path: P,
    live: Arc<ArcSwap<RouteTable>>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&RouteTable) + Send + 'static,
{
    let path: PathBuf = manifest_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    if let Some(table) = reload(&watch_path, &live) {
                        on_reload(&table);
                    }
                }
            }
            Err(e) => error!(error = %e, "Manifest watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(manifest = %path.display(), "Watching route manifest");
    Ok(watcher)
}

/// Load the manifest and publish it; `None` leaves `live` untouched.
pub fn reload(path: &Path, live: &ArcSwap<RouteTable>) -> Option<Arc<RouteTable>> {
    match load_table(path) {
        Ok(table) => {
            let table = Arc::new(table);
            let previous = live.swap(Arc::clone(&table));
            info!(
                manifest = %path.display(),
                previous_routes = previous.len(),
                routes_count = table.len(),
                "hot-reload: applied route updates"
            );
            Some(table)
        }
        Err(e) => {
            warn!(
                manifest = %path.display(),
                error = %format!("{e:#}"),
                "hot-reload: keeping previous routes"
            );
            None
        }
    }
}
