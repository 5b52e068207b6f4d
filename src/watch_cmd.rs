//! Watch command implementation

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use foldex::{Extension, Settings, SettingsStore, WatcherConfig};

pub async fn run_watch(root: PathBuf, settings: Settings, config: WatcherConfig) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([signal::SIGTERM, signal::SIGINT])?;

        std::thread::spawn(move || {
            if signals.forever().next().is_some() {
                shutdown_clone.store(true, Ordering::SeqCst);
            }
        });
    }

    let extension = Extension::new(SettingsStore::new(settings)).with_watcher_config(config);
    let session = extension.activate(&root).await?;
    let mut updates = session.cache().subscribe();

    println!("foldex watching: {}", session.root().display());
    if let Some(index) = session.index() {
        println!("INDEX {} directories", index.len());
    }

    while !shutdown.load(Ordering::SeqCst) {
        match tokio::time::timeout(Duration::from_millis(100), updates.changed()).await {
            Ok(Ok(())) => {
                if let Some(index) = updates.borrow_and_update().clone() {
                    println!(
                        "INDEX {} directories at {}",
                        index.len(),
                        index.built_at.format("%H:%M:%S")
                    );
                }
            }
            Ok(Err(_)) => break,
            Err(_) => continue,
        }
    }

    extension.deactivate(session).await;
    println!("SHUTDOWN");
    Ok(())
}
