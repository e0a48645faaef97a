use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

const DEBOUNCE: Duration = Duration::from_millis(200);

pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn start(config_path: &Path) -> Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let parent = config_path
            .parent()
            .map(Path::to_path_buf)
            .context("Config path has no parent directory")?;
        let file_name: OsString = config_path
            .file_name()
            .context("Config path has no file name")?
            .to_os_string();

        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();
        let (async_tx, async_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else { return };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                if event.paths.iter().any(|p| is_config_file(p, &file_name)) {
                    let _ = notify_tx.send(());
                }
            },
            Config::default(),
        )?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;
        tracing::info!(?parent, "Watching config directory");

        tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while notify_rx.try_recv().is_ok() {}

                tracing::info!("Config file changed on disk");
                if async_tx.send(()).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn is_config_file(path: &Path, file_name: &OsString) -> bool {
    path.file_name().is_some_and(|name| name == file_name.as_os_str())
}
