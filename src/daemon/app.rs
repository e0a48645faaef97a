use crate::core::models::Service;
use crate::core::settings::{Settings, SettingsChange};
use crate::core::watcher::ConfigWatcher;
use crate::daemon::dbus::start_dbus_server;
use crate::daemon::scheduler::{Scheduler, SchedulerEvent};
use crate::providers::ProviderRegistry;
use crate::ui::TerminalSurface;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;

pub async fn run() -> Result<()> {
    let config_path = Settings::config_path().context("Could not determine config directory")?;
    let settings = Settings::load_from(&config_path)?;
    settings.validate()?;

    for service in Service::ALL {
        if settings.is_enabled(service) && !settings.has_credentials(service) {
            tracing::warn!(%service, path = ?config_path, "Service enabled without credentials");
        }
    }

    let registry = ProviderRegistry::new(&settings);
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SchedulerEvent>();

    let scheduler = Scheduler::new(
        &settings,
        registry,
        TerminalSurface::new(settings.display.countdown),
        event_tx.clone(),
    )?;

    let _config_watcher = match ConfigWatcher::start(&config_path) {
        Ok((watcher, change_rx)) => {
            tokio::spawn(forward_config_changes(
                config_path.clone(),
                settings,
                change_rx,
                event_tx.clone(),
            ));
            Some(watcher)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, edits need a restart");
            None
        }
    };

    let _dbus_connection = match start_dbus_server(event_tx.clone()).await {
        Ok(connection) => Some(connection),
        Err(e) => {
            tracing::warn!(error = %e, "D-Bus interface unavailable");
            None
        }
    };

    let shutdown_tx = event_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            let _ = shutdown_tx.send(SchedulerEvent::Shutdown);
        }
    });
    drop(event_tx);

    scheduler.run(event_rx).await;
    tracing::info!("Daemon stopped");
    Ok(())
}

async fn forward_config_changes(
    config_path: PathBuf,
    mut current: Settings,
    mut change_rx: mpsc::UnboundedReceiver<()>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
) {
    while change_rx.recv().await.is_some() {
        let updated = match Settings::load_from(&config_path).and_then(|s| {
            s.validate()?;
            Ok(s)
        }) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid config");
                continue;
            }
        };

        let changes = updated.changes_from(&current);
        if changes.is_empty() {
            tracing::debug!("Config rewritten without changes");
        }

        for event in events_for_changes(&updated, changes) {
            if events.send(event).is_err() {
                return;
            }
        }
        current = updated;
    }
}

fn events_for_changes(settings: &Settings, changes: Vec<SettingsChange>) -> Vec<SchedulerEvent> {
    changes
        .into_iter()
        .map(|change| {
            tracing::info!(?change, "Applying config change");
            match change {
                SettingsChange::Credentials => {
                    SchedulerEvent::CredentialsUpdated(ProviderRegistry::new(settings))
                }
                SettingsChange::Enabled(service, enabled) => {
                    SchedulerEvent::SetEnabled(service, enabled)
                }
                SettingsChange::HoneygainInterval(interval) => SchedulerEvent::SetInterval(interval),
            }
        })
        .collect()
}
