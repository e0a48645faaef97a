use super::scheduler::SchedulerEvent;
use anyhow::{Context, Result};
use tokio::sync::mpsc;
use zbus::interface;

pub const DBUS_NAME: &str = "com.github.balancebar.BalanceBar";
pub const DBUS_PATH: &str = "/com/github/balancebar/BalanceBar";

pub struct BalanceBarService {
    events: mpsc::UnboundedSender<SchedulerEvent>,
}

impl BalanceBarService {
    pub fn new(events: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        Self { events }
    }

    fn forward(&self, event: SchedulerEvent) -> zbus::fdo::Result<()> {
        self.events
            .send(event)
            .map_err(|_| zbus::fdo::Error::Failed("Scheduler is not running".to_string()))
    }
}

#[interface(name = "com.github.balancebar.BalanceBar")]
impl BalanceBarService {
    async fn refresh(&self) -> zbus::fdo::Result<()> {
        tracing::info!("D-Bus Refresh called");
        self.forward(SchedulerEvent::RefreshAll)
    }

    async fn restart(&self) -> zbus::fdo::Result<()> {
        tracing::info!("D-Bus Restart called");
        self.forward(SchedulerEvent::RestartAll)
    }
}

pub async fn start_dbus_server(
    events: mpsc::UnboundedSender<SchedulerEvent>,
) -> Result<zbus::Connection> {
    let connection = zbus::connection::Builder::session()
        .context("Failed to connect to session D-Bus")?
        .name(DBUS_NAME)
        .with_context(|| format!("Invalid D-Bus name: {DBUS_NAME}"))?
        .serve_at(DBUS_PATH, BalanceBarService::new(events))
        .context("Failed to register D-Bus object")?
        .build()
        .await
        .context("Failed to acquire D-Bus name - is another daemon running?")?;

    tracing::info!(name = DBUS_NAME, path = DBUS_PATH, "D-Bus interface ready");
    Ok(connection)
}
