mod app;
mod dbus;
pub mod polling;
pub mod publisher;
pub mod scheduler;

use anyhow::Result;

pub use dbus::{DBUS_NAME, DBUS_PATH};

pub async fn run() -> Result<()> {
    tracing::info!("Starting balance-bar daemon");
    app::run().await
}
