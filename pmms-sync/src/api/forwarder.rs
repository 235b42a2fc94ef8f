//! Outbound HTTP callbacks to the host
//!
//! Each notification is POSTed as JSON to `<callback_url>/<name>`.
//! Delivery is fire-and-forget: failures are logged and dropped, never
//! retried, and never block the engine.

use std::time::Duration;

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::StartupHandshake;
use crate::error::{Error, Result};
use crate::events::{EventBus, Notification};

const USER_AGENT: &str = concat!("pmms-sync/", env!("CARGO_PKG_VERSION"));

/// Name of the startup handshake callback
pub const STARTUP_CALLBACK: &str = "duiStartup";

#[derive(Debug, Clone)]
pub struct HostForwarder {
    http_client: reqwest::Client,
    base_url: String,
}

impl HostForwarder {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Callback URL for a notification name
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Deliver one notification
    pub async fn forward(&self, notification: &Notification) -> Result<()> {
        let url = self.endpoint(notification.name());
        self.http_client
            .post(&url)
            .json(&notification.payload())
            .send()
            .await?
            .error_for_status()?;
        debug!(url = %url, "Notification delivered");
        Ok(())
    }

    /// Forward every notification published on `bus` until it closes
    pub fn spawn(self, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        info!(base_url = %self.base_url, "Host callback forwarder started");

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => {
                        if let Err(e) = self.forward(&notification).await {
                            warn!(
                                notification = notification.name(),
                                "Dropping host callback: {}", e
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Host callback forwarder lagged, {} notifications dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Host callback forwarder stopped");
        })
    }
}

/// Ask the host for its media configuration (`duiStartup`)
pub async fn startup_handshake(forwarder: &HostForwarder) -> Result<StartupHandshake> {
    let url = forwarder.endpoint(STARTUP_CALLBACK);
    let handshake = forwarder
        .http_client
        .post(&url)
        .json(&json!({}))
        .send()
        .await?
        .error_for_status()?
        .json::<StartupHandshake>()
        .await?;
    debug!(url = %url, ?handshake, "Startup handshake response");
    Ok(handshake)
}
