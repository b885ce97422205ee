//! Telegram Bot API sink
//!
//! Sends Markdown messages through `sendMessage`. The host label shown in
//! every message is resolved once per notifier.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::config::TelegramConfig;
use super::format;
use super::sink::{NotificationSink, NotifyError};
use crate::secret::Secret;

const PUBLIC_IP_SERVICES: [&str; 3] = [
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://ipv4.icanhazip.com",
];
const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(5);
const SEND_TIMEOUT: Duration = Duration::from_secs(15);
const FALLBACK_HOST_LABEL: &str = "VPS";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    config: TelegramConfig,
    client: reqwest::Client,
    host_label: OnceCell<String>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            host_label: OnceCell::new(),
        }
    }

    /// Configured `vps_name`, else the public IPv4, else the first local
    /// address, else "VPS"
    pub async fn host_label(&self) -> &str {
        self.host_label
            .get_or_init(|| async {
                if let Some(name) = self
                    .config
                    .vps_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                {
                    return name.to_string();
                }
                if let Some(ip) = self.public_ip().await {
                    return ip;
                }
                match local_address().await {
                    Some(ip) => ip,
                    None => FALLBACK_HOST_LABEL.to_string(),
                }
            })
            .await
    }

    async fn public_ip(&self) -> Option<String> {
        for url in PUBLIC_IP_SERVICES {
            let response = self
                .client
                .get(url)
                .timeout(PUBLIC_IP_TIMEOUT)
                .send()
                .await;
            match response {
                Ok(resp) if resp.status().is_success() => {
                    if let Ok(body) = resp.text().await {
                        let ip = body.trim();
                        if !ip.is_empty() && ip.parse::<std::net::Ipv4Addr>().is_ok() {
                            return Some(ip.to_string());
                        }
                    }
                }
                Ok(resp) => debug!(url, status = %resp.status(), "Public IP lookup failed"),
                Err(e) => debug!(url, error = %e, "Public IP lookup failed"),
            }
        }
        None
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token.expose()
        )
    }

    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let form = [
            ("chat_id", self.config.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "Markdown"),
        ];

        // reqwest errors include the URL, which carries the bot token
        let resp = self
            .client
            .post(self.endpoint())
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url().to_string()))?;

        let status = resp.status();
        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| NotifyError::Http(format!("{} ({})", e.without_url(), status)))?;

        if !body.ok {
            let reason = body.description.unwrap_or_else(|| status.to_string());
            warn!(reason = %reason, "Telegram rejected message");
            return Err(NotifyError::Rejected(reason));
        }
        Ok(())
    }
}

/// First address reported by `hostname -I`
async fn local_address() -> Option<String> {
    let output = tokio::process::Command::new("hostname")
        .arg("-I")
        .stdin(std::process::Stdio::null())
        .output()
        .await;
    match output {
        Ok(out) if out.status.success() => first_address(&String::from_utf8_lossy(&out.stdout)),
        Ok(out) => {
            debug!(status = %out.status, "Local address lookup failed");
            None
        }
        Err(e) => {
            debug!(error = %e, "Local address lookup failed");
            None
        }
    }
}

fn first_address(listing: &str) -> Option<String> {
    listing.split_whitespace().next().map(str::to_string)
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn notify_identity(
        &self,
        owner: Address,
        burner: Address,
        burner_key: Option<&Secret>,
    ) -> Result<(), NotifyError> {
        let host = self.host_label().await;
        let text = format::identity_message(host, &self.config, owner, burner, burner_key);
        self.send_text(&text).await
    }

    async fn notify_status(&self, success: bool, details: &str) -> Result<(), NotifyError> {
        let host = self.host_label().await;
        let text = format::status_message(host, success, details);
        self.send_text(&text).await
    }
}
