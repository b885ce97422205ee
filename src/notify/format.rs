//! Telegram message rendering (Markdown parse mode)

use alloy::primitives::Address;

use super::config::TelegramConfig;
use crate::secret::Secret;

/// Identity report:
///
/// ```text
/// *<host>*
/// owner address: `0x...`
/// burn address:  `0x...`
/// pk burner:     `0x...`
/// ```
pub fn identity_message(
    host: &str,
    config: &TelegramConfig,
    owner: Address,
    burner: Address,
    burner_key: Option<&Secret>,
) -> String {
    let mut lines = vec![format!("*{}*", host)];
    if config.include_owner {
        lines.push(format!("owner address: `{}`", owner));
    }
    lines.push(format!("burn address:  `{}`", burner));

    if config.send_burner_pk
        && let Some(key) = burner_key
    {
        let shown = if config.mask_burner_pk {
            key.masked()
        } else {
            key.expose().to_string()
        };
        lines.push(format!("pk burner:     `{}`", shown));
    }

    lines.join("\n")
}

pub fn status_message(host: &str, success: bool, details: &str) -> String {
    let icon = if success { "✅" } else { "❌" };
    let mut msg = format!("*{}* — Status node: {}", host, icon);
    if !details.is_empty() {
        msg.push('\n');
        msg.push_str(details);
    }
    msg
}

/// Wrap log lines in a Markdown code block
pub fn code_block(lines: &[String]) -> String {
    format!("```{}```", lines.join("\n"))
}
