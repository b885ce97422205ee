//! Burner identity: capture result, persisted record and key recovery

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::secret::Secret;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed identity record {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Owner and burner of a running worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub owner: Address,
    pub burner: Address,
    pub burner_key: Option<Secret>,
    pub captured_at: DateTime<Utc>,
}

/// On-disk burner record (`meta.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub burner: String,
}

impl IdentityRecord {
    pub fn new(burner: Address) -> Self {
        Self {
            burner: burner.to_string(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), IdentityError> {
        let io_err = |source| IdentityError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(self).map_err(|e| IdentityError::Malformed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, body).map_err(io_err)
    }

    /// `Ok(None)` when no record has been written yet
    pub fn load(path: &Path) -> Result<Option<Self>, IdentityError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(IdentityError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| IdentityError::Malformed {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}

const TOP_LEVEL_KEY_FIELDS: [&str; 3] = ["privateKey", "private_key", "ethPrivateKey"];
const WALLET_KEY_FIELDS: [&str; 2] = ["privateKey", "private_key"];

/// Recover the burner private key from the node's wallet cache.
///
/// Any read or parse problem means "no key".
pub fn read_burner_key(cache_file: &Path) -> Option<Secret> {
    let content = match std::fs::read_to_string(cache_file) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %cache_file.display(), error = %e, "Node cache not readable");
            return None;
        }
    };
    let doc: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            debug!(path = %cache_file.display(), error = %e, "Node cache not JSON");
            return None;
        }
    };

    let non_empty = |v: &Value, field: &str| {
        v.get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Secret::new)
    };

    TOP_LEVEL_KEY_FIELDS
        .iter()
        .find_map(|field| non_empty(&doc, field))
        .or_else(|| {
            let wallet = doc.get("wallet")?;
            WALLET_KEY_FIELDS
                .iter()
                .find_map(|field| non_empty(wallet, field))
        })
}
