use serde::Deserialize;
use std::fmt;

/// Private key material.
///
/// Never printed: `Debug` and `Display` both redact. Call [`Secret::expose`]
/// at the single point where the raw value is needed.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `0x1234abcd...cdef01` style preview, or the full value when too short to mask
    pub fn masked(&self) -> String {
        let raw = &self.0;
        let chars: Vec<char> = raw.chars().collect();
        if raw.starts_with("0x") && chars.len() > 14 {
            let head: String = chars[..10].iter().collect();
            let tail: String = chars[chars.len() - 6..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            raw.clone()
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
