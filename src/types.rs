// src/types.rs

use std::str::FromStr;
use serde::Deserialize;

/// Where artifacts are persisted between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// SQLite database at `[config].database`.
    Sqlite,
    /// Process memory only (lost on restart).
    Memory,
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::Sqlite
    }
}

impl FromStr for StoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreMode::Sqlite),
            "memory" => Ok(StoreMode::Memory),
            other => Err(format!(
                "invalid store: {other} (expected \"sqlite\" or \"memory\")"
            )),
        }
    }
}

/// Header map as seen on a response: lower-cased name to all values.
pub type HeaderValues = std::collections::BTreeMap<String, Vec<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_mode_parses_case_insensitively() {
        assert_eq!("SQLite".parse::<StoreMode>().unwrap(), StoreMode::Sqlite);
        assert_eq!(" memory ".parse::<StoreMode>().unwrap(), StoreMode::Memory);
        assert!("redis".parse::<StoreMode>().is_err());
    }
}
