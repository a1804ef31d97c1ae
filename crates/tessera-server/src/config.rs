//! Engine configuration.
//!
//! [`EngineConfig::from_env`] reads `TESSERA_*` environment variables, falling
//! back to the defaults for unset variables. Values that do not parse are
//! logged and ignored.
//!
//! - `TESSERA_DB_PATH`: SQLite database file (default: in-memory store)
//! - `TESSERA_PORT`: HTTP listen port (default: 3000)
//! - `TESSERA_RECORD_USERS`: append contributor annotations (default: true)
//! - `TESSERA_VALIDATE_BEFORE_SAVE`: run the validator on `store` (default: false)
//! - `TESSERA_ATOMIC_BATCHES`: clone-and-swap batches (default: true)
//! - `TESSERA_UNDO_CAPACITY`: undo/redo depth per user and model (default: 100)
//! - `TESSERA_ID_BASE`: IRI base for new models (default: `http://tessera.dev/model/`)
//! - `TESSERA_DEFAULT_IMPORTS`: comma separated imports of new models
//! - `TESSERA_STRICT_RELATIONS`: only accept vocabulary relations (default: false)

use std::str::FromStr;

/// Tunables of the batch engine and its HTTP wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub db_path: Option<String>,
    pub port: u16,
    pub record_users: bool,
    pub validate_before_save: bool,
    pub atomic_batches: bool,
    pub undo_capacity: usize,
    pub id_base: String,
    pub default_imports: Vec<String>,
    pub strict_relations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            db_path: None,
            port: 3000,
            record_users: true,
            validate_before_save: false,
            atomic_batches: true,
            undo_capacity: 100,
            id_base: "http://tessera.dev/model/".to_string(),
            default_imports: Vec::new(),
            strict_relations: false,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = EngineConfig::default();
        if let Some(path) = lookup("TESSERA_DB_PATH").filter(|p| !p.is_empty()) {
            config.db_path = Some(path);
        }
        parse_into(&lookup, "TESSERA_PORT", &mut config.port);
        parse_into(&lookup, "TESSERA_RECORD_USERS", &mut config.record_users);
        parse_into(
            &lookup,
            "TESSERA_VALIDATE_BEFORE_SAVE",
            &mut config.validate_before_save,
        );
        parse_into(&lookup, "TESSERA_ATOMIC_BATCHES", &mut config.atomic_batches);
        parse_into(&lookup, "TESSERA_UNDO_CAPACITY", &mut config.undo_capacity);
        parse_into(&lookup, "TESSERA_STRICT_RELATIONS", &mut config.strict_relations);
        if let Some(base) = lookup("TESSERA_ID_BASE").filter(|b| !b.is_empty()) {
            config.id_base = base;
        }
        if let Some(imports) = lookup("TESSERA_DEFAULT_IMPORTS") {
            config.default_imports = imports
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        config
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, slot: &mut T) {
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> EngineConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(from_map(&[]), EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = from_map(&[
            ("TESSERA_PORT", "8080"),
            ("TESSERA_ATOMIC_BATCHES", "false"),
            ("TESSERA_UNDO_CAPACITY", "5"),
            ("TESSERA_DEFAULT_IMPORTS", "http://a, http://b,"),
        ]);
        assert_eq!(config.port, 8080);
        assert!(!config.atomic_batches);
        assert_eq!(config.undo_capacity, 5);
        assert_eq!(config.default_imports, vec!["http://a", "http://b"]);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = from_map(&[("TESSERA_PORT", "eighty"), ("TESSERA_RECORD_USERS", "yes")]);
        assert_eq!(config.port, 3000);
        assert!(config.record_users);
    }
}
