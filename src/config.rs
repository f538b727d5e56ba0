//! Dynbridge Configuration
//!
//! Handles parsing and management of dynbridge.toml configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::bridge::{ModuleContract, ModuleLocator, DEFAULT_CALL_SYMBOL, DEFAULT_INIT_SYMBOL};

/// Name of the configuration file searched for
pub const CONFIG_FILE_NAME: &str = "dynbridge.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching dynbridge.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BridgeConfig {
    /// Which module to load and where to look for it
    #[serde(default)]
    pub module: ModuleConfig,

    /// Exported symbol names
    #[serde(default)]
    pub symbols: SymbolsConfig,

    /// Requests sent by the demonstration run
    #[serde(default)]
    pub demo: DemoConfig,
}

impl BridgeConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir()?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    ///
    /// Falls back to defaults when no file is found.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Locator with the platform defaults followed by the configured paths.
    pub fn locator(&self) -> ModuleLocator {
        let mut locator = ModuleLocator::new();
        for path in &self.module.search_paths {
            locator.add_search_path(path);
        }
        locator
    }

    /// Build the module contract from the configured symbol names.
    ///
    /// # Safety
    ///
    /// See [`ModuleContract::trusted`]: the configured module must export
    /// these names with the standard init/call/release signatures.
    pub unsafe fn contract(&self) -> ModuleContract {
        ModuleContract::trusted(
            self.symbols.init.clone(),
            self.symbols.call.clone(),
            self.symbols.release.clone(),
        )
    }
}

/// Module location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleConfig {
    /// Module path or bare name
    #[serde(default = "default_module_path")]
    pub path: String,

    /// Extra directories searched for bare module names
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

fn default_module_path() -> String {
    "./libbinance.so".to_string()
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            path: default_module_path(),
            search_paths: Vec::new(),
        }
    }
}

/// Names of the module's C-linkage exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolsConfig {
    /// Callback registration entry point
    #[serde(default = "default_init_symbol")]
    pub init: String,

    /// Request entry point
    #[serde(default = "default_call_symbol")]
    pub call: String,

    /// Optional export that frees strings returned by `call`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

fn default_init_symbol() -> String {
    DEFAULT_INIT_SYMBOL.to_string()
}

fn default_call_symbol() -> String {
    DEFAULT_CALL_SYMBOL.to_string()
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            init: default_init_symbol(),
            call: default_call_symbol(),
            release: None,
        }
    }
}

/// Demonstration run settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemoConfig {
    /// Request tags sent in order
    #[serde(default = "default_requests")]
    pub requests: Vec<String>,
}

fn default_requests() -> Vec<String> {
    vec!["new_order".to_string(), "exchange_info".to_string()]
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            requests: default_requests(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.module.path, "./libbinance.so");
        assert_eq!(config.symbols.init, "init");
        assert_eq!(config.symbols.call, "call");
        assert!(config.symbols.release.is_none());
        assert_eq!(config.demo.requests, vec!["new_order", "exchange_info"]);
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[module]
path = "binance"
search_paths = ["/opt/binance/lib"]

[symbols]
init = "initFromCpp"
call = "rustFromCpp"
release = "release"
"#;
        let config: BridgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.module.path, "binance");
        assert_eq!(config.module.search_paths, vec![PathBuf::from("/opt/binance/lib")]);
        assert_eq!(config.symbols.init, "initFromCpp");
        assert_eq!(config.symbols.release.as_deref(), Some("release"));
        // Missing section falls back to defaults
        assert_eq!(config.demo, DemoConfig::default());

        let contract = unsafe { config.contract() };
        assert_eq!(contract.symbols(), vec!["initFromCpp", "rustFromCpp", "release"]);
    }

    #[test]
    fn test_locator_includes_configured_paths() {
        let mut config = BridgeConfig::default();
        config.module.search_paths.push(PathBuf::from("/opt/binance/lib"));
        let locator = config.locator();
        assert_eq!(
            locator.search_paths().last(),
            Some(&PathBuf::from("/opt/binance/lib"))
        );
    }

    #[test]
    fn test_save_and_find() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let mut config = BridgeConfig::default();
        config.demo.requests = vec!["ping".to_string()];
        config.save(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let found = BridgeConfig::find_and_load(&nested).unwrap();
        assert_eq!(found, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = BridgeConfig::load(Path::new("/no/such/dynbridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
