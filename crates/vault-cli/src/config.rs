use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default tracing filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "vault=warn";

#[derive(Debug, Serialize, Deserialize)]
pub struct VaultConfig {
    pub vault: VaultSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VaultSection {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct LoggingSection {
    pub filter: Option<String>,
}

impl VaultConfig {
    pub fn new(vault_path: &Path) -> Self {
        Self {
            vault: VaultSection {
                path: vault_path.to_string_lossy().to_string(),
            },
            logging: LoggingSection::default(),
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_vault_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("vault.db"))
}

/// Read the config file if it exists.
pub fn load_config() -> anyhow::Result<Option<VaultConfig>> {
    let path = default_config_path()?;
    if !path.exists() {
        return Ok(None);
    }
    read_config(&path).map(Some)
}

pub fn read_config(path: &Path) -> anyhow::Result<VaultConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &VaultConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

/// Resolve the vault path: `--vault`/`VAULT_PATH`, then config, then the
/// XDG data default.
pub fn resolve_vault_path(
    explicit: Option<&str>,
    config: Option<&VaultConfig>,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }
    if let Some(config) = config {
        return Ok(PathBuf::from(&config.vault.path));
    }
    default_vault_path()
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("vault"));
        }
    }
    Ok(home_dir()?.join(".config").join("vault"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("vault"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("vault"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let config = VaultConfig::new(Path::new("/from/config.db"));
        let resolved = resolve_vault_path(Some("/explicit.db"), Some(&config)).unwrap();
        assert_eq!(resolved, PathBuf::from("/explicit.db"));

        let resolved = resolve_vault_path(None, Some(&config)).unwrap();
        assert_eq!(resolved, PathBuf::from("/from/config.db"));
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = VaultConfig::new(Path::new("/tmp/vault.db"));
        config.logging.filter = Some("vault=debug".to_string());

        write_config(&path, &config).unwrap();
        let loaded = read_config(&path).unwrap();

        assert_eq!(loaded.vault.path, "/tmp/vault.db");
        assert_eq!(loaded.logging.filter.as_deref(), Some("vault=debug"));
    }

    #[test]
    fn test_logging_section_is_optional() {
        let config: VaultConfig = toml::from_str("[vault]\npath = \"/v.db\"\n").unwrap();
        assert!(config.logging.filter.is_none());
    }
}
