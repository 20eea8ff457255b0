use std::path::{Path, PathBuf};

use halyard_reconciler::Config;
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

/// On-disk CLI configuration: the client settings plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    pub created_at: jiff::Timestamp,
    #[serde(flatten)]
    pub client: Config,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            created_at: jiff::Timestamp::now(),
            client: Config::default(),
        }
    }
}

pub fn default_path() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("halyard").join("config.json"))
}

/// Load the config at `path`, or defaults when there is none. Environment
/// overrides are applied on top either way.
pub fn load_or_default(path: &Path) -> eyre::Result<CliConfig> {
    let mut config = if path.exists() {
        load(path)?
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        CliConfig::default()
    };
    config.client = config.client.with_env_overrides();
    Ok(config)
}

pub fn load(path: &Path) -> eyre::Result<CliConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    Ok(serde_json::from_value(migrated)?)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update halyard."
        ));
    }

    // v0 → v1: `timeout` became `timeout_secs`, `created_at` added
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        if let Some(timeout) = obj.remove("timeout") {
            obj.entry("timeout_secs").or_insert(timeout);
        }
        obj.entry("created_at")
            .or_insert_with(|| serde_json::Value::String(jiff::Timestamp::now().to_string()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (timeout_secs, created_at)");
    }

    Ok(json)
}

pub fn save(path: &Path, config: &CliConfig) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;
    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // The file may hold an access token
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("halyard").join("config.json");

        let mut config = CliConfig::default();
        config.client.project = Some("my-project".to_string());
        config.client.timeout_secs = 30;
        save(&path, &config).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save(&path, &CliConfig::default()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn unversioned_config_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "base_path": "http://localhost:9000/v3/", "timeout": 15, "project": "legacy" }"#,
        )
        .unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.config_version, 1);
        assert_eq!(loaded.client.timeout_secs, 15);
        assert_eq!(loaded.client.base_path, "http://localhost:9000/v3/");
        assert_eq!(loaded.client.project.as_deref(), Some("legacy"));
    }

    #[test]
    fn newer_config_is_rejected() {
        let json = serde_json::json!({ "config_version": CURRENT_VERSION + 1 });
        assert!(migrate(json, CURRENT_VERSION + 1).is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.config_version, CURRENT_VERSION);
    }
}
