//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wordhoard_core::config::{SyncConfig, SyncConfigOverrides};
use wordhoard_core::sync::Identity;
use wordhoard_core::util::normalize_text_option;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const APP_DIR_NAME: &str = "wordhoard";
const REMOTE_FILE_NAME: &str = "remote.json";
pub const PROFILE_ENV: &str = "WORDHOARD_PROFILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// JSON file standing in for the cloud document store
    #[serde(default)]
    pub remote_path: Option<PathBuf>,
    #[serde(default = "default_can_sync")]
    pub can_sync: bool,
    #[serde(default, skip_serializing_if = "SyncConfigOverrides::is_empty")]
    pub sync: SyncConfigOverrides,
}

impl Default for CliProfile {
    fn default() -> Self {
        Self {
            user_id: None,
            email: None,
            display_name: None,
            remote_path: None,
            can_sync: default_can_sync(),
            sync: SyncConfigOverrides::default(),
        }
    }
}

const fn default_config_version() -> u32 {
    1
}

const fn default_can_sync() -> bool {
    true
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn default_remote_path() -> Result<PathBuf, String> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(REMOTE_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI data directory".to_string())
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(std::env::var(PROFILE_ENV).ok().as_deref()) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Identity to sign in with, once both user id and email are set.
    pub fn identity(&self) -> Option<Identity> {
        let user_id = normalize_text_option(self.user_id.clone())?;
        let email = normalize_text_option(self.email.clone())?;
        let identity = Identity::new(user_id, email);
        Some(match normalize_text_option(self.display_name.clone()) {
            Some(name) => identity.with_display_name(name),
            None => identity,
        })
    }

    pub fn remote_path(&self) -> Result<PathBuf, String> {
        self.remote_path
            .clone()
            .map_or_else(default_remote_path, Ok)
    }

    /// Default sync tuning with this profile's overrides applied, validated.
    pub fn sync_config(&self) -> Result<SyncConfig, String> {
        let config = SyncConfig::default().with_overrides(&self.sync);
        config.validate().map_err(|error| error.to_string())?;
        Ok(config)
    }

    pub fn clear_identity(&mut self) {
        self.user_id = None;
        self.email = None;
        self.display_name = None;
    }

    fn normalize(&mut self) {
        self.user_id = normalize_text_option(self.user_id.take());
        self.email = normalize_text_option(self.email.take());
        self.display_name = normalize_text_option(self.display_name.take());
        self.remote_path = self
            .remote_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
        assert_eq!(normalize_profile_name(Some(" work ")), Some("work".into()));
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" default ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                user_id: Some(" alice ".to_string()),
                email: Some("alice@example.com".to_string()),
                display_name: Some("  ".to_string()),
                remote_path: Some(PathBuf::from("/tmp/remote.json")),
                can_sync: false,
                sync: SyncConfigOverrides {
                    batch_size: Some(100),
                    ..SyncConfigOverrides::default()
                },
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("default"));
        let profile = loaded.profiles.get("default").unwrap();
        assert_eq!(profile.user_id.as_deref(), Some("alice"));
        assert_eq!(profile.display_name, None);
        assert!(!profile.can_sync);
        assert_eq!(profile.sync.batch_size, Some(100));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: CliProfilesConfig =
            serde_json::from_str(r#"{"profiles": {"default": {}}}"#).unwrap();
        assert_eq!(config.version, 1);
        let profile = config.profile("default").unwrap();
        assert!(profile.can_sync);
        assert!(profile.sync.is_empty());
        assert_eq!(profile.identity(), None);
    }

    #[test]
    fn load_from_missing_path_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliProfilesConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, CliProfilesConfig::default());
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(config.resolve_profile_name(Some("mobile")), "mobile");
        if std::env::var_os(PROFILE_ENV).is_none() {
            assert_eq!(config.resolve_profile_name(None), "work");
        }
    }

    #[test]
    fn identity_needs_user_id_and_email() {
        let mut profile = CliProfile {
            user_id: Some("alice".into()),
            ..CliProfile::default()
        };
        assert_eq!(profile.identity(), None);

        profile.email = Some("alice@example.com".into());
        profile.display_name = Some("Alice".into());
        let identity = profile.identity().unwrap();
        assert_eq!(identity.user_id, "alice");
        assert_eq!(identity.display_name.as_deref(), Some("Alice"));

        profile.clear_identity();
        assert_eq!(profile.identity(), None);
    }

    #[test]
    fn sync_config_applies_and_validates_overrides() {
        let mut profile = CliProfile::default();
        profile.sync.retry_delay_ms = Some(0);
        let config = profile.sync_config().unwrap();
        assert_eq!(config.retry_delay_ms, 0);
        assert_eq!(config.batch_size, 500);

        profile.sync.batch_size = Some(501);
        assert!(profile.sync_config().is_err());
    }
}
