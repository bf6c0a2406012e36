use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    pub sync: SyncSettings,
    pub storage: StorageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            sync: SyncSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub api_token: String,
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_token: String::new(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Subdirectory of the data dir that markdown exports land in.
    pub export_dir: String,
    /// Subdirectory of the data dir that attached images live in.
    pub image_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            export_dir: "exports".to_string(),
            image_dir: "images".to_string(),
        }
    }
}
