//! Config module - Quản lý cấu hình sync (settingsync.toml) và custom rules.
//!
//! File cấu hình chứa:
//! - Gist ID và access token
//! - Timestamps của lần upload/download cuối
//! - Các flags (auto upload, auto download, force download, summary...)
//!
//! Custom rules (syncLocalSettings.json) nằm trong user folder của editor,
//! do user tự chỉnh sửa, và không bao giờ được upload.

use crate::environment::CURRENT_VERSION;
use crate::error::{SyncError, SyncResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Cấu hình sync được persist giữa các sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Phiên bản config (để migrate trong tương lai)
    #[serde(default = "default_version")]
    pub version: u32,

    /// ID của gist chứa snapshot. Ổn định sau khi set, chỉ bị clear
    /// khi user chủ động reset hoặc share lại bằng gist public mới.
    #[serde(default)]
    pub gist_id: Option<String>,

    /// GitHub access token
    #[serde(default)]
    pub token: Option<String>,

    /// Thời điểm upload thành công gần nhất
    #[serde(default)]
    pub last_upload: Option<DateTime<Utc>>,

    /// Thời điểm download thành công gần nhất (= lastUpload của remote)
    #[serde(default)]
    pub last_download: Option<DateTime<Utc>>,

    /// Tự động upload khi user folder thay đổi
    #[serde(default)]
    pub auto_upload: bool,

    /// Tự động download khi khởi động
    #[serde(default)]
    pub auto_download: bool,

    /// Bỏ qua staleness check, luôn download
    #[serde(default)]
    pub force_download: bool,

    /// Ghi file summary sau upload/download
    #[serde(default = "default_true")]
    pub show_summary: bool,

    /// Upload bằng anonymous gist (không cần token)
    #[serde(default)]
    pub anonymous_gist: bool,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            gist_id: None,
            token: None,
            last_upload: None,
            last_download: None,
            auto_upload: false,
            auto_download: false,
            force_download: false,
            show_summary: true,
            anonymous_gist: false,
        }
    }
}

/// Lấy đường dẫn config directory mặc định (~/.config/settingsync/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("settingsync"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Lấy đường dẫn config file mặc định
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("settingsync.toml")
}

impl SyncConfig {
    /// Tạo config mới với các giá trị mặc định
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config từ file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: SyncConfig = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config từ đường dẫn mặc định (default nếu chưa tồn tại)
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Lưu config ra file
    pub fn save(&self, path: &Path) -> Result<()> {
        // Tạo thư mục cha nếu chưa tồn tại
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Cannot serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config file: {}", path.display()))?;

        Ok(())
    }

    /// Lưu config ra đường dẫn mặc định
    pub fn save_default(&self) -> Result<PathBuf> {
        let path = default_config_path();
        self.save(&path)?;
        Ok(path)
    }

    /// Lưu config, map lỗi IO vào error taxonomy của sync engine.
    /// Dùng trên đường thành công của upload/download: timestamps mới
    /// mà không persist được là một lỗi fatal có phân loại riêng.
    pub fn persist(&self, path: &Path) -> SyncResult<()> {
        self.save(path)
            .map_err(|e| SyncError::LocalPersistFailed(e.to_string()))
    }

    /// Như [`persist`](Self::persist) nhưng ra đường dẫn mặc định
    pub fn persist_default(&self) -> SyncResult<PathBuf> {
        let path = default_config_path();
        self.persist(&path)?;
        Ok(path)
    }

    /// Có token khả dụng không
    pub fn token_available(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Có gist ID khả dụng không
    pub fn gist_available(&self) -> bool {
        self.gist_id.as_deref().is_some_and(|g| !g.is_empty())
    }
}

/// Một cặp (key, value) của settings override.
/// Value rỗng nghĩa là "xóa key này khỏi settings sau khi download".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name: String,
    pub value: String,
}

impl NameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Custom rules do user tự chỉnh (syncLocalSettings.json).
/// File này nằm trong user folder của editor và không bao giờ upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomSettings {
    /// Tên file (exact match) sẽ bị loại khỏi upload
    pub ignore_upload_files: Vec<String>,

    /// Token folder: file bị loại nếu đường dẫn CHỨA bất kỳ token nào
    /// (substring match, kể cả partial segment)
    pub ignore_upload_folders: Vec<String>,

    /// Các settings override được áp dụng SAU khi download,
    /// để giá trị local luôn thắng
    pub replace_code_settings: Vec<NameValuePair>,
}

impl Default for CustomSettings {
    fn default() -> Self {
        Self {
            ignore_upload_files: vec![
                "projects.json".to_string(),
                "projects_cache_git.json".to_string(),
            ],
            ignore_upload_folders: vec!["workspaceStorage".to_string()],
            replace_code_settings: Vec::new(),
        }
    }
}

impl CustomSettings {
    /// Load custom rules từ file. Nếu file chưa tồn tại thì tạo file
    /// với giá trị mặc định để user có chỗ chỉnh sửa.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read custom settings: {}", path.display()))?;
            let settings: CustomSettings = serde_json::from_str(&content)
                .with_context(|| format!("Cannot parse custom settings: {}", path.display()))?;
            Ok(settings)
        } else {
            let settings = Self::default();
            settings.save(path)?;
            Ok(settings)
        }
    }

    /// Lưu custom rules ra file (JSON, pretty-printed để user dễ sửa)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .with_context(|| "Cannot serialize custom settings")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write custom settings: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.version, CURRENT_VERSION);
        assert!(!config.token_available());
        assert!(!config.gist_available());
        assert!(config.show_summary);
        assert!(!config.force_download);
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("settingsync.toml");

        let mut config = SyncConfig::new();
        config.gist_id = Some("abc123".to_string());
        config.token = Some("ghp_token".to_string());
        config.last_upload = Some(Utc::now());
        config.save(&config_path)?;

        let loaded = SyncConfig::load(&config_path)?;
        assert!(loaded.gist_available());
        assert!(loaded.token_available());
        assert_eq!(loaded.gist_id, config.gist_id);
        assert_eq!(loaded.last_upload, config.last_upload);

        Ok(())
    }

    #[test]
    fn test_persist_failure_maps_into_taxonomy() -> Result<()> {
        let temp_dir = TempDir::new()?;
        // Parent của đường dẫn config là một file thường -> ghi thất bại
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x")?;

        let config = SyncConfig::new();
        let result = config.persist(&blocker.join("settingsync.toml"));
        assert!(matches!(result, Err(SyncError::LocalPersistFailed(_))));

        Ok(())
    }

    #[test]
    fn test_empty_token_not_available() {
        let mut config = SyncConfig::new();
        config.token = Some(String::new());
        assert!(!config.token_available());
    }

    #[test]
    fn test_custom_settings_defaults() {
        let custom = CustomSettings::default();
        assert!(custom
            .ignore_upload_folders
            .contains(&"workspaceStorage".to_string()));
        assert!(custom
            .ignore_upload_files
            .contains(&"projects.json".to_string()));
        assert!(custom.replace_code_settings.is_empty());
    }

    #[test]
    fn test_load_or_create_writes_default_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("syncLocalSettings.json");

        let created = CustomSettings::load_or_create(&path)?;
        assert!(path.exists());

        let loaded = CustomSettings::load_or_create(&path)?;
        assert_eq!(loaded.ignore_upload_files, created.ignore_upload_files);

        Ok(())
    }
}
