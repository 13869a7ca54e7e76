//! Environment - Phát hiện OS và các đường dẫn của editor.
//!
//! Module này cung cấp:
//! - Tên các blob cố định trên gist (settings, keybindings, manifest...)
//! - Đường dẫn đến user folder và extensions folder của editor
//! - OS type để remap keybindings theo platform

use std::path::PathBuf;

/// Schema version của sync config (để migrate trong tương lai)
pub const CURRENT_VERSION: u32 = 1;

/// Tên file settings chính của editor
pub const FILE_SETTINGS: &str = "settings.json";
/// Tên file keybindings mặc định (Windows/Linux)
pub const FILE_KEYBINDING_DEFAULT: &str = "keybindings.json";
/// Tên blob keybindings dành riêng cho macOS
pub const FILE_KEYBINDING_MAC: &str = "keybindingsMac.json";
/// Tên blob chứa danh sách extensions đã cài
pub const FILE_EXTENSION: &str = "extensions.json";
/// Tên blob metadata trên cloud (không có dấu chấm nên không bao giờ
/// được ghi xuống disk khi download)
pub const FILE_CLOUDSETTINGS: &str = "cloudSettings";
/// File custom rules do user tự chỉnh, không bao giờ upload
pub const FILE_CUSTOMIZED_SETTINGS: &str = "syncLocalSettings.json";
/// File summary được ghi sau upload/download khi bật show_summary
pub const FILE_SUMMARY: &str = "syncSummary.txt";

/// Ký tự thay thế cho `/` trong gist name (gist không cho phép `/`)
pub const GIST_PATH_SEPARATOR: char = '|';

/// OS đang chạy, dùng cho việc remap keybindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsType {
    Windows,
    Linux,
    Mac,
}

impl OsType {
    /// Phát hiện OS hiện tại
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => OsType::Mac,
            "windows" => OsType::Windows,
            _ => OsType::Linux,
        }
    }

    /// Gist name của blob keybindings tương ứng với OS này
    pub fn keybinding_gist_name(self) -> &'static str {
        match self {
            OsType::Mac => FILE_KEYBINDING_MAC,
            _ => FILE_KEYBINDING_DEFAULT,
        }
    }
}

/// Môi trường chạy: OS + các đường dẫn editor
#[derive(Debug, Clone)]
pub struct Environment {
    pub os: OsType,
    /// Thư mục User của editor (chứa settings.json, keybindings.json, snippets/)
    pub user_folder: PathBuf,
    /// Thư mục chứa extensions đã cài
    pub extension_folder: PathBuf,
}

impl Environment {
    /// Tạo environment từ OS hiện tại và đường dẫn mặc định của editor
    pub fn detect() -> anyhow::Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot resolve user config directory"))?;
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot resolve home directory"))?;

        Ok(Self {
            os: OsType::current(),
            user_folder: config_dir.join("Code").join("User"),
            extension_folder: home_dir.join(".vscode").join("extensions"),
        })
    }

    /// Tạo environment với đường dẫn cụ thể (cho testing)
    pub fn with_paths(os: OsType, user_folder: PathBuf, extension_folder: PathBuf) -> Self {
        Self {
            os,
            user_folder,
            extension_folder,
        }
    }

    /// Đường dẫn đến file custom rules trong user folder
    pub fn custom_settings_path(&self) -> PathBuf {
        self.user_folder.join(FILE_CUSTOMIZED_SETTINGS)
    }

    /// Đường dẫn đến settings.json
    pub fn settings_path(&self) -> PathBuf {
        self.user_folder.join(FILE_SETTINGS)
    }

    /// Đường dẫn đến file summary
    pub fn summary_path(&self) -> PathBuf {
        self.user_folder.join(FILE_SUMMARY)
    }

    /// Phiên bản tool, được nhúng vào blob metadata trên cloud
    pub fn tool_version() -> String {
        format!("v{}", env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keybinding_gist_name_per_os() {
        assert_eq!(OsType::Mac.keybinding_gist_name(), FILE_KEYBINDING_MAC);
        assert_eq!(
            OsType::Linux.keybinding_gist_name(),
            FILE_KEYBINDING_DEFAULT
        );
        assert_eq!(
            OsType::Windows.keybinding_gist_name(),
            FILE_KEYBINDING_DEFAULT
        );
    }

    #[test]
    fn test_with_paths_keeps_locations() {
        let env = Environment::with_paths(
            OsType::Linux,
            PathBuf::from("/tmp/user"),
            PathBuf::from("/tmp/ext"),
        );
        assert_eq!(env.settings_path(), PathBuf::from("/tmp/user/settings.json"));
        assert_eq!(
            env.custom_settings_path(),
            PathBuf::from("/tmp/user/syncLocalSettings.json")
        );
    }
}
