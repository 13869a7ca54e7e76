//! Extension inventory - Liệt kê, diff và cài/gỡ extensions.
//!
//! Danh sách extensions đã cài được lấy qua CLI của editor
//! (`code --list-extensions --show-versions`). Install/uninstall cũng đi
//! qua CLI đó, mỗi extension là một thao tác độc lập có thể thất bại
//! riêng lẻ mà không chặn các extension khác.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

/// Extension ID của chính tool sync (không bao giờ đưa vào manifest)
const SYNC_EXTENSION_ID: &str = "settingsync.settings-sync";

/// Một extension đã cài: identity = (publisher, name), version chỉ mang
/// tính thông tin và không tham gia vào diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub publisher: String,
    pub name: String,
    pub version: String,
}

impl ExtensionRecord {
    pub fn new(
        publisher: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher: publisher.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Identity dạng "publisher.name" (lowercase) dùng cho diff
    pub fn identity(&self) -> String {
        format!("{}.{}", self.publisher, self.name).to_lowercase()
    }

    /// ID đầy đủ dạng "publisher.name" như editor CLI hiểu
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.publisher, self.name)
    }

    /// Parse một dòng output của `--list-extensions --show-versions`
    /// (định dạng "publisher.name@version")
    pub fn parse_listing_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let (id, version) = line.split_once('@')?;
        let (publisher, name) = id.split_once('.')?;
        if publisher.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(publisher, name, version))
    }
}

/// Sắp xếp theo tên, không phân biệt hoa thường, để manifest deterministic
pub fn sort_by_name(records: &mut [ExtensionRecord]) {
    records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}

/// Extensions có trong remote nhưng chưa cài local (cần install)
pub fn missing_from_local(
    remote: &[ExtensionRecord],
    local: &[ExtensionRecord],
) -> Vec<ExtensionRecord> {
    remote
        .iter()
        .filter(|r| !local.iter().any(|l| l.identity() == r.identity()))
        .cloned()
        .collect()
}

/// Extensions đã cài local nhưng không còn trong remote (ứng viên gỡ)
pub fn deleted_locally(
    remote: &[ExtensionRecord],
    local: &[ExtensionRecord],
) -> Vec<ExtensionRecord> {
    local
        .iter()
        .filter(|l| !remote.iter().any(|r| r.identity() == l.identity()))
        .cloned()
        .collect()
}

/// Serialize danh sách extensions thành manifest JSON (đã sort theo tên)
pub fn to_manifest(records: &[ExtensionRecord]) -> String {
    let mut sorted = records.to_vec();
    sort_by_name(&mut sorted);
    serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| "[]".to_string())
}

/// Parse manifest JSON thành danh sách extensions
pub fn from_manifest(content: &str) -> Result<Vec<ExtensionRecord>> {
    serde_json::from_str(content).context("Cannot parse extension manifest")
}

/// Platform extension manager - external collaborator.
/// Mỗi thao tác là độc lập và có thể thất bại riêng lẻ.
pub trait ExtensionManager: Send + Sync {
    /// Liệt kê extensions đã cài (không bao gồm chính tool sync)
    fn list_installed(&self) -> Result<Vec<ExtensionRecord>>;

    /// Cài một extension vào folder chỉ định
    fn install(&self, record: &ExtensionRecord, extension_folder: &Path) -> Result<()>;

    /// Gỡ một extension khỏi folder chỉ định
    fn uninstall(&self, record: &ExtensionRecord, extension_folder: &Path) -> Result<()>;
}

/// Extension manager dùng CLI của editor (`code`)
pub struct CodeCliManager {
    code_path: String,
}

impl CodeCliManager {
    pub fn new() -> Self {
        Self {
            code_path: "code".to_string(),
        }
    }

    /// Dùng binary cụ thể (vd. "codium", hoặc đường dẫn tuyệt đối)
    pub fn with_binary(code_path: impl Into<String>) -> Self {
        Self {
            code_path: code_path.into(),
        }
    }

    /// Chạy editor CLI và trả về stdout
    fn run_code(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.code_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Cannot execute editor CLI: {}", self.code_path))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Editor CLI failed: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for CodeCliManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionManager for CodeCliManager {
    fn list_installed(&self) -> Result<Vec<ExtensionRecord>> {
        let output = self.run_code(&["--list-extensions", "--show-versions"])?;

        let records = output
            .lines()
            .filter_map(ExtensionRecord::parse_listing_line)
            .filter(|r| r.full_id().to_lowercase() != SYNC_EXTENSION_ID)
            .collect();

        Ok(records)
    }

    fn install(&self, record: &ExtensionRecord, extension_folder: &Path) -> Result<()> {
        let folder = extension_folder.to_string_lossy();
        self.run_code(&[
            "--extensions-dir",
            &folder,
            "--install-extension",
            &record.full_id(),
        ])?;
        Ok(())
    }

    fn uninstall(&self, record: &ExtensionRecord, extension_folder: &Path) -> Result<()> {
        let folder = extension_folder.to_string_lossy();
        self.run_code(&[
            "--extensions-dir",
            &folder,
            "--uninstall-extension",
            &record.full_id(),
        ])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(publisher: &str, name: &str, version: &str) -> ExtensionRecord {
        ExtensionRecord::new(publisher, name, version)
    }

    #[test]
    fn test_parse_listing_line() {
        let record = ExtensionRecord::parse_listing_line("rust-lang.rust-analyzer@0.4.1823");
        assert_eq!(
            record,
            Some(rec("rust-lang", "rust-analyzer", "0.4.1823"))
        );

        assert_eq!(ExtensionRecord::parse_listing_line(""), None);
        assert_eq!(ExtensionRecord::parse_listing_line("no-version"), None);
        assert_eq!(ExtensionRecord::parse_listing_line(".name@1.0"), None);
    }

    #[test]
    fn test_diff_by_identity_ignores_version() {
        let remote = vec![rec("pub", "a", "1.0"), rec("pub", "c", "1.0")];
        let local = vec![rec("pub", "a", "2.0"), rec("pub", "b", "1.0")];

        let missing = missing_from_local(&remote, &local);
        assert_eq!(missing, vec![rec("pub", "c", "1.0")]);

        let deleted = deleted_locally(&remote, &local);
        assert_eq!(deleted, vec![rec("pub", "b", "1.0")]);
    }

    #[test]
    fn test_diff_is_order_independent() {
        let remote = vec![rec("pub", "c", "1.0"), rec("pub", "a", "1.0")];
        let local = vec![rec("pub", "b", "1.0"), rec("pub", "a", "1.0")];

        let missing = missing_from_local(&remote, &local);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "c");

        let deleted = deleted_locally(&remote, &local);
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].name, "b");
    }

    #[test]
    fn test_identity_is_case_insensitive() {
        let remote = vec![rec("Pub", "Tool", "1.0")];
        let local = vec![rec("pub", "tool", "3.0")];
        assert!(missing_from_local(&remote, &local).is_empty());
        assert!(deleted_locally(&remote, &local).is_empty());
    }

    #[test]
    fn test_manifest_sorted_by_name() -> Result<()> {
        let records = vec![
            rec("pub", "Zeta", "1.0"),
            rec("pub", "alpha", "1.0"),
            rec("pub", "Beta", "1.0"),
        ];
        let manifest = to_manifest(&records);
        let parsed = from_manifest(&manifest)?;
        let names: Vec<&str> = parsed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Beta", "Zeta"]);
        Ok(())
    }
}
