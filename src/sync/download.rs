//! Download reconciler - Đọc snapshot từ gist và áp lên local state.
//!
//! Flow của một lần download:
//! đọc snapshot -> staleness check -> chọn blob hợp lệ -> batch
//! install/uninstall/write chạy song song (thất bại từng item không chặn
//! item khác) -> cập nhật config -> áp settings overrides.
//!
//! Lỗi fetch/parse là fatal và xảy ra TRƯỚC khi config bị mutate, nên
//! last_download không bao giờ được persist dở dang.

use crate::config::{CustomSettings, NameValuePair, SyncConfig};
use crate::environment::{
    Environment, FILE_CLOUDSETTINGS, FILE_EXTENSION, FILE_KEYBINDING_DEFAULT, FILE_KEYBINDING_MAC,
    OsType,
};
use crate::error::{SyncError, SyncResult};
use crate::extensions::{
    deleted_locally, from_manifest, missing_from_local, ExtensionManager, ExtensionRecord,
};
use crate::files::{create_dir_tree, from_gist_name, write_file, SyncFile};
use crate::sync::{is_up_to_date, CloudSetting, ItemFailure};
use anyhow::{Context, Result};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

use super::gist::SnapshotStore;

/// Kết quả của một lần download
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Local đã là bản mới nhất, không có gì để làm
    UpToDate,
    /// Đã áp thay đổi (có thể kèm thất bại per-item)
    Applied(DownloadReport),
}

/// Báo cáo chi tiết của một lần download có thay đổi
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Tên các file đã ghi xuống user folder
    pub files_written: Vec<String>,
    /// Extensions đã cài thêm
    pub installed: Vec<ExtensionRecord>,
    /// Extensions đã gỡ
    pub removed: Vec<ExtensionRecord>,
    /// Các item thất bại (không làm hỏng cả batch)
    pub failures: Vec<ItemFailure>,
    /// Số settings overrides đã áp
    pub overrides_applied: usize,
}

/// Một hành động độc lập trong batch
enum SyncAction {
    Install(ExtensionRecord),
    Uninstall(ExtensionRecord),
    Write { file_name: String, content: String },
}

/// Kết quả một hành động thành công
enum Applied {
    Installed(ExtensionRecord),
    Removed(ExtensionRecord),
    Wrote(String),
}

/// Chọn các blob remote sẽ được xử lý.
///
/// Bỏ qua: blob rỗng, blob không có phần mở rộng (metadata), và blob
/// keybindings không thuộc platform này (blob mac trên máy không phải
/// mac và ngược lại).
pub fn select_remote_files(os: OsType, blobs: &BTreeMap<String, String>) -> Vec<SyncFile> {
    blobs
        .iter()
        .filter(|(name, content)| !content.is_empty() && name.contains('.'))
        .filter(|(name, _)| match os {
            OsType::Mac => name.as_str() != FILE_KEYBINDING_DEFAULT,
            _ => name.as_str() != FILE_KEYBINDING_MAC,
        })
        .map(|(name, content)| SyncFile::remote(name.clone(), content.clone()))
        .collect()
}

/// Tên file local cho một blob, remap blob keybindings mac về tên generic
fn local_file_name(file: &SyncFile) -> String {
    if file.gist_name == FILE_KEYBINDING_MAC {
        FILE_KEYBINDING_DEFAULT.to_string()
    } else {
        from_gist_name(&file.gist_name)
    }
}

/// Áp settings overrides lên settings.json sau khi download,
/// để các giá trị user khai báo luôn thắng giá trị tải về.
/// Value rỗng nghĩa là xoá key đó khỏi settings.
pub fn apply_setting_overrides(settings_path: &Path, pairs: &[NameValuePair]) -> Result<usize> {
    if pairs.is_empty() || !settings_path.is_file() {
        return Ok(0);
    }

    let content = std::fs::read_to_string(settings_path)
        .with_context(|| format!("Cannot read settings: {}", settings_path.display()))?;

    let mut settings: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Cannot parse settings: {}", settings_path.display()))?;

    let object = settings
        .as_object_mut()
        .context("Settings file is not a JSON object")?;

    let mut applied = 0;
    for pair in pairs {
        if pair.value.is_empty() {
            object.remove(&pair.name);
        } else {
            object.insert(
                pair.name.clone(),
                serde_json::Value::String(pair.value.clone()),
            );
        }
        applied += 1;
    }

    let output = serde_json::to_string_pretty(&settings)?;
    std::fs::write(settings_path, output + "\n")
        .with_context(|| format!("Cannot write settings: {}", settings_path.display()))?;

    Ok(applied)
}

/// Download snapshot và reconcile local state.
///
/// `config` chỉ được mutate (last_download) sau khi fetch/parse thành
/// công và toàn bộ batch đã resolve; caller persist xuống disk.
pub fn download(
    env: &Environment,
    config: &mut SyncConfig,
    custom: &CustomSettings,
    local_extensions: Vec<ExtensionRecord>,
    manager: &dyn ExtensionManager,
    store: &dyn SnapshotStore,
) -> SyncResult<DownloadOutcome> {
    let gist_id = config
        .gist_id
        .clone()
        .filter(|g| !g.is_empty())
        .ok_or_else(|| SyncError::RemoteReadFailed {
            id: String::new(),
            reason: "no gist id configured".to_string(),
        })?;

    let snapshot = store.read(&gist_id)?;

    // Metadata blob: nếu có thì parse bắt buộc phải thành công
    let cloud: Option<CloudSetting> = match snapshot.files.get(FILE_CLOUDSETTINGS) {
        Some(raw) => Some(serde_json::from_str(raw).map_err(|e| SyncError::RemoteReadFailed {
            id: gist_id.clone(),
            reason: format!("cannot parse cloud metadata: {}", e),
        })?),
        None => None,
    };

    if let Some(cloud) = &cloud {
        let up_to_date = is_up_to_date(config.last_upload, config.last_download, cloud.last_upload);
        if up_to_date && !config.force_download {
            return Ok(DownloadOutcome::UpToDate);
        }
    }

    // Lên kế hoạch hành động từ các blob hợp lệ
    let mut actions: Vec<SyncAction> = Vec::new();
    for file in select_remote_files(env.os, &snapshot.files) {
        if file.gist_name == FILE_EXTENSION {
            let remote_list =
                from_manifest(&file.content).map_err(|e| SyncError::RemoteReadFailed {
                    id: gist_id.clone(),
                    reason: format!("cannot parse extension manifest: {}", e),
                })?;

            for record in deleted_locally(&remote_list, &local_extensions) {
                actions.push(SyncAction::Uninstall(record));
            }
            for record in missing_from_local(&remote_list, &local_extensions) {
                actions.push(SyncAction::Install(record));
            }
        } else {
            actions.push(SyncAction::Write {
                file_name: local_file_name(&file),
                content: file.content,
            });
        }
    }

    // Batch song song: mỗi item độc lập, join tất cả bất kể thất bại
    let results: Vec<Result<Applied, ItemFailure>> = actions
        .par_iter()
        .progress_count(actions.len() as u64)
        .map(|action| match action {
            SyncAction::Install(record) => manager
                .install(record, &env.extension_folder)
                .map(|_| Applied::Installed(record.clone()))
                .map_err(|e| ItemFailure {
                    item: format!("install {}", record.full_id()),
                    reason: e.to_string(),
                }),
            SyncAction::Uninstall(record) => manager
                .uninstall(record, &env.extension_folder)
                .map(|_| Applied::Removed(record.clone()))
                .map_err(|e| ItemFailure {
                    item: format!("uninstall {}", record.full_id()),
                    reason: e.to_string(),
                }),
            SyncAction::Write { file_name, content } => {
                create_dir_tree(&env.user_folder, file_name)
                    .and_then(|path| write_file(&path, content))
                    .map(|_| Applied::Wrote(file_name.clone()))
                    .map_err(|e| ItemFailure {
                        item: format!("write {}", file_name),
                        reason: e.to_string(),
                    })
            }
        })
        .collect();

    let mut report = DownloadReport::default();
    for result in results {
        match result {
            Ok(Applied::Installed(record)) => report.installed.push(record),
            Ok(Applied::Removed(record)) => report.removed.push(record),
            Ok(Applied::Wrote(name)) => report.files_written.push(name),
            Err(failure) => report.failures.push(failure),
        }
    }

    // Batch đã resolve - giờ mới cập nhật config
    if let Some(cloud) = &cloud {
        config.last_download = Some(cloud.last_upload);
    }

    // Overrides áp SAU khi settings.json đã được ghi, để local luôn thắng
    match apply_setting_overrides(&env.settings_path(), &custom.replace_code_settings) {
        Ok(count) => report.overrides_applied = count,
        Err(e) => report.failures.push(ItemFailure {
            item: "apply setting overrides".to_string(),
            reason: e.to_string(),
        }),
    }

    Ok(DownloadOutcome::Applied(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn blobs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_mac_keybinding_blob_skipped_on_linux() {
        let files = select_remote_files(
            OsType::Linux,
            &blobs(&[
                ("keybindingsMac.json", "[]"),
                ("keybindings.json", "[]"),
                ("settings.json", "{}"),
            ]),
        );
        let names: Vec<&str> = files.iter().map(|f| f.gist_name.as_str()).collect();
        assert!(!names.contains(&"keybindingsMac.json"));
        assert!(names.contains(&"keybindings.json"));
        assert!(names.contains(&"settings.json"));
    }

    #[test]
    fn test_default_keybinding_blob_skipped_on_mac() {
        let files = select_remote_files(
            OsType::Mac,
            &blobs(&[("keybindingsMac.json", "[]"), ("keybindings.json", "[]")]),
        );
        let names: Vec<&str> = files.iter().map(|f| f.gist_name.as_str()).collect();
        assert_eq!(names, vec!["keybindingsMac.json"]);
    }

    #[test]
    fn test_metadata_and_empty_blobs_skipped() {
        let files = select_remote_files(
            OsType::Linux,
            &blobs(&[("cloudSettings", "{}"), ("settings.json", "")]),
        );
        assert!(files.is_empty());
    }

    #[test]
    fn test_mac_blob_written_to_generic_local_name() {
        let file = SyncFile::remote("keybindingsMac.json", "[]".to_string());
        assert_eq!(local_file_name(&file), "keybindings.json");

        let nested = SyncFile::remote("snippets|rust.json", "{}".to_string());
        assert_eq!(local_file_name(&nested), "snippets/rust.json");
    }

    #[test]
    fn test_overrides_set_and_clear() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "editor.fontSize": 14, "workbench.colorTheme": "Dark" }"#,
        )?;

        let pairs = vec![
            NameValuePair::new("editor.fontSize", ""),
            NameValuePair::new("http.proxy", "proxy:8080"),
        ];
        let applied = apply_setting_overrides(&path, &pairs)?;
        assert_eq!(applied, 2);

        let settings: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert!(settings.get("editor.fontSize").is_none());
        assert_eq!(settings["http.proxy"], "proxy:8080");
        assert_eq!(settings["workbench.colorTheme"], "Dark");

        Ok(())
    }

    #[test]
    fn test_overrides_noop_without_settings_file() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        let pairs = vec![NameValuePair::new("http.proxy", "proxy:8080")];
        assert_eq!(apply_setting_overrides(&path, &pairs)?, 0);
        Ok(())
    }
}
