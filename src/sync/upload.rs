//! Upload reconciler - Lắp ráp snapshot từ local state và đẩy lên gist.
//!
//! Thứ tự: manifest extensions -> các file cấu hình (sau khi áp custom
//! rules) -> blob metadata. Gist chỉ được ghi theo kiểu merge cộng dồn,
//! file đã xoá local KHÔNG bị xoá trên remote (không có tombstoning).

use crate::config::{CustomSettings, SyncConfig};
use crate::environment::{
    Environment, FILE_CLOUDSETTINGS, FILE_CUSTOMIZED_SETTINGS, FILE_EXTENSION,
    FILE_KEYBINDING_DEFAULT, FILE_KEYBINDING_MAC, FILE_SUMMARY,
};
use crate::error::{SyncError, SyncResult};
use crate::extensions::{to_manifest, ExtensionRecord};
use crate::files::SyncFile;
use crate::sync::CloudSetting;
use chrono::{DateTime, Utc};

use super::gist::SnapshotStore;

/// Kết quả của một lần upload thành công
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub gist_id: String,
    /// Gist vừa được tạo mới trong lần upload này
    pub created_new_gist: bool,
    /// Gist đang thao tác là public
    pub public_gist: bool,
    /// Tên các blob đã upload
    pub uploaded_files: Vec<String>,
    /// Danh sách extensions đã đưa vào manifest
    pub extensions: Vec<ExtensionRecord>,
}

/// Áp custom rules và platform remap lên danh sách file local.
///
/// - File custom rules và file summary không bao giờ được upload
/// - Loại theo tên exact (ignoreUploadFiles)
/// - Loại nếu đường dẫn CHỨA bất kỳ folder token nào (substring match,
///   kể cả khi token chỉ khớp một phần segment)
/// - Bỏ file rỗng
/// - Remap gist name của keybindings theo OS đang chạy
pub fn filter_content_files(
    env: &Environment,
    custom: &CustomSettings,
    files: Vec<SyncFile>,
) -> Vec<SyncFile> {
    files
        .into_iter()
        .filter(|f| {
            f.file_name != FILE_CUSTOMIZED_SETTINGS
                && f.file_name != FILE_SUMMARY
                && f.file_name != FILE_KEYBINDING_MAC
        })
        .filter(|f| !custom.ignore_upload_files.contains(&f.file_name))
        .filter(|f| {
            let path = f
                .file_path
                .as_ref()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_else(|| f.file_name.clone());
            !custom
                .ignore_upload_folders
                .iter()
                .any(|folder| path.contains(folder.as_str()))
        })
        .filter(|f| !f.content.is_empty())
        .map(|mut f| {
            if f.file_name == FILE_KEYBINDING_DEFAULT {
                f.gist_name = env.os.keybinding_gist_name().to_string();
            }
            f
        })
        .collect()
}

/// Upload toàn bộ local state lên gist.
///
/// `config` chỉ được mutate (gist_id mới + last_upload) khi mọi bước
/// network đã thành công; caller chịu trách nhiệm persist xuống disk.
#[allow(clippy::too_many_arguments)]
pub fn upload(
    env: &Environment,
    config: &mut SyncConfig,
    custom: &CustomSettings,
    local_files: Vec<SyncFile>,
    local_extensions: Vec<ExtensionRecord>,
    store: &dyn SnapshotStore,
    public_gist: bool,
    now: DateTime<Utc>,
) -> SyncResult<UploadOutcome> {
    // Thiếu token mà không anonymous: abort trước khi gọi network
    if !config.anonymous_gist && !config.token_available() {
        return Err(SyncError::CredentialMissing);
    }

    let mut all_files: Vec<SyncFile> = Vec::new();

    // Manifest extensions (đã sort theo tên cho deterministic)
    all_files.push(SyncFile::remote(
        FILE_EXTENSION,
        to_manifest(&local_extensions),
    ));

    all_files.extend(filter_content_files(env, custom, local_files));

    // Metadata cho staleness oracle ở các máy khác
    let cloud = CloudSetting::new(now);
    all_files.push(SyncFile::remote(
        FILE_CLOUDSETTINGS,
        serde_json::to_string(&cloud).unwrap_or_else(|_| "{}".to_string()),
    ));

    let mut public_out = public_gist;
    let gist_id;
    let created_new_gist;

    if config.anonymous_gist {
        // Anonymous: mỗi lần upload tạo gist mới với toàn bộ payload
        gist_id = store.create(public_gist, &all_files)?;
        created_new_gist = true;
    } else {
        let existing = config.gist_id.clone().filter(|g| !g.is_empty());
        created_new_gist = existing.is_none();
        let id = match existing {
            Some(id) => id,
            None => store.create_empty(public_gist)?,
        };

        // Read-modify-write: kiểm tra ownership trước khi ghi đè
        let snapshot = store.read(&id)?;
        if let Some(owner) = &snapshot.owner_login {
            if let Some(me) = store.authenticated_user()? {
                if owner.to_lowercase() != me.to_lowercase() {
                    return Err(SyncError::OwnershipMismatch {
                        id,
                        owner: owner.clone(),
                    });
                }
            }
        }
        if snapshot.public {
            public_out = true;
        }

        store.write(&id, &all_files)?;
        gist_id = id;
    }

    // Mọi bước network đã xong - giờ mới được đụng vào config
    config.gist_id = Some(gist_id.clone());
    config.last_upload = Some(now);

    Ok(UploadOutcome {
        gist_id,
        created_new_gist,
        public_gist: public_out,
        uploaded_files: all_files.iter().map(|f| f.gist_name.clone()).collect(),
        extensions: local_extensions,
    })
}
