//! Sync engine - upload/download reconciliation qua GitHub Gist.
//!
//! Module này chứa:
//! - Gist client (remote snapshot store)
//! - Upload reconciler (local -> cloud)
//! - Download reconciler + staleness oracle (cloud -> local)
//! - File watcher cho auto-upload

pub mod download;
pub mod gist;
pub mod upload;
pub mod watcher;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata được nhúng vào mọi snapshot trên cloud.
/// Field names giữ dạng camelCase để tương thích với blob đã upload
/// từ các máy khác.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSetting {
    /// Thời điểm upload tạo ra snapshot này
    pub last_upload: DateTime<Utc>,
    /// Phiên bản tool đã upload
    #[serde(default)]
    pub extension_version: String,
}

impl CloudSetting {
    pub fn new(last_upload: DateTime<Utc>) -> Self {
        Self {
            last_upload,
            extension_version: crate::environment::Environment::tool_version(),
        }
    }
}

/// Staleness oracle: local đã có bản mới nhất chưa?
///
/// So sánh bằng equality chính xác, không phải ordering - remote cũ hơn
/// local cũng vẫn trigger download. Nếu cả hai timestamp local đều chưa
/// set thì không bao giờ up to date (lần download đầu tiên luôn chạy).
pub fn is_up_to_date(
    last_upload: Option<DateTime<Utc>>,
    last_download: Option<DateTime<Utc>>,
    remote_last_upload: DateTime<Utc>,
) -> bool {
    last_download.map_or(false, |d| d == remote_last_upload)
        || last_upload.map_or(false, |u| u == remote_last_upload)
}

/// Thất bại của một item trong batch (install/uninstall/write).
/// Không chặn các item còn lại.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// Mô tả item (vd. "install rust-lang.rust-analyzer", "write settings.json")
    pub item: String,
    /// Lý do thất bại
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_up_to_date_when_last_download_matches() {
        assert!(is_up_to_date(None, Some(ts(100)), ts(100)));
    }

    #[test]
    fn test_up_to_date_when_last_upload_matches() {
        assert!(is_up_to_date(Some(ts(100)), None, ts(100)));
    }

    #[test]
    fn test_stale_when_neither_matches() {
        assert!(!is_up_to_date(Some(ts(50)), Some(ts(60)), ts(100)));
    }

    #[test]
    fn test_older_remote_still_triggers_download() {
        // equality, không phải ordering: remote cũ hơn vẫn là stale
        assert!(!is_up_to_date(Some(ts(200)), Some(ts(300)), ts(100)));
    }

    #[test]
    fn test_first_download_never_skipped() {
        assert!(!is_up_to_date(None, None, ts(100)));
    }
}
