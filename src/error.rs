//! Error taxonomy cho sync engine.
//!
//! Các lỗi fatal (abort operation, không persist config) được phân loại
//! ở đây. Lỗi per-item (một extension cài thất bại, một file ghi thất bại)
//! KHÔNG nằm trong enum này - chúng được collect vào báo cáo batch và
//! không làm dừng các item khác.

use thiserror::Error;

/// Lỗi fatal của một lần upload/download
#[derive(Debug, Error)]
pub enum SyncError {
    /// Chưa có token mà cũng không bật anonymous mode
    #[error("no access token configured; set a token or enable anonymous mode")]
    CredentialMissing,

    /// Không tạo được gist mới
    #[error("unable to create gist: {0}")]
    RemoteCreateFailed(String),

    /// Không đọc được gist
    #[error("unable to read gist {id}: {reason}")]
    RemoteReadFailed { id: String, reason: String },

    /// Không ghi được gist
    #[error("unable to save gist {id}: {reason}")]
    RemoteWriteFailed { id: String, reason: String },

    /// Gist thuộc về user khác - không bao giờ retry
    #[error("gist {id} belongs to user {owner}; refusing to overwrite")]
    OwnershipMismatch { id: String, owner: String },

    /// Không lưu được sync config xuống disk
    #[error("unable to persist sync configuration: {0}")]
    LocalPersistFailed(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
