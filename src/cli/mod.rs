//! CLI definitions và command implementations cho settingsync.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};

/// settingsync - Sync your editor settings across machines via GitHub Gist
#[derive(Parser)]
#[command(name = "ssync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lưu GitHub access token để upload
    Login {
        /// GitHub access token (scope: gist)
        token: String,
    },

    /// Kết nối tới một gist đã có (để download trên máy mới)
    Connect {
        /// Gist ID nhận được từ máy đã upload
        gist_id: String,
    },

    /// Upload settings, keybindings, snippets và extensions lên gist
    Upload {
        /// Tạo gist public thay vì secret
        #[arg(long)]
        public: bool,

        /// Upload bằng anonymous gist (không cần token, mỗi lần tạo gist mới)
        #[arg(long)]
        anonymous: bool,
    },

    /// Tạo gist PUBLIC mới và upload (bỏ gist hiện tại)
    Share,

    /// Download settings từ gist và áp lên máy này
    Download,

    /// Xoá toàn bộ cấu hình sync đã lưu
    Reset,

    /// Bật/tắt một flag cấu hình
    Toggle {
        /// Flag cần flip
        #[arg(value_enum)]
        flag: ToggleFlag,
    },

    /// Giữ một setting key không bị download ghi đè
    Preserve {
        /// Key trong settings.json (vd. "http.proxy")
        key: String,

        /// Giá trị muốn giữ; bỏ trống để lấy giá trị hiện tại,
        /// value rỗng nghĩa là xoá key sau mỗi lần download
        value: Option<String>,
    },

    /// Theo dõi user folder và tự động upload khi có thay đổi
    Watch,
}

/// Các flag có thể toggle
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ToggleFlag {
    /// Tự động upload khi settings thay đổi (qua `ssync watch`)
    AutoUpload,
    /// Tự động download khi khởi động
    AutoDownload,
    /// Luôn download bất kể staleness check
    ForceDownload,
    /// Ghi file summary sau upload/download
    Summary,
}
