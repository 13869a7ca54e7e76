//! Command implementations cho settingsync CLI.
//!
//! Các commands chính:
//! - upload/share: đẩy local state lên gist
//! - download: kéo snapshot về và reconcile
//! - watch: auto-upload khi user folder thay đổi
//!
//! Mỗi lần chạy CLI là một invocation duy nhất nên upload và download
//! không bao giờ chạy đồng thời trên cùng một máy.

use crate::cli::ToggleFlag;
use crate::config::{CustomSettings, NameValuePair, SyncConfig};
use crate::environment::Environment;
use crate::extensions::{CodeCliManager, ExtensionManager, ExtensionRecord};
use crate::files::list_files;
use crate::summary;
use crate::sync::download::{download, DownloadOutcome};
use crate::sync::gist::GistClient;
use crate::sync::upload::{upload, UploadOutcome};
use crate::sync::watcher::SettingsWatcher;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use colored::Colorize;
use std::time::Duration;

/// Lưu GitHub token vào config
pub fn login(token: String) -> Result<()> {
    let mut config = SyncConfig::load_default()?;
    config.token = Some(token);
    config.save_default().context("Cannot save sync config")?;
    println!("  {} Token saved.", "✓".green());
    Ok(())
}

/// Kết nối tới gist đã có
pub fn connect(gist_id: String) -> Result<()> {
    let mut config = SyncConfig::load_default()?;
    config.gist_id = Some(gist_id.clone());
    config.save_default().context("Cannot save sync config")?;
    println!(
        "  {} Connected to gist {}. Run {} to pull settings.",
        "✓".green(),
        gist_id.cyan(),
        "ssync download".bold()
    );
    Ok(())
}

/// Đọc danh sách extensions đã cài; nếu editor CLI không khả dụng thì
/// trả về danh sách rỗng kèm cảnh báo (sync files vẫn chạy được)
fn installed_extensions(manager: &dyn ExtensionManager) -> Vec<ExtensionRecord> {
    match manager.list_installed() {
        Ok(records) => records,
        Err(e) => {
            println!(
                "  {} Cannot list installed extensions: {}",
                "!".yellow(),
                e
            );
            Vec::new()
        }
    }
}

fn print_upload_outcome(outcome: &UploadOutcome) {
    if outcome.created_new_gist {
        println!(
            "\n{} Gist ID: {}",
            "Uploaded successfully.".green().bold(),
            outcome.gist_id.cyan().bold()
        );
        println!("Copy this ID and run `ssync connect <id>` on other machines to sync.");
    } else {
        println!("{}", "Uploaded successfully.".green().bold());
    }

    if outcome.public_gist {
        println!("The gist is public - share the ID to let others download your settings.");
    }

    println!(
        "  {} files, {} extensions in manifest",
        outcome.uploaded_files.len(),
        outcome.extensions.len()
    );
}

/// Upload toàn bộ local state lên gist
pub fn upload_settings(public: bool, anonymous: bool) -> Result<()> {
    println!("{}", "Uploading your settings to GitHub gist...".cyan());

    let env = Environment::detect()?;
    let mut config = SyncConfig::load_default()?;

    // --anonymous chỉ áp cho lần chạy này, không persist
    let stored_anonymous = config.anonymous_gist;
    if anonymous {
        config.anonymous_gist = true;
    }

    let custom = CustomSettings::load_or_create(&env.custom_settings_path())?;
    let manager = CodeCliManager::new();
    let extensions = installed_extensions(&manager);
    let local_files = list_files(&env.user_folder, 0, 2)?;
    let store = GistClient::new(config.token.clone());

    let outcome = upload(
        &env,
        &mut config,
        &custom,
        local_files,
        extensions,
        &store,
        public,
        Utc::now(),
    )?;

    config.anonymous_gist = stored_anonymous;
    config.persist_default()?;

    print_upload_outcome(&outcome);

    if config.show_summary {
        let path = env.summary_path();
        summary::write_summary(&path, &summary::render_upload_summary(&outcome))?;
        println!("  Summary written to {}", path.display().to_string().dimmed());
    }

    if config.auto_upload {
        println!(
            "  Auto-upload is on - run {} to keep watching for changes.",
            "ssync watch".bold()
        );
    }

    Ok(())
}

/// Tạo gist public mới và upload (bỏ gist hiện tại)
pub fn share_settings() -> Result<()> {
    println!(
        "{}",
        "Creating a new PUBLIC gist and uploading your settings...".cyan()
    );

    let mut config = SyncConfig::load_default()?;
    config.gist_id = None;
    config.save_default().context("Cannot save sync config")?;

    upload_settings(true, false)
}

/// Download snapshot từ gist và reconcile local state
pub fn download_settings() -> Result<()> {
    println!("{}", "Reading your settings from GitHub gist...".cyan());

    let env = Environment::detect()?;
    let mut config = SyncConfig::load_default()?;

    if !config.gist_available() {
        bail!("No gist configured. Run `ssync connect <gist-id>` first.");
    }

    let custom = CustomSettings::load_or_create(&env.custom_settings_path())?;
    let manager = CodeCliManager::new();
    let extensions = installed_extensions(&manager);
    let store = GistClient::new(config.token.clone());

    let outcome = download(&env, &mut config, &custom, extensions, &manager, &store)?;

    match outcome {
        DownloadOutcome::UpToDate => {
            println!(
                "{}",
                "You already have the latest version of your settings.".green()
            );
        }
        DownloadOutcome::Applied(report) => {
            config.persist_default()?;

            println!("{}", "Download complete.".green().bold());
            println!(
                "  {} files written, {} extensions installed, {} removed",
                report.files_written.len(),
                report.installed.len(),
                report.removed.len()
            );

            for failure in &report.failures {
                println!("  {} {}: {}", "!".yellow(), failure.item, failure.reason);
            }

            if config.show_summary {
                let path = env.summary_path();
                summary::write_summary(&path, &summary::render_download_summary(&report))?;
                println!("  Summary written to {}", path.display().to_string().dimmed());
            }

            if config.auto_upload {
                println!(
                    "  Auto-upload is on - run {} to keep watching for changes.",
                    "ssync watch".bold()
                );
            }
        }
    }

    Ok(())
}

/// Xoá toàn bộ cấu hình sync
pub fn reset_settings() -> Result<()> {
    let config = SyncConfig::default();
    config.save_default().context("Cannot save sync config")?;
    println!("  {} Sync settings cleared.", "✓".green());
    Ok(())
}

/// Flip một flag cấu hình
pub fn toggle(flag: ToggleFlag) -> Result<()> {
    let mut config = SyncConfig::load_default()?;

    let (name, value) = match flag {
        ToggleFlag::AutoUpload => {
            config.auto_upload = !config.auto_upload;
            ("auto-upload", config.auto_upload)
        }
        ToggleFlag::AutoDownload => {
            config.auto_download = !config.auto_download;
            ("auto-download", config.auto_download)
        }
        ToggleFlag::ForceDownload => {
            config.force_download = !config.force_download;
            ("force-download", config.force_download)
        }
        ToggleFlag::Summary => {
            config.show_summary = !config.show_summary;
            ("summary", config.show_summary)
        }
    };

    config.save_default().context("Cannot save sync config")?;

    let state = if value { "ON".green() } else { "OFF".yellow() };
    println!("  {} {} turned {}.", "✓".green(), name, state.bold());
    Ok(())
}

/// Đọc giá trị hiện tại của một key trong settings.json (dạng string)
fn current_setting_value(env: &Environment, key: &str) -> String {
    let path = env.settings_path();
    let Ok(content) = std::fs::read_to_string(&path) else {
        return String::new();
    };
    let Ok(settings) = serde_json::from_str::<serde_json::Value>(&content) else {
        return String::new();
    };

    match settings.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Đánh dấu một setting key để giữ nguyên qua các lần download
pub fn preserve(key: String, value: Option<String>) -> Result<()> {
    let env = Environment::detect()?;
    let path = env.custom_settings_path();
    let mut custom = CustomSettings::load_or_create(&path)?;

    let value = value.unwrap_or_else(|| current_setting_value(&env, &key));

    // Key đã có rule thì thay thế thay vì thêm trùng
    custom.replace_code_settings.retain(|p| p.name != key);
    custom
        .replace_code_settings
        .push(NameValuePair::new(key.clone(), value.clone()));
    custom.save(&path)?;

    if value.is_empty() {
        println!(
            "  {} {} will be removed from settings.json after every download.",
            "✓".green(),
            key.cyan()
        );
    } else {
        println!(
            "  {} {} = {} will be kept in settings.json after every download.",
            "✓".green(),
            key.cyan(),
            value
        );
    }

    Ok(())
}

/// Theo dõi user folder và tự động upload khi có thay đổi
pub fn watch() -> Result<()> {
    let env = Environment::detect()?;
    let config = SyncConfig::load_default()?;

    if !config.anonymous_gist && !config.token_available() {
        bail!("No token configured. Run `ssync login <token>` first.");
    }

    let watcher =
        SettingsWatcher::new(&env.user_folder).context("Cannot watch editor user folder")?;

    println!(
        "{} {}",
        "Watching for changes in".cyan(),
        watcher.watched_root().display()
    );
    println!("Press Ctrl-C to stop.");

    loop {
        if watcher.wait_for_change(Duration::from_secs(1)) {
            // Debounce: gom các thay đổi liên tiếp vào một lần upload
            std::thread::sleep(Duration::from_secs(2));
            watcher.drain_pending();

            println!("\n{}", "Change detected - uploading...".cyan());
            if let Err(e) = upload_settings(false, false) {
                println!("  {} Upload failed: {:#}", "!".red(), e);
            }
            // Thay đổi do chính upload gây ra (summary file) không trigger tiếp
            watcher.drain_pending();
        }
    }
}
