//! File watcher - Theo dõi thay đổi trong user folder cho auto-upload.
//!
//! Sử dụng `notify` crate để emit events khi file cấu hình thay đổi.
//! Watcher dừng theo kiểu cooperative: drop struct là đủ, không có
//! rollback đảm bảo cho upload đang dở.

use crate::environment::{FILE_CUSTOMIZED_SETTINGS, FILE_SUMMARY};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

/// Watcher theo dõi user folder của editor
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<Result<Event, notify::Error>>,
    root: PathBuf,
}

impl SettingsWatcher {
    /// Tạo watcher mới cho user folder
    pub fn new(root: &Path) -> notify::Result<Self> {
        let (tx, rx) = channel();

        // Poll interval 2 giây để tránh spam events
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            root: root.to_path_buf(),
        })
    }

    /// Event này có đáng trigger upload không.
    /// File summary và file custom rules không được upload nên thay đổi
    /// của chúng không trigger gì cả.
    fn is_relevant(event: &Event) -> bool {
        let is_change = matches!(
            event.kind,
            notify::EventKind::Modify(_)
                | notify::EventKind::Create(_)
                | notify::EventKind::Remove(_)
        );
        if !is_change {
            return false;
        }

        !event.paths.iter().all(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            name == FILE_SUMMARY || name == FILE_CUSTOMIZED_SETTINGS
        })
    }

    /// Block chờ cho đến khi có thay đổi hoặc hết timeout.
    /// Trả về true nếu có thay đổi cần upload.
    pub fn wait_for_change(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(event)) => Self::is_relevant(&event),
            _ => false,
        }
    }

    /// Drain các events còn đọng lại (sau một lần upload, thay đổi do
    /// chính upload gây ra không được trigger tiếp)
    pub fn drain_pending(&self) {
        while self.receiver.try_recv().is_ok() {}
    }

    /// Đường dẫn đang được watch
    pub fn watched_root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{EventKind, ModifyKind};

    fn modify_event(paths: Vec<PathBuf>) -> Event {
        let mut event = Event::new(EventKind::Modify(ModifyKind::Any));
        for path in paths {
            event = event.add_path(path);
        }
        event
    }

    #[test]
    fn test_settings_change_is_relevant() {
        let event = modify_event(vec![PathBuf::from("/user/settings.json")]);
        assert!(SettingsWatcher::is_relevant(&event));
    }

    #[test]
    fn test_summary_and_custom_rules_changes_ignored() {
        let event = modify_event(vec![PathBuf::from("/user/syncSummary.txt")]);
        assert!(!SettingsWatcher::is_relevant(&event));

        let event = modify_event(vec![PathBuf::from("/user/syncLocalSettings.json")]);
        assert!(!SettingsWatcher::is_relevant(&event));
    }

    #[test]
    fn test_watched_root_reports_user_folder() -> notify::Result<()> {
        let temp = tempfile::TempDir::new().unwrap();
        let watcher = SettingsWatcher::new(temp.path())?;
        assert_eq!(watcher.watched_root(), temp.path());
        Ok(())
    }

    #[test]
    fn test_access_events_ignored() {
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/user/settings.json"));
        assert!(!SettingsWatcher::is_relevant(&event));
    }
}
