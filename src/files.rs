//! File collector - Liệt kê và đọc/ghi các file cấu hình local.
//!
//! Mỗi file được biểu diễn bằng [`SyncFile`]: tên logic (đường dẫn tương
//! đối trong user folder), nội dung, đường dẫn tuyệt đối (nếu là file
//! local) và gist name. Gist không cho phép `/` trong tên file nên các
//! file nằm trong thư mục con (vd. snippets/rust.json) dùng ký tự `|`
//! thay cho `/` khi lên gist.

use crate::environment::GIST_PATH_SEPARATOR;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Một blob: file local hoặc một entry trong gist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFile {
    /// Tên logic - đường dẫn tương đối trong user folder (vd. "snippets/rust.json")
    pub file_name: String,
    /// Nội dung file
    pub content: String,
    /// Đường dẫn tuyệt đối nếu là file local, None nếu là blob remote
    pub file_path: Option<PathBuf>,
    /// Tên của blob trên gist (có thể khác file_name khi remap keybindings)
    pub gist_name: String,
}

impl SyncFile {
    /// Tạo SyncFile từ một file local
    pub fn local(file_name: impl Into<String>, content: String, file_path: PathBuf) -> Self {
        let file_name = file_name.into();
        let gist_name = to_gist_name(&file_name);
        Self {
            file_name,
            content,
            file_path: Some(file_path),
            gist_name,
        }
    }

    /// Tạo SyncFile từ một blob remote
    pub fn remote(gist_name: impl Into<String>, content: String) -> Self {
        let gist_name = gist_name.into();
        let file_name = from_gist_name(&gist_name);
        Self {
            file_name,
            content,
            file_path: None,
            gist_name,
        }
    }
}

/// Chuyển đường dẫn tương đối thành gist name (`/` -> `|`)
pub fn to_gist_name(file_name: &str) -> String {
    file_name.replace('/', &GIST_PATH_SEPARATOR.to_string())
}

/// Chuyển gist name về đường dẫn tương đối (`|` -> `/`)
pub fn from_gist_name(gist_name: &str) -> String {
    gist_name.replace(GIST_PATH_SEPARATOR, "/")
}

/// Kiểm tra file có tồn tại không
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// Liệt kê các file dưới `root`, giới hạn theo độ sâu.
///
/// Độ sâu 0 = file nằm trực tiếp trong root. Không đi xuống các thư mục
/// sâu hơn `max_depth` (tránh lọt vào workspace storage lồng nhau).
/// File không đọc được dưới dạng UTF-8 (binary) sẽ bị bỏ qua.
pub fn list_files(root: &Path, min_depth: usize, max_depth: usize) -> Result<Vec<SyncFile>> {
    let mut files = Vec::new();
    if root.is_dir() {
        walk(root, root, 0, min_depth, max_depth, &mut files)?;
    }
    // Thứ tự ổn định để output deterministic
    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

fn walk(
    root: &Path,
    dir: &Path,
    depth: usize,
    min_depth: usize,
    max_depth: usize,
    out: &mut Vec<SyncFile>,
) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Cannot list directory: {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if depth < max_depth {
                walk(root, &path, depth + 1, min_depth, max_depth, out)?;
            }
        } else if depth >= min_depth {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");

            // Bỏ qua file binary, chỉ sync text
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };

            out.push(SyncFile::local(relative, content, path));
        }
    }

    Ok(())
}

/// Ghi nội dung ra file
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Cannot write file: {}", path.display()))?;
    Ok(())
}

/// Tạo cây thư mục cho một file tương đối dưới `root` và trả về
/// đường dẫn tuyệt đối đã resolve
pub fn create_dir_tree(root: &Path, relative_file_name: &str) -> Result<PathBuf> {
    let path = root.join(relative_file_name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory: {}", parent.display()))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_list_files_depth_limited() -> Result<()> {
        let temp = TempDir::new()?;
        write(temp.path(), "settings.json", "{}");
        write(temp.path(), "snippets/rust.json", "{}");
        write(temp.path(), "workspaceStorage/a/b/state.json", "{}");

        let files = list_files(temp.path(), 0, 2)?;
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();

        assert!(names.contains(&"settings.json"));
        assert!(names.contains(&"snippets/rust.json"));
        // depth 3, nằm ngoài giới hạn
        assert!(!names.iter().any(|n| n.contains("state.json")));

        Ok(())
    }

    #[test]
    fn test_nested_file_gets_pipe_gist_name() -> Result<()> {
        let temp = TempDir::new()?;
        write(temp.path(), "snippets/rust.json", "{}");

        let files = list_files(temp.path(), 0, 2)?;
        let snippet = files
            .iter()
            .find(|f| f.file_name == "snippets/rust.json")
            .unwrap();
        assert_eq!(snippet.gist_name, "snippets|rust.json");

        Ok(())
    }

    #[test]
    fn test_remote_blob_maps_back_to_relative_path() {
        let file = SyncFile::remote("snippets|rust.json", "{}".to_string());
        assert_eq!(file.file_name, "snippets/rust.json");
    }

    #[test]
    fn test_create_dir_tree_makes_parents() -> Result<()> {
        let temp = TempDir::new()?;
        let path = create_dir_tree(temp.path(), "snippets/rust.json")?;
        assert!(path.parent().unwrap().is_dir());
        write_file(&path, "{}")?;
        assert!(file_exists(&path));
        Ok(())
    }
}
