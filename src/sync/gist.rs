//! Gist client - Remote snapshot store trên GitHub Gist.
//!
//! Một snapshot = một gist, mỗi blob là một file trong gist đó.
//! PATCH của Gist API có merge semantics cộng dồn: file không có mặt
//! trong payload sẽ được giữ nguyên trên remote (không có tombstoning).

use crate::error::{SyncError, SyncResult};
use crate::files::SyncFile;
use serde::Deserialize;
use std::collections::BTreeMap;

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("settingsync/", env!("CARGO_PKG_VERSION"));

/// Snapshot đã đọc từ remote, validate tại boundary.
/// Key JSON lạ trong response bị bỏ qua thay vì báo lỗi.
#[derive(Debug, Clone, Default)]
pub struct GistSnapshot {
    pub id: String,
    pub public: bool,
    /// Login của chủ gist (None với gist anonymous)
    pub owner_login: Option<String>,
    /// Map tên blob -> nội dung
    pub files: BTreeMap<String, String>,
}

/// Contract của remote snapshot store.
/// Merge semantics: write là cộng dồn, blob cũ không bị xoá.
pub trait SnapshotStore {
    /// Tạo gist mới với toàn bộ payload (đường anonymous)
    fn create(&self, public: bool, files: &[SyncFile]) -> SyncResult<String>;

    /// Tạo gist rỗng (một blob placeholder) rồi trả về ID
    fn create_empty(&self, public: bool) -> SyncResult<String>;

    /// Đọc snapshot
    fn read(&self, gist_id: &str) -> SyncResult<GistSnapshot>;

    /// Merge các blob mới vào snapshot (read-modify-write phía server)
    fn write(&self, gist_id: &str, files: &[SyncFile]) -> SyncResult<()>;

    /// Login của user đang authenticated (None nếu không có token)
    fn authenticated_user(&self) -> SyncResult<Option<String>>;
}

/// Response structs - chỉ khai báo các field cần dùng,
/// serde bỏ qua phần còn lại
#[derive(Debug, Deserialize)]
struct GistResponse {
    id: String,
    #[serde(default)]
    public: bool,
    owner: Option<GistOwner>,
    #[serde(default)]
    files: BTreeMap<String, GistFilePayload>,
}

#[derive(Debug, Deserialize)]
struct GistOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GistFilePayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    truncated: bool,
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// Gist client dùng GitHub REST API
pub struct GistClient {
    client: reqwest::blocking::Client,
    token: Option<String>,
}

impl GistClient {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Gắn headers chuẩn của GitHub API vào request
    fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> reqwest::blocking::RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");

        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        builder
    }

    /// Payload JSON cho create/update: { "files": { name: { "content": ... } } }
    fn files_payload(files: &[SyncFile]) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for file in files {
            map.insert(
                file.gist_name.clone(),
                serde_json::json!({ "content": file.content }),
            );
        }
        serde_json::json!(map)
    }

    fn create_gist(&self, public: bool, files: &[SyncFile]) -> SyncResult<String> {
        let body = serde_json::json!({
            "description": "Editor settings synced by settingsync",
            "public": public,
            "files": Self::files_payload(files),
        });

        let response = self
            .request(reqwest::Method::POST, &format!("{}/gists", GITHUB_API))
            .json(&body)
            .send()
            .map_err(|e| SyncError::RemoteCreateFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::RemoteCreateFailed(format!(
                "GitHub API error: {}",
                response.status()
            )));
        }

        let gist: GistResponse = response
            .json()
            .map_err(|e| SyncError::RemoteCreateFailed(e.to_string()))?;

        Ok(gist.id)
    }

    /// Tải nội dung đầy đủ của blob bị Gist API truncate (> 1MB)
    fn fetch_raw(&self, raw_url: &str) -> Option<String> {
        self.request(reqwest::Method::GET, raw_url)
            .send()
            .ok()
            .filter(|r| r.status().is_success())
            .and_then(|r| r.text().ok())
    }
}

impl SnapshotStore for GistClient {
    fn create(&self, public: bool, files: &[SyncFile]) -> SyncResult<String> {
        self.create_gist(public, files)
    }

    fn create_empty(&self, public: bool) -> SyncResult<String> {
        // Gist API không cho phép gist rỗng hoàn toàn
        let placeholder = SyncFile::remote(
            crate::environment::FILE_CLOUDSETTINGS,
            "{}".to_string(),
        );
        self.create_gist(public, std::slice::from_ref(&placeholder))
    }

    fn read(&self, gist_id: &str) -> SyncResult<GistSnapshot> {
        let url = format!("{}/gists/{}", GITHUB_API, gist_id);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .map_err(|e| SyncError::RemoteReadFailed {
                id: gist_id.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SyncError::RemoteReadFailed {
                id: gist_id.to_string(),
                reason: format!("GitHub API error: {}", response.status()),
            });
        }

        let gist: GistResponse = response.json().map_err(|e| SyncError::RemoteReadFailed {
            id: gist_id.to_string(),
            reason: e.to_string(),
        })?;

        let mut files = BTreeMap::new();
        for (name, payload) in gist.files {
            let content = if payload.truncated {
                match payload.raw_url.as_deref().and_then(|u| self.fetch_raw(u)) {
                    Some(full) => full,
                    None => payload.content,
                }
            } else {
                payload.content
            };
            files.insert(name, content);
        }

        Ok(GistSnapshot {
            id: gist.id,
            public: gist.public,
            owner_login: gist.owner.map(|o| o.login),
            files,
        })
    }

    fn write(&self, gist_id: &str, files: &[SyncFile]) -> SyncResult<()> {
        let url = format!("{}/gists/{}", GITHUB_API, gist_id);
        let body = serde_json::json!({ "files": Self::files_payload(files) });

        let response = self
            .request(reqwest::Method::PATCH, &url)
            .json(&body)
            .send()
            .map_err(|e| SyncError::RemoteWriteFailed {
                id: gist_id.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SyncError::RemoteWriteFailed {
                id: gist_id.to_string(),
                reason: format!("GitHub API error: {}", response.status()),
            });
        }

        Ok(())
    }

    fn authenticated_user(&self) -> SyncResult<Option<String>> {
        if self.token.is_none() {
            return Ok(None);
        }

        let response = self
            .request(reqwest::Method::GET, &format!("{}/user", GITHUB_API))
            .send()
            .map_err(|e| SyncError::RemoteReadFailed {
                id: "user".to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(SyncError::RemoteReadFailed {
                id: "user".to_string(),
                reason: format!("GitHub API error: {}", response.status()),
            });
        }

        let user: UserResponse = response.json().map_err(|e| SyncError::RemoteReadFailed {
            id: "user".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Some(user.login))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing_ignores_unknown_keys() {
        let raw = r#"{
            "id": "abc123",
            "public": true,
            "html_url": "https://gist.github.com/abc123",
            "owner": { "login": "someone", "avatar_url": "x" },
            "files": {
                "settings.json": { "content": "{}", "size": 2, "truncated": false }
            }
        }"#;

        let gist: GistResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(gist.id, "abc123");
        assert!(gist.public);
        assert_eq!(gist.owner.unwrap().login, "someone");
        assert_eq!(gist.files["settings.json"].content, "{}");
    }

    #[test]
    fn test_files_payload_keyed_by_gist_name() {
        let files = vec![SyncFile::remote("snippets|rust.json", "{}".to_string())];
        let payload = GistClient::files_payload(&files);
        assert_eq!(payload["snippets|rust.json"]["content"], "{}");
    }
}
