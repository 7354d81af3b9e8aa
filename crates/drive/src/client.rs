//! Microsoft Graph implementation of [`DocumentStore`].
//!
//! All item calls address one drive (document library) of one SharePoint
//! site. The drive is discovered lazily on first use.

use std::time::Duration;

use regex::{Regex, RegexBuilder};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use vox_protocol::drive::{
    Collection, CreateFolderRequest, CreateUploadSessionRequest, Drive, Site, UploadSessionItem,
    UploadStatusBody,
};
use vox_protocol::{ChunkAck, ConflictBehavior, DriveItem, FolderHandle, ResumableSession};
use vox_transfer::ChunkState;

use crate::auth::{Credentials, TokenProvider};
use crate::error::StoreError;
use crate::path::{encode_path, encode_segment};
use crate::store::{DocumentStore, StoreFuture};

const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
const ITEM_SELECT: &str = "id,name,size,webUrl,folder,file,createdDateTime";
const PAGE_SIZE: u32 = 999;

/// Site and transport settings for [`GraphStore`].
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Site path as Graph addresses it, e.g. `contoso.sharepoint.com:/sites/Vox`.
    pub site: String,
    /// Case-insensitive pattern picking the drive; the first drive otherwise.
    pub drive_pattern: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            site: String::new(),
            drive_pattern: "documents".into(),
            timeout: Duration::from_secs(300),
        }
    }
}

enum Auth {
    Static(String),
    Provider(TokenProvider),
}

/// Graph drive client.
pub struct GraphStore {
    http: reqwest::Client,
    auth: Auth,
    base_url: String,
    site: String,
    drive_pattern: Regex,
    drive_id: OnceCell<String>,
}

impl GraphStore {
    /// Creates a client that authenticates with app credentials.
    pub fn new(credentials: Credentials, config: &GraphConfig) -> Result<Self, StoreError> {
        let http = build_http(config)?;
        let provider = TokenProvider::new(http.clone(), credentials);
        Self::build(http, Auth::Provider(provider), config)
    }

    /// Creates a client that sends a pre-acquired bearer token.
    pub fn with_token(token: impl Into<String>, config: &GraphConfig) -> Result<Self, StoreError> {
        let http = build_http(config)?;
        Self::build(http, Auth::Static(token.into()), config)
    }

    fn build(http: reqwest::Client, auth: Auth, config: &GraphConfig) -> Result<Self, StoreError> {
        let drive_pattern = RegexBuilder::new(&config.drive_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| StoreError::Config(format!("drive pattern: {e}")))?;
        Ok(Self {
            http,
            auth,
            base_url: DEFAULT_GRAPH_URL.to_string(),
            site: config.site.clone(),
            drive_pattern,
            drive_id: OnceCell::new(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Skips drive discovery (for testing).
    #[cfg(test)]
    pub(crate) fn with_drive_id(mut self, id: &str) -> Self {
        self.drive_id = OnceCell::new_with(Some(id.to_string()));
        self
    }

    async fn bearer(&self) -> Result<String, StoreError> {
        match &self.auth {
            Auth::Static(token) => Ok(token.clone()),
            Auth::Provider(provider) => provider.token().await,
        }
    }

    /// Adds the bearer token and sends the request.
    async fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.bearer().await?;
        Ok(req.bearer_auth(token).send().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, StoreError> {
        let resp = check(self.send(self.http.get(url)).await?).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn drive_id(&self) -> Result<&str, StoreError> {
        self.drive_id
            .get_or_try_init(|| self.discover_drive())
            .await
            .map(String::as_str)
    }

    async fn discover_drive(&self) -> Result<String, StoreError> {
        if self.site.is_empty() {
            return Err(StoreError::Config("site path is not set".into()));
        }
        let site: Site = self
            .get_json(&format!("{}/sites/{}", self.base_url, self.site))
            .await?;
        let drives: Collection<Drive> = self
            .get_json(&format!("{}/sites/{}/drives", self.base_url, site.id))
            .await?;

        let drive = drives
            .value
            .iter()
            .find(|d| self.drive_pattern.is_match(&d.name))
            .or_else(|| drives.value.first())
            .ok_or_else(|| StoreError::NoDrive(self.site.clone()))?;

        info!(site = %site.id, drive = %drive.name, "document library resolved");
        Ok(drive.id.clone())
    }

    async fn drive_url(&self) -> Result<String, StoreError> {
        let drive_id = self.drive_id().await?;
        Ok(format!("{}/drives/{}", self.base_url, drive_id))
    }

    async fn lookup_impl(
        &self,
        parent: &FolderHandle,
        name: &str,
    ) -> Result<Option<DriveItem>, StoreError> {
        let url = format!(
            "{}/items/{}:/{}",
            self.drive_url().await?,
            parent.id(),
            encode_segment(name)
        );
        debug!(parent = %parent, name, "lookup");
        found(self.get_json(&url).await)
    }

    async fn create_folder_impl(
        &self,
        parent: &FolderHandle,
        name: &str,
        conflict: ConflictBehavior,
    ) -> Result<DriveItem, StoreError> {
        let url = format!("{}/items/{}/children", self.drive_url().await?, parent.id());
        let body = CreateFolderRequest::new(name, conflict);
        debug!(parent = %parent, name, %conflict, "create folder");
        let resp = check(self.send(self.http.post(&url).json(&body)).await?).await?;
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }

    async fn create_upload_session_impl(
        &self,
        parent: &FolderHandle,
        file_name: &str,
        file_size: Option<u64>,
        conflict: ConflictBehavior,
    ) -> Result<ResumableSession, StoreError> {
        let url = format!(
            "{}/items/{}:/{}:/createUploadSession",
            self.drive_url().await?,
            parent.id(),
            encode_segment(file_name)
        );
        let body = CreateUploadSessionRequest {
            item: UploadSessionItem {
                conflict_behavior: conflict,
                name: file_name.to_string(),
                file_size,
            },
        };
        debug!(parent = %parent, file_name, ?file_size, "create upload session");
        let resp = check(self.send(self.http.post(&url).json(&body)).await?).await?;
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }

    async fn put_chunk_impl(
        &self,
        upload_url: &str,
        range: ChunkState,
        data: Vec<u8>,
    ) -> Result<ChunkAck, StoreError> {
        // The session URL is pre-authenticated; no bearer token.
        let resp = self
            .http
            .put(upload_url)
            .header(CONTENT_LENGTH, range.length)
            .header(CONTENT_RANGE, range.content_range())
            .body(data)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;

        match status {
            202 => {
                let progress: UploadStatusBody = serde_json::from_slice(&body).unwrap_or_default();
                Ok(ChunkAck::Accepted {
                    next_expected_ranges: progress.next_expected_ranges,
                })
            }
            200 | 201 => Ok(ChunkAck::Completed {
                item: serde_json::from_slice(&body).ok(),
            }),
            _ => Err(StoreError::from_response(
                status,
                &String::from_utf8_lossy(&body),
            )),
        }
    }

    async fn item_by_path_impl(&self, path: &[String]) -> Result<Option<DriveItem>, StoreError> {
        let drive_url = self.drive_url().await?;
        let url = if path.is_empty() {
            format!("{drive_url}/root")
        } else {
            format!("{drive_url}/root:/{}", encode_path(path))
        };
        found(self.get_json(&url).await)
    }

    async fn list_children_impl(&self, folder: &FolderHandle) -> Result<Vec<DriveItem>, StoreError> {
        let mut url = format!(
            "{}/items/{}/children?$select={ITEM_SELECT}&$top={PAGE_SIZE}",
            self.drive_url().await?,
            folder.id()
        );
        let mut items = Vec::new();
        loop {
            let page: Collection<DriveItem> = self.get_json(&url).await?;
            items.extend(page.value);
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }
        debug!(folder = %folder, count = items.len(), "listed children");
        Ok(items)
    }

    async fn delete_item_impl(&self, item_id: &str) -> Result<(), StoreError> {
        let url = format!("{}/items/{}", self.drive_url().await?, encode_segment(item_id));
        check(self.send(self.http.delete(&url)).await?).await?;
        debug!(item_id, "item deleted");
        Ok(())
    }

    async fn read_content_impl(&self, path: &[String]) -> Result<Vec<u8>, StoreError> {
        let url = format!("{}/root:/{}:/content", self.drive_url().await?, encode_path(path));
        let resp = check(self.send(self.http.get(&url)).await?).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn write_content_impl(
        &self,
        parent: &FolderHandle,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<DriveItem, StoreError> {
        let url = format!(
            "{}/items/{}:/{}:/content",
            self.drive_url().await?,
            parent.id(),
            encode_segment(name)
        );
        let size = data.len();
        let req = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, content_type)
            .body(data);
        let resp = check(self.send(req).await?).await?;
        debug!(parent = %parent, name, size, "content written");
        Ok(serde_json::from_slice(&resp.bytes().await?)?)
    }
}

impl DocumentStore for GraphStore {
    fn lookup<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
    ) -> StoreFuture<'a, Option<DriveItem>> {
        Box::pin(self.lookup_impl(parent, name))
    }

    fn create_folder<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'a, DriveItem> {
        Box::pin(self.create_folder_impl(parent, name, conflict))
    }

    fn create_upload_session<'a>(
        &'a self,
        parent: &'a FolderHandle,
        file_name: &'a str,
        file_size: Option<u64>,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'a, ResumableSession> {
        Box::pin(self.create_upload_session_impl(parent, file_name, file_size, conflict))
    }

    fn put_chunk<'a>(
        &'a self,
        upload_url: &'a str,
        range: ChunkState,
        data: Vec<u8>,
    ) -> StoreFuture<'a, ChunkAck> {
        Box::pin(self.put_chunk_impl(upload_url, range, data))
    }

    fn item_by_path<'a>(&'a self, path: &'a [String]) -> StoreFuture<'a, Option<DriveItem>> {
        Box::pin(self.item_by_path_impl(path))
    }

    fn list_children<'a>(&'a self, folder: &'a FolderHandle) -> StoreFuture<'a, Vec<DriveItem>> {
        Box::pin(self.list_children_impl(folder))
    }

    fn delete_item<'a>(&'a self, item_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(self.delete_item_impl(item_id))
    }

    fn read_content<'a>(&'a self, path: &'a [String]) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(self.read_content_impl(path))
    }

    fn write_content<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
        data: Vec<u8>,
        content_type: &'a str,
    ) -> StoreFuture<'a, DriveItem> {
        Box::pin(self.write_content_impl(parent, name, data, content_type))
    }
}

fn build_http(config: &GraphConfig) -> Result<reqwest::Client, StoreError> {
    Ok(reqwest::Client::builder().timeout(config.timeout).build()?)
}

/// Passes successful responses through; maps the rest to [`StoreError`].
async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::from_response(status.as_u16(), &body))
}

/// Turns [`StoreError::NotFound`] into `Ok(None)`.
fn found<T>(result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;

    fn store(server: &MockServer) -> GraphStore {
        GraphStore::with_token("test-token", &GraphConfig::default())
            .unwrap()
            .with_base_url(server.url.clone())
            .with_drive_id("d1")
    }

    const FOLDER: &str = r#"{"id":"F1","name":"acme","folder":{"childCount":0}}"#;

    #[tokio::test]
    async fn lookup_found() {
        let server = MockServer::start(vec![(200, FOLDER)]).await;
        let item = store(&server)
            .lookup(&FolderHandle::root(), "acme")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.id, "F1");
        assert!(item.is_folder());

        let req = &server.requests()[0];
        assert_eq!(req.method, "GET");
        assert_eq!(req.target, "/drives/d1/items/root:/acme");
        assert_eq!(req.header("authorization"), Some("Bearer test-token"));
    }

    #[tokio::test]
    async fn lookup_missing_is_none() {
        let server = MockServer::start(vec![(
            404,
            r#"{"error":{"code":"itemNotFound","message":"not found"}}"#,
        )])
        .await;
        let item = store(&server)
            .lookup(&FolderHandle::new("P1"), "stage 2")
            .await
            .unwrap();
        assert!(item.is_none());
        assert_eq!(server.requests()[0].target, "/drives/d1/items/P1:/stage%202");
    }

    #[tokio::test]
    async fn lookup_other_error_propagates() {
        let server = MockServer::start(vec![(
            403,
            r#"{"error":{"code":"accessDenied","message":"denied"}}"#,
        )])
        .await;
        let err = store(&server)
            .lookup(&FolderHandle::root(), "acme")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn create_folder_sends_fail_policy() {
        let server = MockServer::start(vec![(201, FOLDER)]).await;
        let item = store(&server)
            .create_folder(&FolderHandle::root(), "acme", ConflictBehavior::Fail)
            .await
            .unwrap();
        assert_eq!(item.name, "acme");

        let req = &server.requests()[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.target, "/drives/d1/items/root/children");
        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body["name"], "acme");
        assert_eq!(body["folder"], serde_json::json!({}));
        assert_eq!(body["@microsoft.graph.conflictBehavior"], "fail");
    }

    #[tokio::test]
    async fn create_folder_conflict() {
        let server = MockServer::start(vec![(
            409,
            r#"{"error":{"code":"nameAlreadyExists","message":"exists"}}"#,
        )])
        .await;
        let err = store(&server)
            .create_folder(&FolderHandle::root(), "acme", ConflictBehavior::Fail)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn create_upload_session_returns_target() {
        let server = MockServer::start(vec![(
            200,
            r#"{"uploadUrl":"https://up.example/s1","expirationDateTime":"2030-01-01T00:00:00Z","nextExpectedRanges":["0-"]}"#,
        )])
        .await;
        let session = store(&server)
            .create_upload_session(
                &FolderHandle::new("V1"),
                "take 1.mp4",
                Some(12),
                ConflictBehavior::Replace,
            )
            .await
            .unwrap();
        assert_eq!(session.upload_url, "https://up.example/s1");

        let req = &server.requests()[0];
        assert_eq!(
            req.target,
            "/drives/d1/items/V1:/take%201.mp4:/createUploadSession"
        );
        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body["item"]["name"], "take 1.mp4");
        assert_eq!(body["item"]["fileSize"], 12);
        assert_eq!(body["item"]["@microsoft.graph.conflictBehavior"], "replace");
    }

    #[tokio::test]
    async fn put_chunk_accepted_without_bearer() {
        let server = MockServer::start(vec![(
            202,
            r#"{"nextExpectedRanges":["4-"],"expirationDateTime":"2030-01-01T00:00:00Z"}"#,
        )])
        .await;
        let upload_url = format!("{}/up/s1", server.url);
        let range = ChunkState {
            offset: 0,
            length: 4,
            total_size: 10,
        };
        let ack = store(&server)
            .put_chunk(&upload_url, range, b"AABB".to_vec())
            .await
            .unwrap();
        assert_eq!(
            ack,
            ChunkAck::Accepted {
                next_expected_ranges: vec!["4-".into()]
            }
        );

        let req = &server.requests()[0];
        assert_eq!(req.method, "PUT");
        assert_eq!(req.target, "/up/s1");
        assert_eq!(req.header("content-range"), Some("bytes 0-3/10"));
        assert_eq!(req.header("content-length"), Some("4"));
        assert!(req.header("authorization").is_none());
        assert_eq!(req.body, b"AABB");
    }

    #[tokio::test]
    async fn put_chunk_completed() {
        let server = MockServer::start(vec![(
            201,
            r#"{"id":"I9","name":"cut.mp4","size":10,"file":{"mimeType":"video/mp4"}}"#,
        )])
        .await;
        let upload_url = format!("{}/up/s1", server.url);
        let range = ChunkState {
            offset: 8,
            length: 2,
            total_size: 10,
        };
        let ack = store(&server)
            .put_chunk(&upload_url, range, b"EE".to_vec())
            .await
            .unwrap();
        match ack {
            ChunkAck::Completed { item } => assert_eq!(item.unwrap().id, "I9"),
            other => panic!("unexpected ack: {other:?}"),
        }
    }

    #[tokio::test]
    async fn put_chunk_failure_carries_status() {
        let server = MockServer::start(vec![(
            500,
            r#"{"error":{"code":"generalException","message":"boom"}}"#,
        )])
        .await;
        let upload_url = format!("{}/up/s1", server.url);
        let range = ChunkState {
            offset: 0,
            length: 1,
            total_size: 1,
        };
        let err = store(&server)
            .put_chunk(&upload_url, range, vec![0])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn list_children_follows_next_link() {
        let server = MockServer::start(vec![
            (
                200,
                r#"{"value":[{"id":"1","name":"a.mp4","file":{}}],"@odata.nextLink":"{base}/page2"}"#,
            ),
            (200, r#"{"value":[{"id":"2","name":"b.mp4","file":{}}]}"#),
        ])
        .await;
        let items = store(&server)
            .list_children(&FolderHandle::new("V1"))
            .await
            .unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);

        let requests = server.requests();
        assert!(requests[0].target.starts_with("/drives/d1/items/V1/children?"));
        assert!(requests[0].target.contains("$top=999"));
        assert_eq!(requests[1].target, "/page2");
    }

    #[tokio::test]
    async fn item_by_path_encodes_segments() {
        let server = MockServer::start(vec![(200, FOLDER)]).await;
        let path = vec!["acme co".to_string(), "stage1".to_string()];
        let item = store(&server).item_by_path(&path).await.unwrap();
        assert!(item.is_some());
        assert_eq!(
            server.requests()[0].target,
            "/drives/d1/root:/acme%20co/stage1"
        );
    }

    #[tokio::test]
    async fn delete_item() {
        let server = MockServer::start(vec![(204, "")]).await;
        store(&server).delete_item("I9").await.unwrap();
        let req = &server.requests()[0];
        assert_eq!(req.method, "DELETE");
        assert_eq!(req.target, "/drives/d1/items/I9");
    }

    #[tokio::test]
    async fn read_and_write_content() {
        let server = MockServer::start(vec![
            (200, r#"{"stages":[]}"#),
            (201, r#"{"id":"S1","name":"status.json","file":{}}"#),
        ])
        .await;
        let store = store(&server);
        let path = vec!["acme".to_string(), "status.json".to_string()];
        let bytes = store.read_content(&path).await.unwrap();
        assert_eq!(bytes, br#"{"stages":[]}"#);

        let item = store
            .write_content(
                &FolderHandle::new("P1"),
                "status.json",
                b"{}".to_vec(),
                "application/json",
            )
            .await
            .unwrap();
        assert_eq!(item.id, "S1");

        let requests = server.requests();
        assert_eq!(requests[0].target, "/drives/d1/root:/acme/status.json:/content");
        assert_eq!(requests[1].method, "PUT");
        assert_eq!(requests[1].target, "/drives/d1/items/P1:/status.json:/content");
        assert_eq!(requests[1].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn discovers_documents_drive() {
        let server = MockServer::start(vec![
            (200, r#"{"id":"site-1","displayName":"Vox"}"#),
            (
                200,
                r#"{"value":[{"id":"d-assets","name":"Assets"},{"id":"d-docs","name":"Shared Documents"}]}"#,
            ),
            (200, FOLDER),
        ])
        .await;
        let config = GraphConfig {
            site: "contoso.sharepoint.com:/sites/Vox".into(),
            ..GraphConfig::default()
        };
        let store = GraphStore::with_token("t", &config)
            .unwrap()
            .with_base_url(server.url.clone());
        store.lookup(&FolderHandle::root(), "acme").await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].target, "/sites/contoso.sharepoint.com:/sites/Vox");
        assert_eq!(requests[1].target, "/sites/site-1/drives");
        assert_eq!(requests[2].target, "/drives/d-docs/items/root:/acme");
    }

    #[tokio::test]
    async fn falls_back_to_first_drive() {
        let server = MockServer::start(vec![
            (200, r#"{"id":"site-1"}"#),
            (200, r#"{"value":[{"id":"d-a","name":"Assets"},{"id":"d-b","name":"Media"}]}"#),
            (200, FOLDER),
        ])
        .await;
        let config = GraphConfig {
            site: "contoso.sharepoint.com:/sites/Vox".into(),
            ..GraphConfig::default()
        };
        let store = GraphStore::with_token("t", &config)
            .unwrap()
            .with_base_url(server.url.clone());
        store.lookup(&FolderHandle::root(), "acme").await.unwrap();
        assert_eq!(server.requests()[2].target, "/drives/d-a/items/root:/acme");
    }

    #[tokio::test]
    async fn site_without_drives() {
        let server = MockServer::start(vec![
            (200, r#"{"id":"site-1"}"#),
            (200, r#"{"value":[]}"#),
        ])
        .await;
        let config = GraphConfig {
            site: "contoso.sharepoint.com:/sites/Empty".into(),
            ..GraphConfig::default()
        };
        let store = GraphStore::with_token("t", &config)
            .unwrap()
            .with_base_url(server.url.clone());
        let err = store
            .lookup(&FolderHandle::root(), "acme")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoDrive(_)));
    }

    #[test]
    fn invalid_drive_pattern() {
        let config = GraphConfig {
            drive_pattern: "(".into(),
            ..GraphConfig::default()
        };
        assert!(matches!(
            GraphStore::with_token("t", &config),
            Err(StoreError::Config(_))
        ));
    }
}
