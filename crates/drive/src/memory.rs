//! In-memory [`DocumentStore`] for tests.
//!
//! Behaves like the Graph drive for the calls the pipeline makes: folders are
//! unique per parent, upload sessions accept only the next expected byte
//! range and finish when the declared size has arrived. Failures and races
//! can be scripted, and every call is recorded.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use vox_protocol::{
    ChunkAck, ConflictBehavior, DriveItem, FileFacet, FolderFacet, FolderHandle, ResumableSession,
};
use vox_transfer::ChunkState;

use crate::error::StoreError;
use crate::store::{DocumentStore, StoreFuture};

const ROOT_ID: &str = "root";

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Lookup { parent: String, name: String },
    CreateFolder { parent: String, name: String },
    CreateSession { parent: String, file_name: String },
    PutChunk { offset: u64, end: u64, total: u64 },
    ItemByPath { path: String },
    ListChildren { folder: String },
    Delete { item_id: String },
    Read { path: String },
    Write { parent: String, name: String },
}

struct Node {
    parent: String,
    item: DriveItem,
    content: Vec<u8>,
}

struct Session {
    parent: String,
    name: String,
    total: u64,
    received: Vec<u8>,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    nodes: HashMap<String, Node>,
    sessions: HashMap<String, Session>,
    next_id: u64,
    calls: Vec<StoreCall>,
    puts: usize,
    chunk_failures: HashMap<usize, StoreError>,
    expire_after_put: Option<usize>,
    session_rejection: Option<StoreError>,
    create_failures: HashMap<String, StoreError>,
    racers: Vec<String>,
}

impl State {
    fn mint_id(&mut self) -> String {
        self.next_id += 1;
        format!("item-{}", self.next_id)
    }

    fn child(&self, parent: &str, name: &str) -> Option<&Node> {
        self.nodes
            .values()
            .find(|n| n.parent == parent && n.item.name == name)
    }

    fn parent_exists(&self, parent: &str) -> bool {
        parent == ROOT_ID || self.nodes.get(parent).is_some_and(|n| n.item.is_folder())
    }

    fn insert_folder(&mut self, parent: &str, name: &str) -> DriveItem {
        let id = self.mint_id();
        let item = DriveItem {
            id: id.clone(),
            name: name.to_string(),
            size: 0,
            web_url: Some(format!("memory://{id}")),
            folder: Some(FolderFacet::default()),
            file: None,
            created_date_time: Some(Utc::now()),
        };
        self.nodes.insert(
            id,
            Node {
                parent: parent.to_string(),
                item: item.clone(),
                content: Vec::new(),
            },
        );
        item
    }

    fn insert_file(&mut self, parent: &str, name: &str, content: Vec<u8>, mime: &str) -> DriveItem {
        if let Some(existing) = self.child(parent, name).map(|n| n.item.id.clone()) {
            self.nodes.remove(&existing);
        }
        let id = self.mint_id();
        let item = DriveItem {
            id: id.clone(),
            name: name.to_string(),
            size: content.len() as u64,
            web_url: Some(format!("memory://{id}")),
            folder: None,
            file: Some(FileFacet {
                mime_type: Some(mime.to_string()),
            }),
            created_date_time: Some(Utc::now()),
        };
        self.nodes.insert(
            id,
            Node {
                parent: parent.to_string(),
                item: item.clone(),
                content,
            },
        );
        item
    }

    fn resolve_path(&self, path: &[String]) -> Option<&Node> {
        let mut parent = ROOT_ID.to_string();
        let mut found = None;
        for segment in path {
            let node = self.child(&parent, segment)?;
            parent = node.item.id.clone();
            found = Some(node);
        }
        found
    }

    fn remove_tree(&mut self, id: &str) {
        let children: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parent == id)
            .map(|(k, _)| k.clone())
            .collect();
        for child in children {
            self.remove_tree(&child);
        }
        self.nodes.remove(id);
    }
}

/// Thread-safe in-memory document library.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn not_found(what: &str) -> StoreError {
    StoreError::NotFound(format!("{what} not found"))
}

fn mime_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "mp4" => "video/mp4",
        Some(ext) if ext == "wav" => "audio/wav",
        Some(ext) if ext == "mp3" => "audio/mpeg",
        Some(ext) if ext == "txt" => "text/plain",
        Some(ext) if ext == "json" => "application/json",
        _ => "application/octet-stream",
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- Seeding ---------------------------------------------------------

    /// Creates a folder directly, bypassing call recording.
    pub fn seed_folder(&self, parent: &FolderHandle, name: &str) -> FolderHandle {
        let item = self.lock().insert_folder(parent.id(), name);
        FolderHandle::from(&item)
    }

    /// Creates every folder of `path` that is missing; returns the last one.
    pub fn seed_path(&self, path: &[&str]) -> FolderHandle {
        let mut parent = FolderHandle::root();
        for segment in path {
            let existing = self
                .lock()
                .child(parent.id(), segment)
                .map(|n| FolderHandle::from(&n.item));
            parent = match existing {
                Some(handle) => handle,
                None => self.seed_folder(&parent, segment),
            };
        }
        parent
    }

    /// Creates a file directly, bypassing call recording.
    pub fn seed_file(&self, parent: &FolderHandle, name: &str, content: &[u8]) -> DriveItem {
        self.lock()
            .insert_file(parent.id(), name, content.to_vec(), mime_for(name))
    }

    // -- Scripting -------------------------------------------------------

    /// Fails the `index`-th chunk PUT (0-based) with `error`.
    pub fn fail_chunk(&self, index: usize, error: StoreError) {
        self.lock().chunk_failures.insert(index, error);
    }

    /// Expires every open session once the `index`-th PUT was acknowledged.
    pub fn expire_after_chunk(&self, index: usize) {
        self.lock().expire_after_put = Some(index);
    }

    /// Rejects the next upload-session request with `error`.
    pub fn reject_next_session(&self, error: StoreError) {
        self.lock().session_rejection = Some(error);
    }

    /// Fails the next create of folder `name` with `error`.
    pub fn fail_create(&self, name: &str, error: StoreError) {
        self.lock().create_failures.insert(name.to_string(), error);
    }

    /// Makes a concurrent caller win the next create of `name`: the folder
    /// appears and the create answers with a conflict.
    pub fn race_create(&self, name: &str) {
        self.lock().racers.push(name.to_string());
    }

    // -- Inspection ------------------------------------------------------

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of create-folder calls made.
    pub fn create_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, StoreCall::CreateFolder { .. }))
            .count()
    }

    /// `[offset, end)` of every chunk PUT, in order.
    pub fn put_ranges(&self) -> Vec<(u64, u64)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                StoreCall::PutChunk { offset, end, .. } => Some((*offset, *end)),
                _ => None,
            })
            .collect()
    }

    /// Number of folders named `name` under `parent`.
    pub fn folder_count(&self, parent: &FolderHandle, name: &str) -> usize {
        self.lock()
            .nodes
            .values()
            .filter(|n| n.parent == parent.id() && n.item.name == name && n.item.is_folder())
            .count()
    }

    /// Content of the file at `path`, if any.
    pub fn file_content(&self, path: &[&str]) -> Option<Vec<u8>> {
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        let state = self.lock();
        state
            .resolve_path(&path)
            .filter(|n| n.item.is_file())
            .map(|n| n.content.clone())
    }

    // -- Operations ------------------------------------------------------

    fn lookup_now(&self, parent: &FolderHandle, name: &str) -> Result<Option<DriveItem>, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Lookup {
            parent: parent.id().to_string(),
            name: name.to_string(),
        });
        if !state.parent_exists(parent.id()) {
            return Err(not_found("parent"));
        }
        Ok(state.child(parent.id(), name).map(|n| n.item.clone()))
    }

    fn create_folder_now(
        &self,
        parent: &FolderHandle,
        name: &str,
        conflict: ConflictBehavior,
    ) -> Result<DriveItem, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::CreateFolder {
            parent: parent.id().to_string(),
            name: name.to_string(),
        });
        if let Some(err) = state.create_failures.remove(name) {
            return Err(err);
        }
        if !state.parent_exists(parent.id()) {
            return Err(not_found("parent"));
        }
        if let Some(pos) = state.racers.iter().position(|r| r == name) {
            state.racers.remove(pos);
            if state.child(parent.id(), name).is_none() {
                state.insert_folder(parent.id(), name);
            }
        }
        match state.child(parent.id(), name).map(|n| n.item.clone()) {
            None => Ok(state.insert_folder(parent.id(), name)),
            Some(existing) => match conflict {
                ConflictBehavior::Fail => Err(StoreError::Conflict(format!(
                    "an item named {name:?} already exists"
                ))),
                ConflictBehavior::Replace => {
                    state.remove_tree(&existing.id);
                    Ok(state.insert_folder(parent.id(), name))
                }
                ConflictBehavior::Rename => {
                    let mut n = 1;
                    while state.child(parent.id(), &format!("{name} {n}")).is_some() {
                        n += 1;
                    }
                    Ok(state.insert_folder(parent.id(), &format!("{name} {n}")))
                }
            },
        }
    }

    fn create_session_now(
        &self,
        parent: &FolderHandle,
        file_name: &str,
        file_size: Option<u64>,
        conflict: ConflictBehavior,
    ) -> Result<ResumableSession, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::CreateSession {
            parent: parent.id().to_string(),
            file_name: file_name.to_string(),
        });
        if let Some(err) = state.session_rejection.take() {
            return Err(err);
        }
        if !state.parent_exists(parent.id()) {
            return Err(not_found("parent"));
        }
        if conflict == ConflictBehavior::Fail && state.child(parent.id(), file_name).is_some() {
            return Err(StoreError::Conflict(format!("{file_name:?} already exists")));
        }

        let id = state.mint_id();
        let upload_url = format!("memory://upload/{id}");
        let expires_at = Utc::now() + Duration::hours(1);
        state.sessions.insert(
            upload_url.clone(),
            Session {
                parent: parent.id().to_string(),
                name: file_name.to_string(),
                total: file_size.unwrap_or(0),
                received: Vec::new(),
                expires_at,
            },
        );
        Ok(ResumableSession {
            upload_url,
            expires_at,
        })
    }

    fn put_chunk_now(
        &self,
        upload_url: &str,
        range: ChunkState,
        data: Vec<u8>,
    ) -> Result<ChunkAck, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::PutChunk {
            offset: range.offset,
            end: range.end(),
            total: range.total_size,
        });
        let index = state.puts;
        state.puts += 1;

        if let Some(err) = state.chunk_failures.remove(&index) {
            return Err(err);
        }

        let now = Utc::now();
        let session = state
            .sessions
            .get_mut(upload_url)
            .ok_or_else(|| not_found("upload session"))?;
        if now >= session.expires_at {
            return Err(not_found("upload session"));
        }
        if session.total == 0 {
            session.total = range.total_size;
        }
        if range.offset != session.received.len() as u64 || range.total_size != session.total {
            return Err(StoreError::Status {
                status: 416,
                code: "invalidRange".into(),
                message: format!(
                    "expected bytes {}-, got {}",
                    session.received.len(),
                    range.content_range()
                ),
            });
        }
        if data.len() as u64 != range.length {
            return Err(StoreError::Status {
                status: 400,
                code: "invalidRequest".into(),
                message: "Content-Length does not match body".into(),
            });
        }
        session.received.extend_from_slice(&data);
        let received = session.received.len() as u64;
        let total = session.total;

        if state.expire_after_put == Some(index) {
            for s in state.sessions.values_mut() {
                s.expires_at = now - Duration::seconds(1);
            }
        }

        if received < total {
            return Ok(ChunkAck::Accepted {
                next_expected_ranges: vec![format!("{received}-")],
            });
        }

        let Some(done) = state.sessions.remove(upload_url) else {
            return Err(not_found("upload session"));
        };
        let mime = mime_for(&done.name);
        let item = state.insert_file(&done.parent, &done.name, done.received, mime);
        Ok(ChunkAck::Completed { item: Some(item) })
    }

    fn item_by_path_now(&self, path: &[String]) -> Result<Option<DriveItem>, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::ItemByPath {
            path: path.join("/"),
        });
        Ok(state.resolve_path(path).map(|n| n.item.clone()))
    }

    fn list_children_now(&self, folder: &FolderHandle) -> Result<Vec<DriveItem>, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::ListChildren {
            folder: folder.id().to_string(),
        });
        if !state.parent_exists(folder.id()) {
            return Err(not_found("folder"));
        }
        let mut items: Vec<DriveItem> = state
            .nodes
            .values()
            .filter(|n| n.parent == folder.id())
            .map(|n| n.item.clone())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn delete_now(&self, item_id: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Delete {
            item_id: item_id.to_string(),
        });
        if !state.nodes.contains_key(item_id) {
            return Err(not_found("item"));
        }
        state.remove_tree(item_id);
        Ok(())
    }

    fn read_now(&self, path: &[String]) -> Result<Vec<u8>, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Read {
            path: path.join("/"),
        });
        state
            .resolve_path(path)
            .filter(|n| n.item.is_file())
            .map(|n| n.content.clone())
            .ok_or_else(|| not_found("file"))
    }

    fn write_now(
        &self,
        parent: &FolderHandle,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<DriveItem, StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Write {
            parent: parent.id().to_string(),
            name: name.to_string(),
        });
        if !state.parent_exists(parent.id()) {
            return Err(not_found("parent"));
        }
        Ok(state.insert_file(parent.id(), name, data, content_type))
    }
}

impl DocumentStore for MemoryStore {
    fn lookup<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
    ) -> StoreFuture<'a, Option<DriveItem>> {
        Box::pin(async move {
            // Suspend like a network call so concurrent callers interleave.
            tokio::task::yield_now().await;
            self.lookup_now(parent, name)
        })
    }

    fn create_folder<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'a, DriveItem> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.create_folder_now(parent, name, conflict)
        })
    }

    fn create_upload_session<'a>(
        &'a self,
        parent: &'a FolderHandle,
        file_name: &'a str,
        file_size: Option<u64>,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'a, ResumableSession> {
        Box::pin(async move { self.create_session_now(parent, file_name, file_size, conflict) })
    }

    fn put_chunk<'a>(
        &'a self,
        upload_url: &'a str,
        range: ChunkState,
        data: Vec<u8>,
    ) -> StoreFuture<'a, ChunkAck> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.put_chunk_now(upload_url, range, data)
        })
    }

    fn item_by_path<'a>(&'a self, path: &'a [String]) -> StoreFuture<'a, Option<DriveItem>> {
        Box::pin(async move { self.item_by_path_now(path) })
    }

    fn list_children<'a>(&'a self, folder: &'a FolderHandle) -> StoreFuture<'a, Vec<DriveItem>> {
        Box::pin(async move { self.list_children_now(folder) })
    }

    fn delete_item<'a>(&'a self, item_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.delete_now(item_id) })
    }

    fn read_content<'a>(&'a self, path: &'a [String]) -> StoreFuture<'a, Vec<u8>> {
        Box::pin(async move { self.read_now(path) })
    }

    fn write_content<'a>(
        &'a self,
        parent: &'a FolderHandle,
        name: &'a str,
        data: Vec<u8>,
        content_type: &'a str,
    ) -> StoreFuture<'a, DriveItem> {
        Box::pin(async move { self.write_now(parent, name, data, content_type) })
    }
}
