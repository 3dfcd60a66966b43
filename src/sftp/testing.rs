//! In-memory remote tree for tests

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::SftpError;
use super::path_utils::{normalize_remote_path, remote_file_name, remote_parent};
use super::remote::{ProgressCallback, RemoteFs};
use super::types::RemoteEntry;

const FETCH_CHUNK: u64 = 1024;

#[derive(Debug, Clone, Copy)]
enum Node {
    Dir,
    File { size: u64 },
}

/// Remote filesystem backed by a map of paths.
///
/// Also records every fetch and the highest number of calls that were in
/// flight at the same time.
#[derive(Default)]
pub(crate) struct MemoryRemote {
    nodes: Mutex<BTreeMap<String, Node>>,
    list_failures: HashSet<String>,
    fetch_failures: HashSet<String>,
    call_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetched: Mutex<Vec<String>>,
    closed: AtomicBool,
}

struct CallGuard<'a>(&'a AtomicUsize);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn clean(path: &str) -> String {
    normalize_remote_path(path, [""; 0])
}

impl MemoryRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.nodes.lock().insert("/".to_string(), Node::Dir);
        remote
    }

    fn insert_parents(&self, path: &str) {
        let mut nodes = self.nodes.lock();
        let mut parent = remote_parent(path);
        loop {
            nodes.entry(parent.clone()).or_insert(Node::Dir);
            if parent == "/" {
                break;
            }
            parent = remote_parent(&parent);
        }
    }

    pub fn with_file(self, path: &str, size: u64) -> Self {
        let path = clean(path);
        self.insert_parents(&path);
        self.nodes.lock().insert(path, Node::File { size });
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        let path = clean(path);
        self.insert_parents(&path);
        self.nodes.lock().insert(path, Node::Dir);
        self
    }

    pub fn with_list_failure(mut self, path: &str) -> Self {
        self.list_failures.insert(clean(path));
        self
    }

    pub fn with_fetch_failure(mut self, path: &str) -> Self {
        self.fetch_failures.insert(clean(path));
        self
    }

    /// Make every call take `delay`, so overlapping calls become observable.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> CallGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        CallGuard(&self.in_flight)
    }

    fn entry_for(path: &str, node: Node) -> RemoteEntry {
        let name = remote_file_name(path).unwrap_or_else(|| "/".to_string());
        match node {
            Node::Dir => RemoteEntry::directory(name),
            Node::File { size } => RemoteEntry::file(name, size),
        }
    }
}

#[async_trait]
impl RemoteFs for MemoryRemote {
    async fn list_entries(&self, path: &str) -> Result<Vec<RemoteEntry>, SftpError> {
        let _guard = self.enter().await;
        let path = clean(path);
        if self.list_failures.contains(&path) {
            return Err(SftpError::PermissionDenied(path));
        }

        let nodes = self.nodes.lock();
        match nodes.get(&path) {
            Some(Node::Dir) => {}
            Some(Node::File { .. }) => {
                return Err(SftpError::ProtocolError(format!("{}: not a directory", path)))
            }
            None => return Err(SftpError::FileNotFound(path)),
        }

        let mut entries: Vec<RemoteEntry> = nodes
            .iter()
            .filter(|(p, _)| p.as_str() != "/" && remote_parent(p) == path)
            .map(|(p, node)| Self::entry_for(p, *node))
            .collect();
        entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    async fn stat_entry(&self, path: &str) -> Result<RemoteEntry, SftpError> {
        let _guard = self.enter().await;
        let path = clean(path);
        let node = self.nodes.lock().get(&path).copied();
        node.map(|n| Self::entry_for(&path, n))
            .ok_or(SftpError::FileNotFound(path))
    }

    async fn fetch_file(
        &self,
        remote_path: &str,
        local_path: &Path,
        on_progress: ProgressCallback<'_>,
    ) -> Result<u64, SftpError> {
        let _guard = self.enter().await;
        let path = clean(remote_path);
        if self.fetch_failures.contains(&path) {
            return Err(SftpError::PermissionDenied(path));
        }
        let size = match self.nodes.lock().get(&path).copied() {
            Some(Node::File { size }) => size,
            Some(Node::Dir) => {
                return Err(SftpError::ProtocolError(format!("{}: is a directory", path)))
            }
            None => return Err(SftpError::FileNotFound(path)),
        };

        tokio::fs::write(local_path, vec![b'x'; size as usize])
            .await
            .map_err(|e| SftpError::local_io(local_path, e))?;

        let mut transferred = 0;
        while transferred < size {
            transferred = (transferred + FETCH_CHUNK).min(size);
            on_progress(transferred, size);
        }
        if size == 0 {
            on_progress(0, 0);
        }

        self.fetched.lock().push(path);
        Ok(size)
    }

    async fn create_dir(&self, path: &str) -> Result<(), SftpError> {
        let _guard = self.enter().await;
        let path = clean(path);
        self.insert_parents(&path);
        self.nodes.lock().insert(path, Node::Dir);
        Ok(())
    }

    async fn close(&self) -> Result<(), SftpError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
