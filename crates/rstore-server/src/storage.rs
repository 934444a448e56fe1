//! Transactional document service over a [`Backend`] and per-user folder
//! indexes.
//!
//! Every PUT/DELETE runs its read-ETag, evaluate, mutate and re-index steps
//! as one unit under a lock shared by all paths with the same user and top
//! segment. Paths that could conflict (`a` and `a/b`) always share a shard.
//! Backend calls run on the blocking pool under the configured timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use rstore_etag::compute_object_etag;
use rstore_index::{DirectoryIndex, FolderListing};
use rstore_store::{Backend, StoreError};
use rstore_types::{ETag, ItemPath, ObjectMeta, UserName};

use crate::conditional::{evaluate, Outcome, Preconditions, RequestKind};
use crate::error::{ServerError, ServerResult};

/// A document read back from storage.
#[derive(Clone, Debug)]
pub struct Document {
    pub content: Bytes,
    pub meta: ObjectMeta,
}

/// Result of a successful PUT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOutcome {
    pub etag: ETag,
    pub created: bool,
}

#[derive(Default)]
struct LockTable {
    shards: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockTable {
    fn shard(&self, key: String) -> ServerResult<Arc<tokio::sync::Mutex<()>>> {
        let mut shards = self
            .shards
            .lock()
            .map_err(|_| ServerError::Internal("lock table poisoned".into()))?;
        Ok(Arc::clone(shards.entry(key).or_default()))
    }
}

struct Inner {
    backend: Arc<dyn Backend>,
    indexes: RwLock<HashMap<UserName, DirectoryIndex>>,
    locks: LockTable,
    timeout: Duration,
}

impl Inner {
    fn indexes(&self) -> ServerResult<RwLockReadGuard<'_, HashMap<UserName, DirectoryIndex>>> {
        self.indexes
            .read()
            .map_err(|_| ServerError::Internal("folder index poisoned".into()))
    }

    fn indexes_mut(&self) -> ServerResult<RwLockWriteGuard<'_, HashMap<UserName, DirectoryIndex>>> {
        self.indexes
            .write()
            .map_err(|_| ServerError::Internal("folder index poisoned".into()))
    }

    fn current_etag(&self, key: &str) -> ServerResult<Option<ETag>> {
        Ok(self
            .backend
            .get_opt(key)?
            .map(|item| compute_object_etag(&item.content)))
    }
}

#[derive(Clone)]
pub struct Storage {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

fn backend_key(user: &UserName, path: &ItemPath) -> String {
    format!("{user}/{}", path.as_str())
}

fn shard_key(user: &UserName, path: &ItemPath) -> String {
    format!("{user}/{}", path.top_segment())
}

impl Storage {
    /// Open storage over `backend`, rebuilding every user's folder index from
    /// the documents it holds. Blocks on backend I/O.
    pub fn open(backend: Arc<dyn Backend>, timeout: Duration) -> ServerResult<Self> {
        let mut grouped: HashMap<UserName, Vec<(ItemPath, ObjectMeta)>> = HashMap::new();
        for key in backend.list_all("")? {
            let parsed = key
                .split_once('/')
                .and_then(|(user, rest)| Some((UserName::parse(user).ok()?, ItemPath::parse(rest).ok()?)));
            let Some((user, path)) = parsed else {
                warn!(%key, "ignoring stored key outside any user namespace");
                continue;
            };
            let item = backend.get(&key)?;
            let meta = ObjectMeta::new(
                compute_object_etag(&item.content),
                item.content_type,
                item.content.len() as u64,
            );
            grouped.entry(user).or_default().push((path, meta));
        }

        let indexes: HashMap<_, _> = grouped
            .into_iter()
            .map(|(user, docs)| (user, DirectoryIndex::rebuild(docs)))
            .collect();
        let documents: usize = indexes.values().map(DirectoryIndex::document_count).sum();
        info!(users = indexes.len(), documents, "storage opened");

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                indexes: RwLock::new(indexes),
                locks: LockTable::default(),
                timeout,
            }),
        })
    }

    /// Run `op` on the blocking pool, holding the shard lock if one is given,
    /// bounded by the storage timeout.
    ///
    /// The timeout only stops waiting: a blocking call that already started
    /// runs to completion, so a write reported as timed out may still be
    /// applied. Its shard lock is held until then, and later requests see the
    /// committed state.
    async fn run<T, F>(&self, shard: Option<String>, op: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> ServerResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let timeout = inner.timeout;
        let task = async move {
            let guard = match shard {
                Some(key) => Some(inner.locks.shard(key)?.lock_owned().await),
                None => None,
            };
            tokio::task::spawn_blocking(move || {
                let _guard = guard;
                op(inner.as_ref())
            })
            .await
            .map_err(|e| ServerError::Internal(format!("storage task failed: {e}")))?
        };
        match tokio::time::timeout(timeout, task).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "storage operation timed out");
                Err(StoreError::Timeout(timeout).into())
            }
        }
    }

    /// Read a document after evaluating `pre` against it.
    pub async fn get_document(
        &self,
        user: &UserName,
        path: &ItemPath,
        pre: &Preconditions,
    ) -> ServerResult<Document> {
        if !path.is_document() {
            return Err(ServerError::BadRequest(format!("{path} is a folder")));
        }
        let key = backend_key(user, path);
        let item = self
            .run(None, {
                let key = key.clone();
                move |inner| Ok(inner.backend.get_opt(&key)?)
            })
            .await?;

        let document = item.map(|item| Document {
            meta: ObjectMeta::new(
                compute_object_etag(&item.content),
                item.content_type,
                item.content.len() as u64,
            ),
            content: item.content,
        });
        let current = document.as_ref().map(|d| &d.meta.etag);
        match evaluate(pre, current, RequestKind::Read) {
            Outcome::Proceed => document.ok_or(ServerError::NotFound(key)),
            Outcome::NotModified => Err(ServerError::NotModified { etag: current.cloned() }),
            Outcome::PreconditionFailed => Err(ServerError::PreconditionFailed(key)),
        }
    }

    /// Folder description for `folder`. Absent folders list as empty.
    pub fn listing(
        &self,
        user: &UserName,
        folder: &ItemPath,
        pre: &Preconditions,
    ) -> ServerResult<FolderListing> {
        let listing = {
            let indexes = self.inner.indexes()?;
            match indexes.get(user) {
                Some(index) => index.listing(folder)?,
                None => DirectoryIndex::new().listing(folder)?,
            }
        };
        match evaluate(pre, Some(&listing.etag), RequestKind::Read) {
            Outcome::Proceed => Ok(listing),
            Outcome::NotModified => Err(ServerError::NotModified { etag: Some(listing.etag) }),
            Outcome::PreconditionFailed => {
                Err(ServerError::PreconditionFailed(backend_key(user, folder)))
            }
        }
    }

    /// Create or replace a document. Returns the new ETag and whether the
    /// document was created.
    pub async fn put_document(
        &self,
        user: &UserName,
        path: &ItemPath,
        content: Bytes,
        content_type: String,
        pre: Preconditions,
    ) -> ServerResult<PutOutcome> {
        if !path.is_document() {
            return Err(ServerError::MethodNotAllowed(format!("cannot PUT folder {path}")));
        }
        let shard = shard_key(user, path);
        let (user, path) = (user.clone(), path.clone());
        self.run(Some(shard), move |inner| {
            let key = backend_key(&user, &path);
            let current = inner.current_etag(&key)?;
            if evaluate(&pre, current.as_ref(), RequestKind::Write) != Outcome::Proceed {
                return Err(ServerError::PreconditionFailed(key));
            }
            if let Some(index) = inner.indexes()?.get(&user) {
                index.check_conflict(&path)?;
            }

            let etag = compute_object_etag(&content);
            let meta = ObjectMeta::new(etag.clone(), content_type.clone(), content.len() as u64);
            inner.backend.put(&key, content, &content_type)?;
            inner
                .indexes_mut()?
                .entry(user.clone())
                .or_default()
                .on_object_written(&path, meta)?;

            let created = current.is_none();
            debug!(%key, %etag, created, "document stored");
            Ok(PutOutcome { etag, created })
        })
        .await
    }

    /// Delete a document, returning the ETag it had.
    pub async fn delete_document(
        &self,
        user: &UserName,
        path: &ItemPath,
        pre: Preconditions,
    ) -> ServerResult<ETag> {
        if !path.is_document() {
            return Err(ServerError::MethodNotAllowed(format!("cannot DELETE folder {path}")));
        }
        let shard = shard_key(user, path);
        let (user, path) = (user.clone(), path.clone());
        self.run(Some(shard), move |inner| {
            let key = backend_key(&user, &path);
            let current = inner.current_etag(&key)?;
            if evaluate(&pre, current.as_ref(), RequestKind::Write) != Outcome::Proceed {
                return Err(ServerError::PreconditionFailed(key));
            }
            let Some(etag) = current else {
                return Err(ServerError::NotFound(key));
            };

            inner.backend.delete(&key)?;
            let mut indexes = inner.indexes_mut()?;
            if let Some(index) = indexes.get_mut(&user) {
                index.on_object_deleted(&path)?;
                if index.document_count() == 0 {
                    indexes.remove(&user);
                }
            }

            debug!(%key, %etag, "document deleted");
            Ok(etag)
        })
        .await
    }

    /// Number of documents currently indexed for `user`.
    pub fn document_count(&self, user: &UserName) -> ServerResult<usize> {
        Ok(self
            .inner
            .indexes()?
            .get(user)
            .map_or(0, DirectoryIndex::document_count))
    }
}
