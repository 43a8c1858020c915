//! 9P2000.L binding
//!
//! Maps `rs9p` fid operations onto session [`Request`]s. Every attach gets its
//! own [`Session`], shared by every fid walked from the attached root, so a
//! client's requests are handled in order while clients run concurrently.
//!
//! Mount with standard clients:
//! ```bash
//! mount -t 9p -o trans=tcp,port=1337,version=9p2000.L 127.0.0.1 /mnt/share
//! ```

use crate::error::{ErrorKind, ProtocolError};
use crate::gateway::Gateway;
use crate::protocol::{Request, Response, Session};
use crate::tree::{path, NodeInfo};
use crate::types::NodeKind;
use async_trait::async_trait;
use rs9p::{
    srv::{Fid, Filesystem},
    *,
};
use std::io;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type Result<T> = std::result::Result<T, rs9p::Error>;

/// Entries pulled from the session cursor per readdir request.
const READDIR_BATCH: usize = 64;

const S_IFDIR: u32 = 0o040000;
const S_IFREG: u32 = 0o100000;
const DT_DIR: u8 = 4;
const DT_REG: u8 = 8;
const V9FS_MAGIC: u32 = 0x0102_1997;
const BLOCK_SIZE: u64 = 4096;

/// Per-fid state.
#[derive(Default)]
pub struct ShareFid {
    session: RwLock<Option<Arc<Mutex<Session>>>>,
    path: RwLock<String>,
    /// Directory snapshot served by offset, taken at readdir offset 0.
    entries: Mutex<Vec<NodeInfo>>,
}

#[derive(Clone)]
pub struct NinepServer {
    gateway: Arc<Gateway>,
}

impl NinepServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    async fn dispatch(
        &self,
        fid: &Fid<ShareFid>,
        request: Request,
    ) -> Result<std::result::Result<Response, ProtocolError>> {
        let session = fid
            .aux
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "fid is not attached"))?;
        let mut session = session.lock().await;
        Ok(session.dispatch(request).await)
    }

    /// Dispatch and turn protocol errors into 9P errors.
    async fn call(&self, fid: &Fid<ShareFid>, request: Request) -> Result<Response> {
        self.dispatch(fid, request).await?.map_err(to_9p_error)
    }

    async fn node(&self, fid: &Fid<ShareFid>, request: Request) -> Result<NodeInfo> {
        match self.call(fid, request).await? {
            Response::Node(info) | Response::Stat(info) => Ok(info),
            other => Err(unexpected(&other)),
        }
    }
}

fn to_9p_error(err: ProtocolError) -> rs9p::Error {
    err.into_io().into()
}

fn unexpected(response: &Response) -> rs9p::Error {
    io::Error::other(format!("unexpected response {:?}", response)).into()
}

fn qid(info: &NodeInfo) -> Qid {
    Qid {
        typ: if info.is_dir() {
            QidType::DIR
        } else {
            QidType::FILE
        },
        version: 0,
        path: info.id,
    }
}

fn time(info: &NodeInfo) -> Time {
    Time {
        sec: info.modified.timestamp().max(0) as u64,
        nsec: u64::from(info.modified.timestamp_subsec_nanos()),
    }
}

fn stat(info: &NodeInfo) -> Stat {
    let (mode, nlink) = match info.kind {
        NodeKind::Directory => (S_IFDIR | 0o777, 2),
        NodeKind::File => (S_IFREG | 0o777, 1),
    };
    Stat {
        mode,
        uid: 0,
        gid: 0,
        nlink,
        rdev: 0,
        size: info.size,
        blksize: BLOCK_SIZE,
        blocks: info.size.div_ceil(512),
        atime: time(info),
        mtime: time(info),
        ctime: time(info),
    }
}

fn dirent(info: &NodeInfo, offset: u64) -> DirEntry {
    DirEntry {
        qid: qid(info),
        offset,
        typ: if info.is_dir() { DT_DIR } else { DT_REG },
        name: info.name.clone(),
    }
}

/// Entries from `offset` on that fit in `max_size` bytes.
fn serialize_dirents(entries: &[NodeInfo], offset: u64, max_size: u32) -> DirEntryData {
    let mut data = DirEntryData::new();
    let mut used = 0u32;
    for (index, info) in entries.iter().enumerate().skip(offset as usize) {
        let entry = dirent(info, index as u64 + 1);
        if used + entry.size() > max_size {
            break;
        }
        used += entry.size();
        data.push(entry);
    }
    data
}

#[async_trait]
impl Filesystem for NinepServer {
    type Fid = ShareFid;

    async fn rattach(
        &self,
        fid: &Fid<Self::Fid>,
        _afid: Option<&Fid<Self::Fid>>,
        uname: &str,
        _aname: &str,
        _n_uname: u32,
    ) -> Result<Fcall> {
        let session = Session::new(Arc::clone(&self.gateway));
        debug!(session = session.id(), user = uname, "Attach");
        *fid.aux.session.write().await = Some(Arc::new(Mutex::new(session)));
        *fid.aux.path.write().await = "/".to_string();

        let root = self
            .node(
                fid,
                Request::Walk {
                    path: "/".to_string(),
                },
            )
            .await?;
        Ok(Fcall::Rattach { qid: qid(&root) })
    }

    async fn rwalk(
        &self,
        fid: &Fid<Self::Fid>,
        newfid: &Fid<Self::Fid>,
        wnames: &[String],
    ) -> Result<Fcall> {
        let session = fid.aux.session.read().await.clone();
        let mut current = fid.aux.path.read().await.clone();
        let mut wqids = Vec::with_capacity(wnames.len());

        for (index, name) in wnames.iter().enumerate() {
            let next = path::clean(&path::join(&current, name));
            let reached = self.dispatch(fid, Request::Walk { path: next.clone() }).await?;
            match reached {
                Ok(Response::Node(info)) => wqids.push(qid(&info)),
                Ok(other) => return Err(unexpected(&other)),
                // The first element must exist; later failures end a partial walk.
                Err(err) if index == 0 => return Err(to_9p_error(err)),
                Err(_) => break,
            }
            current = next;
        }

        if wqids.len() == wnames.len() {
            *newfid.aux.session.write().await = session;
            *newfid.aux.path.write().await = current;
        }
        Ok(Fcall::Rwalk { wqids })
    }

    async fn rlopen(&self, fid: &Fid<Self::Fid>, _flags: u32) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        let info = self.node(fid, Request::Open { path }).await?;
        Ok(Fcall::Rlopen {
            qid: qid(&info),
            iounit: 0,
        })
    }

    async fn rlcreate(
        &self,
        fid: &Fid<Self::Fid>,
        name: &str,
        _flags: u32,
        _mode: u32,
        _gid: u32,
    ) -> Result<Fcall> {
        let dir = fid.aux.path.read().await.clone();
        let info = self
            .node(
                fid,
                Request::Create {
                    dir: dir.clone(),
                    name: name.to_string(),
                    kind: NodeKind::File,
                },
            )
            .await?;
        // The fid now refers to the created file.
        *fid.aux.path.write().await = path::join(&dir, name);
        Ok(Fcall::Rlcreate {
            qid: qid(&info),
            iounit: 0,
        })
    }

    async fn rmkdir(
        &self,
        dfid: &Fid<Self::Fid>,
        name: &str,
        _mode: u32,
        _gid: u32,
    ) -> Result<Fcall> {
        let dir = dfid.aux.path.read().await.clone();
        let info = self
            .node(
                dfid,
                Request::Create {
                    dir,
                    name: name.to_string(),
                    kind: NodeKind::Directory,
                },
            )
            .await?;
        Ok(Fcall::Rmkdir { qid: qid(&info) })
    }

    async fn rread(&self, fid: &Fid<Self::Fid>, offset: u64, count: u32) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        let request = Request::Read {
            path,
            offset,
            count: count as usize,
        };
        let data = match self.dispatch(fid, request).await? {
            Ok(Response::Data(data)) => data,
            Ok(other) => return Err(unexpected(&other)),
            Err(err) if err.kind() == ErrorKind::Boundary => Vec::new(),
            Err(err) => return Err(to_9p_error(err)),
        };
        Ok(Fcall::Rread { data: Data(data) })
    }

    async fn rwrite(&self, fid: &Fid<Self::Fid>, offset: u64, data: &Data) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        let request = Request::Write {
            path,
            offset,
            data: data.0.clone(),
        };
        match self.call(fid, request).await? {
            Response::Written(count) => Ok(Fcall::Rwrite {
                count: count as u32,
            }),
            other => Err(unexpected(&other)),
        }
    }

    async fn rreaddir(&self, fid: &Fid<Self::Fid>, offset: u64, count: u32) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        let mut entries = fid.aux.entries.lock().await;

        if offset == 0 {
            // Fresh cursor, then drain it into this fid's snapshot.
            self.node(fid, Request::Open { path: path.clone() }).await?;
            entries.clear();
            loop {
                let request = Request::ReadDir {
                    path: path.clone(),
                    batch: READDIR_BATCH,
                };
                match self.call(fid, request).await? {
                    Response::Entries(Some(batch)) => entries.extend(batch),
                    Response::Entries(None) => break,
                    other => return Err(unexpected(&other)),
                }
            }
        }

        Ok(Fcall::Rreaddir {
            data: serialize_dirents(&entries, offset, count),
        })
    }

    async fn rgetattr(&self, fid: &Fid<Self::Fid>, _req_mask: GetattrMask) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        let info = self.node(fid, Request::Stat { path }).await?;
        Ok(Fcall::Rgetattr {
            valid: GetattrMask::BASIC,
            qid: qid(&info),
            stat: stat(&info),
        })
    }

    async fn rsetattr(
        &self,
        fid: &Fid<Self::Fid>,
        valid: SetattrMask,
        attr: &SetAttr,
    ) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        let request = if valid.contains(SetattrMask::SIZE) {
            Request::Truncate {
                path,
                size: attr.size,
            }
        } else {
            Request::SetTimes { path }
        };
        self.call(fid, request).await?;
        Ok(Fcall::Rsetattr)
    }

    async fn rclunk(&self, fid: &Fid<Self::Fid>) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        fid.aux.entries.lock().await.clear();
        if fid.aux.session.read().await.is_some() {
            self.call(fid, Request::Close { path }).await?;
        }
        Ok(Fcall::Rclunk)
    }

    async fn rremove(&self, fid: &Fid<Self::Fid>) -> Result<Fcall> {
        let path = fid.aux.path.read().await.clone();
        self.call(fid, Request::Remove { path }).await?;
        Ok(Fcall::Rremove)
    }

    async fn rstatfs(&self, _fid: &Fid<Self::Fid>) -> Result<Fcall> {
        let files = self.gateway.namespace().total_count() as u64;
        Ok(Fcall::Rstatfs {
            statfs: Statfs {
                typ: V9FS_MAGIC,
                bsize: BLOCK_SIZE as u32,
                blocks: 0,
                bfree: 0,
                bavail: 0,
                files,
                ffree: 0,
                fsid: 0,
                namelen: 255,
            },
        })
    }
}
