use share9p::protocol::{Request, Response, Session};
use share9p::store::{ContentStore, MemoryStore};
use share9p::tree::NodeInfo;
use share9p::types::NodeKind;
use share9p::{Gateway, GatewayOptions, ProtocolError};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<Gateway>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Gateway::new(
            Arc::clone(&store) as Arc<dyn ContentStore>,
            GatewayOptions {
                timeout,
                ..GatewayOptions::default()
            },
        );
        Self {
            store,
            gateway: Arc::new(gateway),
        }
    }

    pub fn session(&self) -> Session {
        Session::new(Arc::clone(&self.gateway))
    }
}

pub async fn walk(session: &mut Session, path: &str) -> Result<NodeInfo, ProtocolError> {
    match session
        .dispatch(Request::Walk {
            path: path.to_string(),
        })
        .await?
    {
        Response::Node(info) => Ok(info),
        other => panic!("unexpected response {:?}", other),
    }
}

pub async fn create(
    session: &mut Session,
    dir: &str,
    name: &str,
    kind: NodeKind,
) -> Result<NodeInfo, ProtocolError> {
    match session
        .dispatch(Request::Create {
            dir: dir.to_string(),
            name: name.to_string(),
            kind,
        })
        .await?
    {
        Response::Node(info) => Ok(info),
        other => panic!("unexpected response {:?}", other),
    }
}

pub async fn write(
    session: &mut Session,
    path: &str,
    offset: u64,
    data: &[u8],
) -> Result<usize, ProtocolError> {
    match session
        .dispatch(Request::Write {
            path: path.to_string(),
            offset,
            data: data.to_vec(),
        })
        .await?
    {
        Response::Written(count) => Ok(count),
        other => panic!("unexpected response {:?}", other),
    }
}

pub async fn read(
    session: &mut Session,
    path: &str,
    offset: u64,
    count: usize,
) -> Result<Vec<u8>, ProtocolError> {
    match session
        .dispatch(Request::Read {
            path: path.to_string(),
            offset,
            count,
        })
        .await?
    {
        Response::Data(data) => Ok(data),
        other => panic!("unexpected response {:?}", other),
    }
}

pub async fn stat(session: &mut Session, path: &str) -> Result<NodeInfo, ProtocolError> {
    match session
        .dispatch(Request::Stat {
            path: path.to_string(),
        })
        .await?
    {
        Response::Stat(info) => Ok(info),
        other => panic!("unexpected response {:?}", other),
    }
}

pub async fn read_dir(
    session: &mut Session,
    path: &str,
    batch: usize,
) -> Result<Option<Vec<String>>, ProtocolError> {
    match session
        .dispatch(Request::ReadDir {
            path: path.to_string(),
            batch,
        })
        .await?
    {
        Response::Entries(entries) => {
            Ok(entries.map(|batch| batch.into_iter().map(|info| info.name).collect()))
        }
        other => panic!("unexpected response {:?}", other),
    }
}

pub async fn remove(session: &mut Session, path: &str) -> Result<(), ProtocolError> {
    session
        .dispatch(Request::Remove {
            path: path.to_string(),
        })
        .await
        .map(|_| ())
}
