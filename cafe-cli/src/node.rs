//! Wires every crate in the workspace into one runnable node: identity,
//! datastore, transport, sessions, client, dispatcher/queue, inbox poller.
//! Mirrors `async-opcua-client/src/client.rs`'s `Client::new` construction
//! order: read config, open durable state, build the collaborators, then
//! the services that depend on them.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cafe_client::client::CafeClient;
use cafe_client::session::Sessions;
use cafe_core::clock::{Clock, SystemClock};
use cafe_core::config::{CafeNodeConfig, Config, ConfigError};
use cafe_crypto::{CryptoError, Identity};
use cafe_inbox::InboxPoller;
use cafe_queue::{DispatchPolicy, Dispatcher, Queue};
use cafe_store::{Datastore, SqliteStore, StoreError};

use crate::collaborators::{LoggingObjectSource, LoggingThreadSink};
use crate::transport::HttpTransport;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("identity io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Every long-lived collaborator a running `cafe` process needs, built once
/// at startup and shared by every CLI subcommand.
pub struct Node {
    pub config: CafeNodeConfig,
    pub sessions: Arc<Sessions>,
    pub client: Arc<CafeClient>,
    pub queue: Arc<Queue>,
    pub inbox: Arc<InboxPoller>,
}

impl Node {
    pub async fn build(
        config_path: &Path,
        identity_path: &Path,
        poll_interval_override: Option<Duration>,
    ) -> Result<Self, NodeError> {
        let mut config = if config_path.exists() {
            CafeNodeConfig::load(config_path)?
        } else {
            let config = CafeNodeConfig::default();
            config.save(config_path)?;
            config
        };
        if let Some(poll_interval) = poll_interval_override {
            config.poll_interval_secs = poll_interval.as_secs().max(1);
        }

        let identity = Arc::new(load_or_create_identity(identity_path)?);
        let store: Arc<dyn Datastore> = Arc::new(SqliteStore::connect(&config.sqlite_path).await?);
        let transport = Arc::new(HttpTransport::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let sessions = Arc::new(Sessions::new(
            transport.clone(),
            store.clone(),
            identity.clone(),
            identity.address(),
            clock.clone(),
            config.refresh_skew(),
            config.default_rpc_timeout(),
        ));

        let client = Arc::new(CafeClient::new(
            transport.clone(),
            sessions.clone(),
            identity.clone(),
            config.default_rpc_timeout(),
            config.store_upload_timeout(),
        ));

        let objects = Arc::new(LoggingObjectSource);
        let threads = Arc::new(LoggingThreadSink);

        let inbox = Arc::new(InboxPoller::new(
            client.clone(),
            sessions.clone(),
            transport.clone(),
            threads.clone(),
            clock.clone(),
            config.poll_interval(),
            config.msg_max_attempts,
        ));

        let policy = DispatchPolicy {
            max_batch: config.max_batch,
            max_inflight: config.max_inflight,
            max_inflight_per_cafe: config.max_inflight_per_cafe,
            backoff_base: config.backoff_base(),
            backoff_cap: config.backoff_cap(),
            backoff_jitter: config.backoff_jitter,
            max_attempts: config.max_attempts,
        };
        let dispatcher = Arc::new(Dispatcher::new(client.clone(), store.clone(), objects, threads, inbox.clone(), clock.clone(), policy));
        let queue = Arc::new(Queue::new(store, dispatcher, clock, config.poll_interval()));

        Ok(Self { config, sessions, client, queue, inbox })
    }
}

fn load_or_create_identity(path: &Path) -> Result<Identity, NodeError> {
    if path.exists() {
        let bytes = fs::read(path)?;
        Ok(Identity::from_secret_bytes(&bytes)?)
    } else {
        let identity = Identity::generate();
        fs::write(path, identity.secret_bytes())?;
        log::info!("generated new identity, address {}", identity.address());
        Ok(identity)
    }
}
