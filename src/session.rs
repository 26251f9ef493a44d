// src/session.rs

use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::Result;

/// Execution context handed to every stage: configuration, the HTTP client
/// used for the source fetch, and the worker pool stages run their
/// row/column parallelism on.
///
/// Created by the entry point and released when the last clone is dropped.
/// Clones share the same pool and client.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    config: PipelineConfig,
    client: Client,
    pool: rayon::ThreadPool,
}

impl Session {
    pub fn start(config: PipelineConfig) -> Result<Self> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("tripfeatures-{}", i));
        if let Some(n) = config.threads {
            builder = builder.num_threads(n);
        }
        let pool = builder.build()?;
        info!(threads = pool.current_num_threads(), "session started");

        Ok(Session {
            inner: Arc::new(Inner {
                config,
                client: Client::new(),
                pool,
            }),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// Run `op` inside the session's pool, so rayon iterators it starts use
    /// the session's workers.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.inner.pool.install(op)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        debug!("session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_uses_configured_pool() -> anyhow::Result<()> {
        let cfg = PipelineConfig {
            threads: Some(2),
            ..PipelineConfig::default()
        };
        let session = Session::start(cfg)?;
        let n = session.install(rayon::current_num_threads);
        assert_eq!(n, 2);

        let name = session.install(|| std::thread::current().name().map(str::to_string));
        assert!(name.unwrap_or_default().starts_with("tripfeatures-"));
        Ok(())
    }
}
