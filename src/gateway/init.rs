//! One-time, lazily driven store initialization
//!
//! ```text
//! Uninitialized ──first caller──▶ Initializing ──ok──▶ Ready
//!        ▲                              │
//!        └────── retry() ◀── Failed ◀───┘ err
//! ```
//!
//! Only the caller that moves the state out of `Uninitialized` runs the
//! connector. Everyone arriving while it runs polls until the state
//! settles and then sees the same outcome. A failure is sticky until
//! someone calls [`GatewayHandle::retry`].

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::store::{DocumentStore, StoreConnector};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Observable initialization phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitPhase {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum InitState {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn DocumentStore>),
    Failed(String),
}

impl InitState {
    fn phase(&self) -> InitPhase {
        match self {
            Self::Uninitialized => InitPhase::Uninitialized,
            Self::Initializing => InitPhase::Initializing,
            Self::Ready(_) => InitPhase::Ready,
            Self::Failed(_) => InitPhase::Failed,
        }
    }
}

struct HandleInner {
    state: Mutex<InitState>,
    connector: Arc<dyn StoreConnector>,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

impl HandleInner {
    // The lock is never held across an await
    fn lock(&self) -> MutexGuard<'_, InitState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settle(&self, outcome: &Result<Arc<dyn DocumentStore>>) {
        let mut state = self.lock();
        match outcome {
            Ok(store) => {
                tracing::info!(backend = store.name(), "Document store initialized");
                *state = InitState::Ready(store.clone());
            }
            Err(e) => {
                tracing::error!(error = %e, "Document store initialization failed");
                *state = InitState::Failed(failure_reason(e));
            }
        }
    }
}

enum Step {
    Claim,
    Wait,
}

/// Owner of the store handle and its initialization state
///
/// Cheap to clone; clones share one state.
#[derive(Clone)]
pub struct GatewayHandle {
    inner: Arc<HandleInner>,
}

impl GatewayHandle {
    /// Create an uninitialized handle using the gateway's timing settings
    pub fn new(connector: Arc<dyn StoreConnector>, config: &GatewayConfig) -> Self {
        Self::with_timing(
            connector,
            config.init_poll_interval(),
            config.init_wait_timeout(),
        )
    }

    /// Create an uninitialized handle with explicit timing
    pub fn with_timing(
        connector: Arc<dyn StoreConnector>,
        poll_interval: Duration,
        wait_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                state: Mutex::new(InitState::Uninitialized),
                connector,
                poll_interval,
                wait_timeout,
            }),
        }
    }

    /// Current phase
    pub fn phase(&self) -> InitPhase {
        self.inner.lock().phase()
    }

    /// Reason recorded by the last failed initialization
    pub fn failure(&self) -> Option<String> {
        match &*self.inner.lock() {
            InitState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Return the store, initializing it first if nobody has yet.
    ///
    /// Fails without contacting the store when a previous attempt failed,
    /// and with [`Error::InitTimeout`] when another caller's attempt is
    /// still running after the configured wait limit.
    pub async fn ensure_ready(&self) -> Result<Arc<dyn DocumentStore>> {
        let started = Instant::now();
        loop {
            let step = {
                let mut state = self.inner.lock();
                let step = match &*state {
                    InitState::Ready(store) => return Ok(store.clone()),
                    InitState::Failed(reason) => return Err(Error::Init(reason.clone())),
                    InitState::Initializing => Step::Wait,
                    InitState::Uninitialized => Step::Claim,
                };
                if let Step::Claim = step {
                    *state = InitState::Initializing;
                }
                step
            };

            match step {
                Step::Claim => return self.run_connector().await,
                Step::Wait => {
                    if let Some(limit) = self.inner.wait_timeout {
                        if started.elapsed() >= limit {
                            tracing::warn!(
                                waited_ms = limit.as_millis() as u64,
                                "Gave up waiting for store initialization"
                            );
                            return Err(Error::InitTimeout(limit));
                        }
                    }
                    tokio::time::sleep(self.inner.poll_interval).await;
                }
            }
        }
    }

    /// Start initialization eagerly; the outcome is only logged.
    pub async fn initialize(&self) {
        if let Err(e) = self.ensure_ready().await {
            tracing::warn!(error = %e, "Eager store initialization did not succeed");
        }
    }

    /// Allow another attempt after a failure. Returns whether the state
    /// was reset.
    pub fn retry(&self) -> bool {
        let mut state = self.inner.lock();
        if matches!(*state, InitState::Failed(_)) {
            *state = InitState::Uninitialized;
            tracing::info!("Store initialization reset for retry");
            true
        } else {
            false
        }
    }

    /// Run the connector on its own task so a caller that stops waiting
    /// does not leave the state stuck in `Initializing`.
    async fn run_connector(&self) -> Result<Arc<dyn DocumentStore>> {
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let outcome = inner.connector.connect().await;
            inner.settle(&outcome);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = Error::Init(format!("initialization task aborted: {}", e));
                self.inner.settle(&Err(Error::Init(failure_reason(&err))));
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayHandle")
            .field("phase", &self.phase())
            .field("poll_interval", &self.inner.poll_interval)
            .field("wait_timeout", &self.inner.wait_timeout)
            .finish_non_exhaustive()
    }
}

fn failure_reason(err: &Error) -> String {
    match err {
        Error::Init(reason) => reason.clone(),
        other => other.to_string(),
    }
}
