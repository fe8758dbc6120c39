//! Preflight - CLI environment detection
//!
//! Detects whether the external CLI is installed and authenticated. Results
//! are cached per runner for a fixed TTL, and concurrent callers for the same
//! runner share one in-flight probe so the probe commands run once.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use crate::cli::CliCommandRunner;
use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Default cache TTL
pub const DEFAULT_ENVIRONMENT_TTL: Duration = Duration::from_secs(30);

/// Observed CLI state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CliEnvironment {
    /// The binary runs
    pub available: bool,
    /// The binary reports an authenticated session
    pub authenticated: bool,
}

impl CliEnvironment {
    /// Available and authenticated
    #[must_use]
    pub fn ready() -> Self {
        Self {
            available: true,
            authenticated: true,
        }
    }

    /// Not installed
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Whether CLI steps can run
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.available && self.authenticated
    }
}

type ProbeFuture = Shared<BoxFuture<'static, std::result::Result<CliEnvironment, String>>>;
type Slots = Arc<Mutex<HashMap<usize, Slot>>>;

enum Slot {
    Ready {
        environment: CliEnvironment,
        observed_at: Instant,
        owner: Weak<dyn CliCommandRunner>,
    },
    Pending {
        id: u64,
        probe: ProbeFuture,
        owner: Weak<dyn CliCommandRunner>,
    },
}

impl Slot {
    fn owner(&self) -> &Weak<dyn CliCommandRunner> {
        match self {
            Self::Ready { owner, .. } | Self::Pending { owner, .. } => owner,
        }
    }
}

struct ProbeOutcome {
    environment: CliEnvironment,
    cacheable: bool,
}

/// Cached, de-duplicating CLI environment detector
pub struct CliEnvironmentDetector {
    binary: String,
    probe_timeout: Duration,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slots: Slots,
    next_probe: AtomicU64,
}

impl Default for CliEnvironmentDetector {
    fn default() -> Self {
        Self::new("gh")
    }
}

impl CliEnvironmentDetector {
    /// Create a detector for a CLI binary with default timeouts
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            ttl: DEFAULT_ENVIRONMENT_TTL,
            clock: Arc::new(SystemClock),
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_probe: AtomicU64::new(0),
        }
    }

    /// Set the per-probe timeout
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the cache TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Binary being probed
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Get the cached environment for `runner`, probing if needed.
    ///
    /// Callers arriving while a probe for the same runner is in flight await
    /// that probe instead of starting another one.
    pub async fn detect(&self, runner: &Arc<dyn CliCommandRunner>) -> Result<CliEnvironment> {
        let key = runner_key(runner);
        let probe = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            let live = slots
                .get(&key)
                .is_some_and(|slot| owned_by(slot.owner(), key));

            match slots.get(&key) {
                Some(Slot::Ready {
                    environment,
                    observed_at,
                    ..
                }) if live && self.clock.now().duration_since(*observed_at) < self.ttl => {
                    debug!(binary = %self.binary, ?environment, "CLI environment cache hit");
                    return Ok(*environment);
                }
                Some(Slot::Pending { probe, .. }) if live => {
                    debug!(binary = %self.binary, "Joining in-flight CLI probe");
                    probe.clone()
                }
                _ => {
                    let id = self.next_probe.fetch_add(1, Ordering::Relaxed);
                    let probe = self.start_probe(Arc::clone(runner), key, id);
                    slots.retain(|_, slot| slot.owner().strong_count() > 0);
                    slots.insert(
                        key,
                        Slot::Pending {
                            id,
                            probe: probe.clone(),
                            owner: Arc::downgrade(runner),
                        },
                    );
                    probe
                }
            }
        };

        probe.await.map_err(Error::Preflight)
    }

    /// Drop any cached or pending entry for `runner`
    pub fn invalidate(&self, runner: &Arc<dyn CliCommandRunner>) {
        let key = runner_key(runner);
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);
    }

    /// Number of cached or pending entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Check if nothing is cached or pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn start_probe(&self, runner: Arc<dyn CliCommandRunner>, key: usize, id: u64) -> ProbeFuture {
        let binary = self.binary.clone();
        let timeout_ms = self.probe_timeout.as_millis() as u64;
        let clock = Arc::clone(&self.clock);
        let slots = Arc::clone(&self.slots);

        async move {
            let outcome = probe_environment(runner.as_ref(), &binary, timeout_ms).await;

            let mut slots = slots.lock().unwrap_or_else(|e| e.into_inner());
            let current = matches!(slots.get(&key), Some(Slot::Pending { id: pending, .. }) if *pending == id);
            if current {
                match &outcome {
                    Ok(ProbeOutcome {
                        environment,
                        cacheable: true,
                    }) => {
                        slots.insert(
                            key,
                            Slot::Ready {
                                environment: *environment,
                                observed_at: clock.now(),
                                owner: Arc::downgrade(&runner),
                            },
                        );
                    }
                    _ => {
                        slots.remove(&key);
                    }
                }
            }

            outcome.map(|o| o.environment)
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for CliEnvironmentDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliEnvironmentDetector")
            .field("binary", &self.binary)
            .field("probe_timeout", &self.probe_timeout)
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn runner_key(runner: &Arc<dyn CliCommandRunner>) -> usize {
    Arc::as_ptr(runner) as *const () as usize
}

/// A live owner at the same address is the same runner
fn owned_by(owner: &Weak<dyn CliCommandRunner>, key: usize) -> bool {
    owner.strong_count() > 0 && Weak::as_ptr(owner) as *const () as usize == key
}

async fn probe_environment(
    runner: &dyn CliCommandRunner,
    binary: &str,
    timeout_ms: u64,
) -> std::result::Result<ProbeOutcome, String> {
    let version = runner
        .run(binary, &["--version".to_string()], timeout_ms)
        .await
        .map_err(|e| {
            warn!(binary = %binary, error = %e, "CLI version probe failed");
            e.to_string()
        })?;

    if !version.success() {
        debug!(binary = %binary, exit_code = version.exit_code, "CLI not available");
        return Ok(ProbeOutcome {
            environment: CliEnvironment::unavailable(),
            cacheable: false,
        });
    }

    let auth_args = ["auth".to_string(), "status".to_string()];
    match runner.run(binary, &auth_args, timeout_ms).await {
        Ok(auth) => {
            let environment = CliEnvironment {
                available: true,
                authenticated: auth.success(),
            };
            debug!(binary = %binary, ?environment, "CLI environment detected");
            Ok(ProbeOutcome {
                environment,
                cacheable: auth.success(),
            })
        }
        Err(e) => {
            warn!(binary = %binary, error = %e, "CLI auth probe failed");
            Ok(ProbeOutcome {
                environment: CliEnvironment {
                    available: true,
                    authenticated: false,
                },
                cacheable: false,
            })
        }
    }
}
