//! Per-target extraction sessions.
//!
//! A session advances through `WaitingForActivation → WaitingForCondition →
//! Completed | Abandoned`. Suspension points are tick boundaries only:
//! between ticks a session holds no locks and assumes nothing about what the
//! target did. Host event callbacks ([`SessionHook`]) fire synchronously
//! inside whatever tick they land in and only flip flags — they never read
//! target state, which keeps them from re-entering the engine.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::engine::stage::StageTracker;
use crate::error::{AbandonExtraction, Result};
use crate::registry::{InstanceSlot, Registry};
use crate::traits::target::Target;
use crate::types::config::EngineConfig;
use crate::types::value::Value;

/// Lifecycle state of one extraction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Before the run-started signal; no target reads happen here.
    WaitingForActivation,
    /// Polling accessors until the script's condition holds.
    WaitingForCondition,
    /// Terminal: the script emitted facts or the empty marker.
    Completed,
    /// Terminal: a contract breach aborted the script.
    Abandoned,
}

/// Flags shared between a session and its host-facing hook.
#[derive(Debug, Default)]
struct SessionSignals {
    solved: AtomicBool,
    dirty: AtomicBool,
    strikes: AtomicU32,
}

/// Host-facing callback handle for one session.
///
/// The host delivers per-target events through this: `solved` when the
/// target reports success, `strike` on a partial failure that may roll the
/// target's state back. Both only set flags and are safe to call from
/// anywhere.
#[derive(Debug, Clone)]
pub struct SessionHook {
    signals: Arc<SessionSignals>,
}

impl SessionHook {
    /// Mark the target solved.
    pub fn solved(&self) {
        self.signals.solved.store(true, Ordering::SeqCst);
    }

    /// Record a strike and mark the session dirty for reset handling.
    pub fn strike(&self) {
        self.signals.strikes.fetch_add(1, Ordering::SeqCst);
        self.signals.dirty.store(true, Ordering::SeqCst);
    }
}

/// Per-target, per-script extraction state.
pub struct Session {
    id: Uuid,
    kind: String,
    target: Arc<dyn Target>,
    cfg: EngineConfig,
    run: watch::Receiver<bool>,
    registry: Arc<Registry>,
    signals: Arc<SessionSignals>,
    state: SessionState,
}

impl Session {
    pub(crate) fn new(
        target: Arc<dyn Target>,
        cfg: EngineConfig,
        run: watch::Receiver<bool>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: target.kind().to_owned(),
            target,
            cfg,
            run,
            registry,
            signals: Arc::new(SessionSignals::default()),
            state: SessionState::WaitingForActivation,
        }
    }

    /// Session id, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Kind of the target under observation.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The target under observation.
    pub fn target(&self) -> &Arc<dyn Target> {
        &self.target
    }

    /// The shared instance registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// The host-facing event hook for this session.
    ///
    /// Subscribe it to the target's solved/strike notifications at session
    /// start.
    pub fn hook(&self) -> SessionHook {
        SessionHook {
            signals: Arc::clone(&self.signals),
        }
    }

    /// Whether the target has reported solved.
    pub fn solved(&self) -> bool {
        self.signals.solved.load(Ordering::SeqCst)
    }

    /// Number of strikes recorded so far.
    pub fn strikes(&self) -> u32 {
        self.signals.strikes.load(Ordering::SeqCst)
    }

    /// Consume the pending reset flag.
    ///
    /// Returns true at most once per strike burst; the flag is re-armed by
    /// the next [`SessionHook::strike`].
    pub fn take_reset(&self) -> bool {
        self.signals.dirty.swap(false, Ordering::SeqCst)
    }

    /// Wait for the global run-started signal.
    ///
    /// Targets may not have initialized before this, so scripts must not
    /// read target state until it returns. All waiting helpers call it.
    pub async fn activated(&mut self) {
        if self.state != SessionState::WaitingForActivation {
            return;
        }
        let mut run = self.run.clone();
        while !*run.borrow_and_update() {
            if run.changed().await.is_err() {
                break;
            }
        }
        self.state = SessionState::WaitingForCondition;
        debug!(session_id = %self.id, kind = %self.kind, "session activated");
    }

    /// Suspend until the next tick boundary.
    pub async fn tick(&self) {
        tokio::time::sleep(self.cfg.tick).await;
    }

    /// Suspend for one scheduler quantum.
    ///
    /// For scripts that would miss a transient value at the tick cadence.
    pub async fn next_quantum(&self) {
        tokio::task::yield_now().await;
    }

    /// Poll a predicate at the tick cadence until it holds.
    ///
    /// The predicate runs over fresh accessor reads; an `Err` from it
    /// abandons the session immediately and no further ticks occur.
    pub async fn wait_until<F>(&mut self, mut predicate: F) -> Result<()>
    where
        F: FnMut() -> Result<bool>,
    {
        self.activated().await;
        let started = tokio::time::Instant::now();
        loop {
            if predicate()? {
                return Ok(());
            }
            if let Some(max) = self.cfg.max_wait {
                if started.elapsed() >= max {
                    return Err(AbandonExtraction::script(format!(
                        "condition did not hold within {max:?} on target of kind `{}`",
                        self.kind
                    )));
                }
            }
            self.tick().await;
        }
    }

    /// Poll until the target reports solved.
    pub async fn wait_solved(&mut self) -> Result<()> {
        self.activated().await;
        let started = tokio::time::Instant::now();
        while !self.solved() {
            if let Some(max) = self.cfg.max_wait {
                if started.elapsed() >= max {
                    return Err(AbandonExtraction::script(format!(
                        "target of kind `{}` never reported solved within {max:?}",
                        self.kind
                    )));
                }
            }
            self.tick().await;
        }
        Ok(())
    }

    /// Apply any pending reset, then record one stage observation.
    ///
    /// The reset is authoritative: a dirty flag set after an observation was
    /// committed discards that observation here, before the new one lands.
    /// The just-read value of a tick that raced a strike is therefore
    /// dropped, never merged.
    pub fn observe<K: PartialEq, V>(&self, tracker: &mut StageTracker<K, V>, stage: K, payload: V) {
        if self.take_reset() {
            tracker.rollback_stage();
            debug!(session_id = %self.id, kind = %self.kind, "reset consumed, stage rolled back");
        }
        tracker.observe(stage, payload);
    }

    /// Register this session's target with the instance registry.
    pub fn register(&self) -> InstanceSlot {
        self.registry.register(&self.kind)
    }

    /// Report this instance's extracted values for cross-instance queries.
    pub fn report_complete(&self, slot: InstanceSlot, values: Vec<Value>) {
        self.registry.report_complete(&self.kind, slot, values);
    }

    /// Suspend until every registered instance of this kind has reported.
    pub async fn wait_all_reported(&self) {
        self.registry.wait_all_reported(&self.kind).await;
    }
}
