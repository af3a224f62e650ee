//! The polling/wait engine and session driver.
//!
//! [`Engine`] owns what sessions share: the run-started signal, the tick
//! configuration, and the instance registry. It drives extraction scripts to
//! exactly one [`Outcome`] each, converting an
//! [`AbandonExtraction`](crate::error::AbandonExtraction) into a host-visible
//! diagnostic at the script's top level so one target's broken contract never
//! stalls the others.

pub mod session;
pub mod stage;

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::registry::Registry;
use crate::traits::script::ExtractionScript;
use crate::traits::target::Target;
use crate::types::config::EngineConfig;
use crate::types::outcome::Outcome;
use session::{Session, SessionState};

/// Shared driver for all extraction sessions of one run.
#[derive(Debug)]
pub struct Engine {
    cfg: EngineConfig,
    run: watch::Sender<bool>,
    registry: Arc<Registry>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(cfg: EngineConfig) -> Self {
        let (run, _) = watch::channel(false);
        Self {
            cfg,
            run,
            registry: Arc::new(Registry::new()),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Handle to the shared instance registry.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Whether the run-started signal has fired.
    pub fn run_started(&self) -> bool {
        *self.run.borrow()
    }

    /// Release every session from `WaitingForActivation`.
    ///
    /// Delivered once by the host when targets have finished initializing.
    pub fn start_run(&self) {
        if !self.run.send_replace(true) {
            info!("run started");
        }
    }

    /// Construct a session observing one target.
    ///
    /// This is the subscription point: take the session's
    /// [`hook`](Session::hook) here and wire it to the target's solved and
    /// strike notifications before driving the script.
    pub fn session(&self, target: Arc<dyn Target>) -> Session {
        Session::new(
            target,
            self.cfg.clone(),
            self.run.subscribe(),
            Arc::clone(&self.registry),
        )
    }

    /// Drive one extraction script over a prepared session to its terminal
    /// outcome.
    ///
    /// This is the script's top level: an error is caught here, logged with
    /// enough context to diagnose which target's contract changed, and
    /// converted into [`Outcome::Abandoned`]. It never propagates to other
    /// sessions and never stalls the shared tick loop.
    pub async fn run_script(
        &self,
        script: &dyn ExtractionScript,
        mut session: Session,
    ) -> Outcome {
        let kind = session.kind().to_owned();
        if script.kind() != kind {
            warn!(
                script = script.kind(),
                target = %kind,
                "script kind does not match target kind"
            );
        }

        let session_id = session.id();
        debug!(session_id = %session_id, kind = %kind, "extraction session started");

        match script.run(&mut session).await {
            Ok(Some(facts)) => {
                session.set_state(SessionState::Completed);
                info!(
                    session_id = %session_id,
                    kind = %kind,
                    facts = facts.len(),
                    "extraction completed"
                );
                Outcome::Facts { kind, facts }
            }
            Ok(None) => {
                session.set_state(SessionState::Completed);
                debug!(
                    session_id = %session_id,
                    kind = %kind,
                    "extraction completed with no applicable facts"
                );
                Outcome::Empty { kind }
            }
            Err(error) => {
                session.set_state(SessionState::Abandoned);
                warn!(
                    session_id = %session_id,
                    kind = %kind,
                    error = %error,
                    "extraction abandoned"
                );
                Outcome::Abandoned {
                    kind,
                    message: error.to_string(),
                }
            }
        }
    }

    /// Convenience: construct the session and drive the script in one call.
    ///
    /// For targets that need no event wiring (the script polls state only).
    pub async fn run_script_on(
        &self,
        script: &dyn ExtractionScript,
        target: Arc<dyn Target>,
    ) -> Outcome {
        let session = self.session(target);
        self.run_script(script, session).await
    }

    /// Drive many script/session pairs concurrently, one outcome per pair.
    ///
    /// Outcomes are returned in input order. Sessions advance cooperatively
    /// on the calling task; an abandonment in one never disturbs the others.
    pub async fn run_all(
        &self,
        jobs: Vec<(Arc<dyn ExtractionScript>, Session)>,
    ) -> Vec<Outcome> {
        join_all(
            jobs.into_iter()
                .map(|(script, session)| async move {
                    self.run_script(script.as_ref(), session).await
                }),
        )
        .await
    }
}
