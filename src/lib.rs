//! Runtime State Observation & Extraction Engine
//!
//! A generic, runtime-checked engine for extracting facts from the internal,
//! mutable state of independently-authored components the host process does
//! not control. Targets change shape between versions, mutate asynchronously
//! on their own schedule, and may roll back their state after a partial
//! failure; the engine's job is to observe them anyway, validate what it
//! reads, and either produce facts or say precisely why it could not.
//!
//! # Design Philosophy
//!
//! **"One dynamic boundary, everything else typed"**
//!
//! - Lookup-by-name is tolerated in exactly one place, the [`Target`] seam
//! - Every read is fresh; nothing observed is ever cached
//! - Every contract violation is fatal to its one session and to nothing else
//! - "No applicable facts" is a legitimate result, not an error
//! - Library handles mechanics, per-kind scripts handle semantics
//!
//! # Usage
//!
//! ```rust,ignore
//! use probe::{accessor, Constraints, Engine, Fact, FactSet};
//!
//! // One session per target; the hook carries host events in.
//! let engine = Engine::new();
//! let session = engine.session(target);
//! let hook = session.hook();            // wire to solved/strike callbacks
//!
//! engine.start_run();                   // targets are initialized
//! let outcome = engine.run_script(&my_script, session).await;
//! ```
//!
//! where a script is a few accessor reads driven through the session:
//!
//! ```rust,ignore
//! let primes = accessor::field::<Vec<i64>>(session.target(), "chosenPrimes")?;
//! session.wait_solved().await?;
//! let primes = primes.get_with(&Constraints::new().exact_length(4))?;
//! Ok(Some(FactSet::new().with_fact("primes", Fact::new(primes))))
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions ([`Target`], [`ExtractionScript`])
//! - [`types`] - Values, constraints, outcomes, configuration
//! - [`accessor`] - Member location and typed, constraint-checked reads
//! - [`engine`] - The polling/wait engine and session driver
//! - [`registry`] - Cross-instance coordination and the completion barrier
//! - [`testing`] - Mock implementations for testing

pub mod accessor;
pub mod engine;
pub mod error;
pub mod registry;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{AbandonExtraction, Result};
pub use traits::{
    script::ExtractionScript,
    target::{Lookup, MemberKind, Target, Visibility},
};
pub use types::{
    config::EngineConfig,
    constraint::{Constraint, Constraints, ElementValidator},
    outcome::{Fact, FactSet, Outcome},
    value::{FromValue, Value},
};

// Re-export the accessor entry points
pub use accessor::{field, locate, method, public_field, static_field, FieldRef, MemberHandle};

// Re-export the engine and session machinery
pub use engine::{
    session::{Session, SessionHook, SessionState},
    stage::StageTracker,
    Engine,
};

// Re-export the registry
pub use registry::{InstanceSlot, Registry};

// Re-export testing utilities
pub use testing::MockTarget;
