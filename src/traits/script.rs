//! The per-kind extraction-script seam.

use async_trait::async_trait;

use crate::engine::session::Session;
use crate::error::Result;
use crate::types::outcome::FactSet;

/// Per-kind extraction logic, supplied by the host.
///
/// A script describes which members to read and under what constraints; the
/// engine supplies the session it drives. Scripts are thin and mechanical:
/// acquire accessors, wait for the state they care about, emit facts.
///
/// Return values map onto the three terminal outcomes:
/// `Ok(Some(facts))` completes with facts, `Ok(None)` is the legitimate
/// "no applicable facts" marker, and `Err` abandons the session.
#[async_trait]
pub trait ExtractionScript: Send + Sync {
    /// The target kind this script understands.
    fn kind(&self) -> &str;

    /// Drive extraction for one target to a terminal state.
    async fn run(&self, session: &mut Session) -> Result<Option<FactSet>>;
}
