//! Stage Recorder - Reference Extraction Script
//!
//! This example demonstrates how to write a per-kind extraction script on
//! top of the engine's mechanical primitives. It is a **reference
//! implementation**: copy it and customize for your target kind.
//!
//! # Mechanism vs Policy
//!
//! The engine provides **mechanism** (how to observe):
//! - `accessor::field()` - typed, constraint-checked member access
//! - `Session::wait_solved()` / `Session::observe()` - cooperative polling
//!   with stage-transition and reset handling
//! - `Registry` - cross-instance barriers and uniqueness queries
//!
//! This script adds **policy** (what to observe):
//! - Which members matter for its target kind
//! - What constraints those members must satisfy
//! - Which facts are worth emitting, and with what distractors
//!
//! ```bash
//! cargo run --example stage_recorder
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use probe::{
    accessor, Constraints, Engine, EngineConfig, ExtractionScript, Fact, FactSet, MockTarget,
    Result, Session, StageTracker,
};

/// Extraction script for a hypothetical "cipher_display" target: a screen
/// that shows one code word per stage and may roll a stage back on a strike.
struct CipherDisplayScript;

#[async_trait]
impl ExtractionScript for CipherDisplayScript {
    fn kind(&self) -> &str {
        "cipher_display"
    }

    async fn run(&self, session: &mut Session) -> Result<Option<FactSet>> {
        // Resolve every member up front: a missing one abandons before any
        // polling starts.
        let stage = accessor::field::<i64>(session.target(), "stageNumber")?;
        let word = accessor::field::<String>(session.target(), "displayedWord")?;
        let alphabet = accessor::field::<String>(session.target(), "alphabet")?;

        let slot = session.register();
        session.activated().await;

        let mut words = StageTracker::new();
        while !session.solved() {
            let s = stage.get_with(&Constraints::new().range(0, 9))?;
            let w = word.get_with(&Constraints::new().min_length(1))?;
            session.observe(&mut words, s, w);
            session.tick().await;
        }

        if words.is_empty() {
            session.report_complete(slot, Vec::new());
            return Ok(None);
        }

        // Distractors come from the target's own declared alphabet.
        let alphabet = alphabet.get_with(&Constraints::new().min_length(1))?;
        let distractors: Vec<String> = alphabet.chars().map(|c| c.to_string()).collect();

        let final_word = words.observations().last().cloned().unwrap_or_default();
        session.report_complete(slot, vec![final_word.clone().into()]);
        session.wait_all_reported().await;

        Ok(Some(
            FactSet::new()
                .with_fact("words_per_stage", Fact::new(words.into_observations()))
                .with_fact(
                    "final_word",
                    Fact::single(final_word).with_distractors(distractors),
                ),
        ))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let engine = Engine::with_config(EngineConfig::new().with_tick(Duration::from_millis(50)));

    let target = Arc::new(
        MockTarget::new("cipher_display")
            .with_field("stageNumber", 0i64)
            .with_field("displayedWord", "KAYAK")
            .with_field("alphabet", "KYOTA"),
    );

    let session = engine.session(target.clone());
    let hook = session.hook();
    engine.start_run();

    // Play the part of the host: advance the display, strike once, solve.
    let driver = async {
        tokio::time::sleep(Duration::from_millis(120)).await;
        target.set("stageNumber", 1i64);
        target.set("displayedWord", "YURT");

        tokio::time::sleep(Duration::from_millis(120)).await;
        hook.strike();
        target.set("displayedWord", "TOGA");

        tokio::time::sleep(Duration::from_millis(120)).await;
        hook.solved();
    };

    let (outcome, ()) = tokio::join!(engine.run_script(&CipherDisplayScript, session), driver);

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).expect("outcome serializes")
    );
}
