//! Core trait abstractions for the probe engine.
//!
//! These traits define the two seams hosts implement: [`target::Target`]
//! exposes component state to the engine, and [`script::ExtractionScript`]
//! is the per-kind extraction logic the engine drives.

pub mod script;
pub mod target;
