//! Extraction outcomes — the output of one extraction session.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::value::Value;

/// A single extracted fact: the correct answers, plus an optional set of
/// preferred distractor values the downstream consumer may use verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// The value(s) that answer the fact. Never empty.
    pub answers: Vec<Value>,

    /// Distractors the extraction script considers fair for this fact.
    ///
    /// Passed through opaquely; the engine attaches no meaning to them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_distractors: Vec<Value>,
}

impl Fact {
    /// Create a fact with one correct answer.
    pub fn single(answer: impl Into<Value>) -> Self {
        Self {
            answers: vec![answer.into()],
            preferred_distractors: Vec::new(),
        }
    }

    /// Create a fact with several correct answers.
    pub fn new(answers: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            preferred_distractors: Vec::new(),
        }
    }

    /// Attach preferred distractors.
    pub fn with_distractors(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.preferred_distractors = values.into_iter().map(Into::into).collect();
        self
    }
}

/// An ordered mapping from fact name to extracted fact.
///
/// Order is preserved so the consumer sees facts in the order the script
/// emitted them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactSet {
    facts: IndexMap<String, Fact>,
}

impl FactSet {
    /// Create an empty fact set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact under a name, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, fact: Fact) {
        self.facts.insert(name.into(), fact);
    }

    /// Builder-style insert.
    pub fn with_fact(mut self, name: impl Into<String>, fact: Fact) -> Self {
        self.insert(name, fact);
        self
    }

    /// Look up a fact by name.
    pub fn get(&self, name: &str) -> Option<&Fact> {
        self.facts.get(name)
    }

    /// Number of facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether the set holds no facts.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Iterate facts in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fact)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The terminal result of one extraction session.
///
/// Exactly one of these is produced per session. `Empty` is not an error: a
/// target can legitimately finish in a state with nothing worth asking about,
/// and logs must distinguish that from abandonment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Named facts ready for downstream use.
    Facts {
        /// Target kind the facts came from.
        kind: String,
        /// The extracted facts.
        facts: FactSet,
    },

    /// The session completed with no applicable facts.
    Empty {
        /// Target kind that produced nothing.
        kind: String,
    },

    /// The session was abandoned; the target contributes nothing.
    Abandoned {
        /// Target kind whose contract was violated.
        kind: String,
        /// Diagnostic naming the member, expected condition, and observed value.
        message: String,
    },
}

impl Outcome {
    /// Target kind this outcome belongs to.
    pub fn kind(&self) -> &str {
        match self {
            Outcome::Facts { kind, .. } | Outcome::Empty { kind } | Outcome::Abandoned { kind, .. } => {
                kind
            }
        }
    }

    /// Whether this outcome carries facts.
    pub fn is_facts(&self) -> bool {
        matches!(self, Outcome::Facts { .. })
    }

    /// Whether this outcome is the legitimate empty marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty { .. })
    }

    /// Whether the session was abandoned.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Outcome::Abandoned { .. })
    }

    /// The fact set, if any.
    pub fn facts(&self) -> Option<&FactSet> {
        match self {
            Outcome::Facts { facts, .. } => Some(facts),
            _ => None,
        }
    }
}
