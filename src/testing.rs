//! Testing utilities including mock implementations.
//!
//! [`MockTarget`] is a scripted, mutable target for exercising extraction
//! logic without a real host: seed members with builder calls, then mutate
//! them mid-test the way a live component would between ticks.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::traits::target::{Lookup, MemberKind, Target, Visibility};
use crate::types::value::Value;

type MethodBody = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

#[derive(Clone)]
struct MockMember {
    value: Value,
    member_kind: MemberKind,
    public: bool,
    stat: bool,
    body: Option<MethodBody>,
}

impl MockMember {
    fn matches(&self, lookup: Lookup) -> bool {
        if self.stat != lookup.statics {
            return false;
        }
        match lookup.visibility {
            Visibility::Any => true,
            Visibility::Public => self.public,
            Visibility::NonPublic => !self.public,
        }
    }
}

/// A mock target with scripted members.
///
/// Members default to non-public instance fields, matching how real targets
/// keep their interesting state; use the `with_public_*` and
/// `with_static_field` builders for the rest. All mutation goes through
/// interior mutability so a target can change under an `Arc` handle.
pub struct MockTarget {
    kind: String,
    members: RwLock<HashMap<String, MockMember>>,
}

impl fmt::Debug for MockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTarget")
            .field("kind", &self.kind)
            .field("members", &self.members.read().unwrap().len())
            .finish()
    }
}

impl MockTarget {
    /// Create an empty mock target of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            members: RwLock::new(HashMap::new()),
        }
    }

    fn insert(self, name: impl Into<String>, member: MockMember) -> Self {
        self.members.write().unwrap().insert(name.into(), member);
        self
    }

    /// Seed a non-public instance field.
    pub fn with_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(
            name,
            MockMember {
                value: value.into(),
                member_kind: MemberKind::Field,
                public: false,
                stat: false,
                body: None,
            },
        )
    }

    /// Seed a public instance field.
    pub fn with_public_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(
            name,
            MockMember {
                value: value.into(),
                member_kind: MemberKind::Field,
                public: true,
                stat: false,
                body: None,
            },
        )
    }

    /// Seed a public computed property.
    pub fn with_property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(
            name,
            MockMember {
                value: value.into(),
                member_kind: MemberKind::Property,
                public: true,
                stat: false,
                body: None,
            },
        )
    }

    /// Seed a static/shared field.
    pub fn with_static_field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(
            name,
            MockMember {
                value: value.into(),
                member_kind: MemberKind::Field,
                public: false,
                stat: true,
                body: None,
            },
        )
    }

    /// Seed an invocable method.
    pub fn with_method<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.insert(
            name,
            MockMember {
                value: Value::Null,
                member_kind: MemberKind::Method,
                public: false,
                stat: false,
                body: Some(Arc::new(body)),
            },
        )
    }

    /// Mutate a member's value, the way a live target would between ticks.
    ///
    /// Creates a non-public instance field when the name is new.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let mut members = self.members.write().unwrap();
        match members.get_mut(name) {
            Some(member) => member.value = value.into(),
            None => {
                members.insert(
                    name.to_owned(),
                    MockMember {
                        value: value.into(),
                        member_kind: MemberKind::Field,
                        public: false,
                        stat: false,
                        body: None,
                    },
                );
            }
        }
    }

    /// Remove a member, simulating a target whose shape changed.
    pub fn remove(&self, name: &str) {
        self.members.write().unwrap().remove(name);
    }
}

impl Target for MockTarget {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn resolve(&self, member: &str, lookup: Lookup) -> Option<MemberKind> {
        self.members
            .read()
            .unwrap()
            .get(member)
            .filter(|m| m.matches(lookup))
            .map(|m| m.member_kind)
    }

    fn read(&self, member: &str, lookup: Lookup) -> Option<Value> {
        self.members
            .read()
            .unwrap()
            .get(member)
            .filter(|m| m.matches(lookup) && m.member_kind != MemberKind::Method)
            .map(|m| m.value.clone())
    }

    fn write(&self, member: &str, lookup: Lookup, value: Value) -> bool {
        let mut members = self.members.write().unwrap();
        match members.get_mut(member) {
            Some(m) if m.matches(lookup) && m.member_kind != MemberKind::Method => {
                m.value = value;
                true
            }
            _ => false,
        }
    }

    fn invoke(&self, member: &str, args: &[Value]) -> Option<Value> {
        let body = self
            .members
            .read()
            .unwrap()
            .get(member)
            .and_then(|m| m.body.clone())?;
        Some(body(args))
    }
}
