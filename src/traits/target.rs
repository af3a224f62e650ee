//! The target seam: the single place dynamic typing is tolerated.
//!
//! A target object is externally owned and has unknown-at-compile-time shape.
//! Hosts implement [`Target`] to expose named members of their components;
//! everything downstream of the accessor layer is strictly typed. Resolution
//! always runs against the concrete runtime type — trait dispatch guarantees
//! that here — so extraction behaves the same however the caller references
//! the target.

use crate::types::value::Value;

/// Declared-visibility expectation for a member lookup.
///
/// A member whose declared visibility contradicts the expectation does not
/// resolve. `Any` tolerates both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Resolve regardless of declared visibility.
    #[default]
    Any,
    /// The member must be publicly visible.
    Public,
    /// The member must not be publicly visible.
    NonPublic,
}

/// How a member lookup should be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lookup {
    /// Search static/shared members instead of instance members.
    pub statics: bool,
    /// Visibility expectation.
    pub visibility: Visibility,
}

impl Lookup {
    /// Instance member, any visibility.
    pub fn instance() -> Self {
        Self::default()
    }

    /// Static/shared member, any visibility.
    pub fn statics() -> Self {
        Self {
            statics: true,
            visibility: Visibility::Any,
        }
    }

    /// Require the given visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// What sort of member a name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// A plain data field.
    Field,
    /// A computed property.
    Property,
    /// An invocable method.
    Method,
}

/// An opaque, externally-owned object whose state is being observed.
///
/// The engine holds only a shared, non-owning handle (`Arc<dyn Target>`) for
/// the duration of an extraction. Implementations may mutate their state
/// asynchronously on any schedule; every [`read`](Target::read) must return
/// the current value, never a cached one.
pub trait Target: Send + Sync {
    /// Kind name of this target. One per distinct component type.
    fn kind(&self) -> &str;

    /// Resolve a named member on the concrete runtime type.
    ///
    /// Returns `None` when no member matches the name and lookup options;
    /// the accessor layer turns that into a fatal
    /// [`AbandonExtraction::NotFound`](crate::error::AbandonExtraction).
    fn resolve(&self, member: &str, lookup: Lookup) -> Option<MemberKind>;

    /// Read the current value of a member.
    ///
    /// `None` means the member vanished since it was resolved, which is a
    /// contract breach reported by the accessor layer.
    fn read(&self, member: &str, lookup: Lookup) -> Option<Value>;

    /// Write a value through a member.
    ///
    /// Used only to neutralize a target's interactive behavior. Returns
    /// `false` when the target rejects the write.
    fn write(&self, _member: &str, _lookup: Lookup, _value: Value) -> bool {
        false
    }

    /// Invoke a method member with the given arguments.
    ///
    /// `None` means the invocation failed or the member is not a method.
    fn invoke(&self, _member: &str, _args: &[Value]) -> Option<Value> {
        None
    }
}
