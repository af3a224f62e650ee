//! Member location and typed access.
//!
//! [`locate`] resolves a named member on a target's concrete runtime type and
//! returns an immutable [`MemberHandle`]. A [`FieldRef`] binds a handle to a
//! target and a semantic type: every read fetches a fresh value, converts it,
//! and evaluates the caller's constraints, failing fatally on the first
//! violation. Handles may be reused across many reads of the same target.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{AbandonExtraction, Result};
use crate::traits::target::{Lookup, MemberKind, Target, Visibility};
use crate::types::constraint::Constraints;
use crate::types::value::{FromValue, Value};

/// Resolve a named member, failing fatally when nothing matches.
///
/// There is no silent default: a member the script asked for but the target
/// does not have means the target's contract changed.
pub fn locate(target: &Arc<dyn Target>, member: &str, lookup: Lookup) -> Result<MemberHandle> {
    match target.resolve(member, lookup) {
        Some(member_kind) => Ok(MemberHandle {
            member: member.to_owned(),
            lookup,
            member_kind,
        }),
        None => Err(AbandonExtraction::NotFound {
            kind: target.kind().to_owned(),
            member: member.to_owned(),
        }),
    }
}

/// A resolved member: name, lookup options, and what it turned out to be.
///
/// Immutable once resolved.
#[derive(Debug, Clone)]
pub struct MemberHandle {
    member: String,
    lookup: Lookup,
    member_kind: MemberKind,
}

impl MemberHandle {
    /// The member name.
    pub fn name(&self) -> &str {
        &self.member
    }

    /// The lookup options the member was resolved with.
    pub fn lookup(&self) -> Lookup {
        self.lookup
    }

    /// What the name resolved to.
    pub fn member_kind(&self) -> MemberKind {
        self.member_kind
    }
}

/// A typed accessor: a member handle bound to a target and a semantic type.
pub struct FieldRef<T> {
    target: Arc<dyn Target>,
    handle: MemberHandle,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Clone for FieldRef<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            handle: self.handle.clone(),
            _ty: PhantomData,
        }
    }
}

impl<T: FromValue> FieldRef<T> {
    /// Bind a resolved handle to a target.
    pub fn bind(target: Arc<dyn Target>, handle: MemberHandle) -> Self {
        Self {
            target,
            handle,
            _ty: PhantomData,
        }
    }

    /// The underlying handle.
    pub fn handle(&self) -> &MemberHandle {
        &self.handle
    }

    /// Read the current value, unconstrained.
    pub fn get(&self) -> Result<T> {
        self.get_with(&Constraints::default())
    }

    /// Read the current value and evaluate the given constraints.
    ///
    /// Conversion runs first, so a shape mismatch is reported as such even
    /// when constraints would also fail; constraints then run against the
    /// raw value in their fixed order.
    pub fn get_with(&self, constraints: &Constraints) -> Result<T> {
        let raw = self.raw_read(self.target.as_ref())?;
        let converted = self.convert(&raw)?;
        constraints.check(self.handle.name(), &raw)?;
        Ok(converted)
    }

    /// Read a static/shared member against an explicit carrier instance.
    pub fn get_from(&self, carrier: &dyn Target) -> Result<T> {
        self.get_from_with(carrier, &Constraints::default())
    }

    /// Constrained read against an explicit carrier instance.
    pub fn get_from_with(&self, carrier: &dyn Target, constraints: &Constraints) -> Result<T> {
        let raw = self.raw_read(carrier)?;
        let converted = self.convert(&raw)?;
        constraints.check(self.handle.name(), &raw)?;
        Ok(converted)
    }

    /// Write a value through the member.
    ///
    /// Only for the narrow cases where the engine must neutralize a target's
    /// interactive behavior. A rejected write is a contract breach.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.target.write(self.handle.name(), self.handle.lookup, value) {
            Ok(())
        } else {
            Err(AbandonExtraction::script(format!(
                "write to `{}` rejected by target of kind `{}`",
                self.handle.name(),
                self.target.kind()
            )))
        }
    }

    /// Invoke a method member and convert its result.
    pub fn call(&self, args: &[Value]) -> Result<T> {
        match self.target.invoke(self.handle.name(), args) {
            Some(raw) => self.convert(&raw),
            None => Err(AbandonExtraction::Shape {
                member: self.handle.member.clone(),
                expected: "an invocable method".into(),
                observed: "no result".into(),
            }),
        }
    }

    fn raw_read(&self, carrier: &dyn Target) -> Result<Value> {
        carrier
            .read(self.handle.name(), self.handle.lookup)
            .ok_or_else(|| AbandonExtraction::NotFound {
                kind: carrier.kind().to_owned(),
                member: self.handle.member.clone(),
            })
    }

    fn convert(&self, raw: &Value) -> Result<T> {
        T::from_value(raw).ok_or_else(|| AbandonExtraction::Shape {
            member: self.handle.member.clone(),
            expected: T::expected(),
            observed: raw.to_string(),
        })
    }
}

/// Locate an instance member (any visibility) and bind it.
pub fn field<T: FromValue>(target: &Arc<dyn Target>, member: &str) -> Result<FieldRef<T>> {
    let handle = locate(target, member, Lookup::instance())?;
    Ok(FieldRef::bind(Arc::clone(target), handle))
}

/// Locate an instance member that must be publicly visible.
pub fn public_field<T: FromValue>(target: &Arc<dyn Target>, member: &str) -> Result<FieldRef<T>> {
    let handle = locate(
        target,
        member,
        Lookup::instance().with_visibility(Visibility::Public),
    )?;
    Ok(FieldRef::bind(Arc::clone(target), handle))
}

/// Locate a static/shared member and bind it.
///
/// Reads go against the binding target unless redirected with
/// [`FieldRef::get_from`].
pub fn static_field<T: FromValue>(target: &Arc<dyn Target>, member: &str) -> Result<FieldRef<T>> {
    let handle = locate(target, member, Lookup::statics())?;
    Ok(FieldRef::bind(Arc::clone(target), handle))
}

/// Locate a method member and bind it for [`FieldRef::call`].
pub fn method<T: FromValue>(target: &Arc<dyn Target>, member: &str) -> Result<FieldRef<T>> {
    let handle = locate(target, member, Lookup::instance())?;
    if handle.member_kind() != MemberKind::Method {
        return Err(AbandonExtraction::Shape {
            member: member.to_owned(),
            expected: "an invocable method".into(),
            observed: format!("{:?}", handle.member_kind()),
        });
    }
    Ok(FieldRef::bind(Arc::clone(target), handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTarget;
    use mockall::mock;

    mock! {
        pub Probe {}

        impl Target for Probe {
            fn kind(&self) -> &str;
            fn resolve(&self, member: &str, lookup: Lookup) -> Option<MemberKind>;
            fn read(&self, member: &str, lookup: Lookup) -> Option<Value>;
            fn write(&self, member: &str, lookup: Lookup, value: Value) -> bool;
            fn invoke(&self, member: &str, args: &[Value]) -> Option<Value>;
        }
    }

    fn shared(target: MockTarget) -> Arc<dyn Target> {
        Arc::new(target)
    }

    #[test]
    fn locate_fails_fatally_on_missing_member() {
        let target = shared(MockTarget::new("maze"));
        let err = locate(&target, "exitlocation", Lookup::instance()).unwrap_err();
        assert_eq!(
            err,
            AbandonExtraction::NotFound {
                kind: "maze".into(),
                member: "exitlocation".into(),
            }
        );
    }

    #[test]
    fn visibility_expectation_gates_resolution() {
        let target = shared(MockTarget::new("maze").with_field("moduleSolved", false));
        assert!(public_field::<bool>(&target, "moduleSolved").is_err());
        assert!(field::<bool>(&target, "moduleSolved").is_ok());
    }

    #[test]
    fn properties_read_like_fields() {
        let target = shared(MockTarget::new("maze").with_property("SolvedCount", 2i64));
        let count = public_field::<i64>(&target, "SolvedCount").unwrap();
        assert_eq!(count.get().unwrap(), 2);
        assert_eq!(count.handle().member_kind(), MemberKind::Property);
    }

    #[test]
    fn static_members_require_static_lookup() {
        let target = shared(MockTarget::new("maze").with_static_field("instanceCount", 3i64));
        assert!(field::<i64>(&target, "instanceCount").is_err());
        assert_eq!(static_field::<i64>(&target, "instanceCount").unwrap().get().unwrap(), 3);
    }

    #[test]
    fn static_read_against_explicit_carrier() {
        let a = shared(MockTarget::new("maze").with_static_field("instanceCount", 1i64));
        let b = MockTarget::new("maze").with_static_field("instanceCount", 2i64);
        let fld = static_field::<i64>(&a, "instanceCount").unwrap();
        assert_eq!(fld.get().unwrap(), 1);
        assert_eq!(fld.get_from(&b).unwrap(), 2);
    }

    #[test]
    fn reads_are_fresh_and_idempotent() {
        let mock = MockTarget::new("screen").with_field("display", "ABC");
        let target = Arc::new(mock);
        let dyn_target: Arc<dyn Target> = target.clone();
        let fld = field::<String>(&dyn_target, "display").unwrap();

        // Unchanged member: repeated reads return equal values.
        assert_eq!(fld.get().unwrap(), "ABC");
        assert_eq!(fld.get().unwrap(), "ABC");

        // The handle sees mutations because nothing is cached.
        target.set("display", "XYZ");
        assert_eq!(fld.get().unwrap(), "XYZ");
    }

    #[test]
    fn shape_mismatch_is_fatal_with_observed_value() {
        let target = shared(MockTarget::new("screen").with_field("display", "ABC"));
        let fld = field::<i64>(&target, "display").unwrap();
        let err = fld.get().unwrap_err();
        match err {
            AbandonExtraction::Shape { member, expected, observed } => {
                assert_eq!(member, "display");
                assert_eq!(expected, "an integer");
                assert_eq!(observed, "\"ABC\"");
            }
            other => panic!("expected a shape error, got {other:?}"),
        }
    }

    #[test]
    fn constraints_run_against_the_read_value() {
        let target = shared(MockTarget::new("maze").with_field("chosenPrimes", vec![2i64, 3, 5, 7]));
        let fld = field::<Vec<i64>>(&target, "chosenPrimes").unwrap();
        assert_eq!(
            fld.get_with(&Constraints::new().exact_length(4)).unwrap(),
            vec![2, 3, 5, 7]
        );
        assert!(fld.get_with(&Constraints::new().exact_length(5)).is_err());
    }

    #[test]
    fn shape_mismatch_wins_over_constraint_violation() {
        let target = shared(MockTarget::new("maze").with_field("stage", "not a number"));
        let fld = field::<i64>(&target, "stage").unwrap();
        let err = fld.get_with(&Constraints::new().range(0, 6)).unwrap_err();
        assert!(matches!(err, AbandonExtraction::Shape { .. }));
    }

    #[test]
    fn vanished_member_fails_on_read() {
        let mock = MockTarget::new("maze").with_field("stage", 1i64);
        let target = Arc::new(mock);
        let dyn_target: Arc<dyn Target> = target.clone();
        let fld = field::<i64>(&dyn_target, "stage").unwrap();
        assert_eq!(fld.get().unwrap(), 1);
        target.remove("stage");
        assert!(matches!(
            fld.get().unwrap_err(),
            AbandonExtraction::NotFound { .. }
        ));
    }

    #[test]
    fn write_back_and_rejection() {
        let target = shared(MockTarget::new("button").with_field("interactable", true));
        let fld = field::<bool>(&target, "interactable").unwrap();
        fld.set(false).unwrap();
        assert_eq!(fld.get().unwrap(), false);

        let missing = FieldRef::<bool>::bind(
            Arc::clone(&target),
            MemberHandle {
                member: "ghost".into(),
                lookup: Lookup::instance(),
                member_kind: MemberKind::Field,
            },
        );
        assert!(missing.set(true).is_err());
    }

    #[test]
    fn method_members_are_invoked_and_converted() {
        let target = shared(MockTarget::new("maze").with_method("CurrentPosition", |_args| {
            Value::from(vec![3i64, 4])
        }));
        let pos = method::<Vec<i64>>(&target, "CurrentPosition").unwrap();
        assert_eq!(pos.call(&[]).unwrap(), vec![3, 4]);

        // A field member cannot be bound as a method.
        let target = shared(MockTarget::new("maze").with_field("stage", 1i64));
        assert!(method::<i64>(&target, "stage").is_err());
    }

    #[test]
    fn resolution_uses_the_concrete_runtime_type() {
        let mut mock = MockProbe::new();
        mock.expect_kind().return_const("wires".to_owned());
        mock.expect_resolve()
            .withf(|member, lookup| member == "cutOrder" && !lookup.statics)
            .return_const(Some(MemberKind::Field));
        mock.expect_read()
            .returning(|_, _| Some(Value::from(vec![1i64, 0, 2])));

        // The caller only ever sees `dyn Target`; dispatch lands on the
        // concrete impl regardless of how the target is referenced.
        let target: Arc<dyn Target> = Arc::new(mock);
        let fld = field::<Vec<i64>>(&target, "cutOrder").unwrap();
        assert_eq!(fld.get().unwrap(), vec![1, 0, 2]);
    }
}
