//! Accessor descriptors for mapped types.
//!
//! Rust has no runtime reflection, so each mapped type registers its
//! members once through [`Reflect`]. A [`Member`] pairs a getter and a
//! setter resolved at registration time; nothing is re-resolved per call.

use std::sync::Arc;

use crate::error::ConvertError;
use crate::value::{Coerced, FieldValue, Value, ValueKind};

/// Outcome of a setter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assigned {
    /// The value was coerced and written.
    Set,
    /// The slot was left untouched (null input or lenient mismatch).
    Skipped,
}

/// Shared getter: reads a member off an instance as a [`Value`].
pub type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
/// Shared setter: coerces a [`Value`] and writes it onto an instance.
pub type Setter<T> = Arc<dyn Fn(&mut T, Value) -> Result<Assigned, ConvertError> + Send + Sync>;

/// A named, typed slot on a mapped type.
///
/// Immutable once registered. The getter is absent for write-only members
/// and the setter for read-only ones; catalogs filter on these capabilities
/// per role.
#[derive(Clone)]
pub struct Member<T> {
    name: &'static str,
    kind: ValueKind,
    type_name: &'static str,
    get: Option<Getter<T>>,
    set: Option<Setter<T>>,
}

impl<T> Member<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_readable(&self) -> bool {
        self.get.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    pub fn getter(&self) -> Option<Getter<T>> {
        self.get.clone()
    }

    pub fn setter(&self) -> Option<Setter<T>> {
        self.set.clone()
    }

    /// Metadata snapshot handed to pair matchers.
    pub fn spec(&self, key: String) -> MemberSpec {
        MemberSpec {
            name: self.name,
            key,
            kind: self.kind,
            type_name: self.type_name,
        }
    }
}

impl<T> std::fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Member metadata without accessors, as seen by pair matchers.
#[derive(Debug, Clone)]
pub struct MemberSpec {
    /// Name as registered.
    pub name: &'static str,
    /// Name normalized under the owning catalog's case policy.
    pub key: String,
    pub kind: ValueKind,
    pub type_name: &'static str,
}

/// Registration collector passed to [`Reflect::reflect`].
pub struct Members<T> {
    entries: Vec<Member<T>>,
}

impl<T: 'static> Members<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a readable and writable member.
    ///
    /// Accessors are plain `fn` pointers so they carry no captured state.
    pub fn field<V: FieldValue>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> &mut Self {
        self.push::<V>(name, Some(wrap_getter(get)), Some(wrap_setter(set)))
    }

    /// Register a member that can only be read from.
    pub fn read_only<V: FieldValue>(&mut self, name: &'static str, get: fn(&T) -> V) -> &mut Self {
        self.push::<V>(name, Some(wrap_getter(get)), None)
    }

    /// Register a member that can only be written to.
    pub fn write_only<V: FieldValue>(
        &mut self,
        name: &'static str,
        set: fn(&mut T, V),
    ) -> &mut Self {
        self.push::<V>(name, None, Some(wrap_setter(set)))
    }

    fn push<V: FieldValue>(
        &mut self,
        name: &'static str,
        get: Option<Getter<T>>,
        set: Option<Setter<T>>,
    ) -> &mut Self {
        self.entries.push(Member {
            name,
            kind: V::kind(),
            type_name: std::any::type_name::<V>(),
            get,
            set,
        });
        self
    }

    pub(crate) fn into_entries(self) -> Vec<Member<T>> {
        self.entries
    }
}

fn wrap_getter<T: 'static, V: FieldValue>(get: fn(&T) -> V) -> Getter<T> {
    Arc::new(move |instance| get(instance).into_value())
}

fn wrap_setter<T: 'static, V: FieldValue>(set: fn(&mut T, V)) -> Setter<T> {
    Arc::new(move |instance, value| match V::from_value(value)? {
        Coerced::Value(v) => {
            set(instance, v);
            Ok(Assigned::Set)
        }
        Coerced::Skip => Ok(Assigned::Skipped),
    })
}

/// Per-type member registration.
///
/// Implemented once per mapped type; the catalogs call it a single time per
/// role and cache the resulting accessor table.
pub trait Reflect: Send + Sync + Sized + 'static {
    fn reflect(members: &mut Members<Self>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        id: u32,
        label: String,
    }

    impl Reflect for Sample {
        fn reflect(members: &mut Members<Self>) {
            members
                .field("Id", |s: &Sample| s.id, |s, v| s.id = v)
                .field("Label", |s: &Sample| s.label.clone(), |s, v| s.label = v);
        }
    }

    fn members() -> Vec<Member<Sample>> {
        let mut collector = Members::new();
        Sample::reflect(&mut collector);
        collector.into_entries()
    }

    #[test]
    fn accessors_round_trip() {
        let members = members();
        let mut sample = Sample::default();

        let setter = members[0].setter().unwrap();
        setter(&mut sample, Value::Int(9)).unwrap();
        assert_eq!(sample.id, 9);

        let getter = members[0].getter().unwrap();
        assert!(matches!(getter(&sample), Value::UInt(9)));
    }

    #[test]
    fn setter_reports_skip_for_null() {
        let members = members();
        let mut sample = Sample {
            id: 3,
            label: "keep".into(),
        };

        let setter = members[1].setter().unwrap();
        assert_eq!(setter(&mut sample, Value::Null), Ok(Assigned::Skipped));
        assert_eq!(sample.label, "keep");
    }

    #[test]
    fn member_capabilities() {
        let mut collector = Members::new();
        collector.read_only("Computed", |s: &Sample| s.id);
        let entries = collector.into_entries();
        assert!(entries[0].is_readable());
        assert!(!entries[0].is_writable());
    }
}
