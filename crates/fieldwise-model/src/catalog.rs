//! Per-role member lookup tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::member::{Member, MemberSpec, Members, Reflect};

/// Name normalization applied when members are catalogued and looked up.
///
/// Chosen once per catalog (and therefore per mapper instance); fixed for
/// its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CasePolicy {
    /// Member names match regardless of case (default).
    #[default]
    Insensitive,
    /// Member names must match exactly.
    Sensitive,
}

impl CasePolicy {
    pub fn normalize(&self, name: &str) -> String {
        match self {
            Self::Insensitive => name.to_lowercase(),
            Self::Sensitive => name.to_string(),
        }
    }
}

/// The role a catalog serves, which decides the capability filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Source,
    Destination,
}

/// Normalized-name lookup over a type's usable members.
///
/// Built once per type and role, read-only thereafter. A type with zero
/// usable members yields a valid empty catalog. Members whose normalized
/// names collide keep the first registration.
#[derive(Debug, Clone)]
pub struct FieldCatalog<T> {
    case: CasePolicy,
    members: BTreeMap<String, Member<T>>,
}

impl<T: Reflect> FieldCatalog<T> {
    /// Catalog of readable members, for the source side.
    pub fn source(case: CasePolicy) -> Self {
        Self::build(Role::Source, case)
    }

    /// Catalog of writable members, for the destination side.
    pub fn destination(case: CasePolicy) -> Self {
        Self::build(Role::Destination, case)
    }

    fn build(role: Role, case: CasePolicy) -> Self {
        let mut collector = Members::new();
        T::reflect(&mut collector);

        let mut members = BTreeMap::new();
        for member in collector.into_entries() {
            let usable = match role {
                Role::Source => member.is_readable(),
                Role::Destination => member.is_writable(),
            };
            if !usable {
                continue;
            }
            members.entry(case.normalize(member.name())).or_insert(member);
        }

        Self { case, members }
    }
}

impl<T> FieldCatalog<T> {
    pub fn case(&self) -> CasePolicy {
        self.case
    }

    pub fn normalize(&self, name: &str) -> String {
        self.case.normalize(name)
    }

    /// Look up a member by raw name, normalizing under the catalog policy.
    pub fn get(&self, name: &str) -> Option<&Member<T>> {
        self.members.get(&self.case.normalize(name))
    }

    pub fn get_by_key(&self, key: &str) -> Option<&Member<T>> {
        self.members.get(key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Member<T>)> {
        self.members.iter()
    }

    /// Metadata snapshots for every catalogued member.
    pub fn specs(&self) -> Vec<MemberSpec> {
        self.members
            .iter()
            .map(|(key, member)| member.spec(key.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Members;

    #[derive(Default)]
    struct Widget {
        id: u64,
        title: String,
        revision: u32,
    }

    impl Reflect for Widget {
        fn reflect(members: &mut Members<Self>) {
            members
                .field("Id", |w: &Widget| w.id, |w, v| w.id = v)
                .field("Title", |w: &Widget| w.title.clone(), |w, v| w.title = v)
                .read_only("Revision", |w: &Widget| w.revision);
        }
    }

    struct Memberless;

    impl Reflect for Memberless {
        fn reflect(_members: &mut Members<Self>) {}
    }

    #[test]
    fn destination_catalog_excludes_read_only_members() {
        let catalog = FieldCatalog::<Widget>::destination(CasePolicy::Insensitive);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("Title"));
        assert!(!catalog.contains("Revision"));
    }

    #[test]
    fn source_catalog_keeps_read_only_members() {
        let catalog = FieldCatalog::<Widget>::source(CasePolicy::Insensitive);
        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains("revision"));
    }

    #[test]
    fn case_policy_controls_lookup() {
        let insensitive = FieldCatalog::<Widget>::source(CasePolicy::Insensitive);
        assert!(insensitive.contains("TITLE"));

        let sensitive = FieldCatalog::<Widget>::source(CasePolicy::Sensitive);
        assert!(sensitive.contains("Title"));
        assert!(!sensitive.contains("TITLE"));
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = FieldCatalog::<Memberless>::destination(CasePolicy::Insensitive);
        assert!(catalog.is_empty());
        assert!(catalog.specs().is_empty());
    }
}
