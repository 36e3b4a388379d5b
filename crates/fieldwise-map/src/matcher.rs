//! Pair matching strategies.
//!
//! A pair matcher proposes (destination, source) member pairs for
//! destination members that have no explicit rule and are not skipped. The
//! compiler consuming the pairs does not care which strategy produced them.

use std::collections::BTreeMap;
use std::sync::Arc;

use fieldwise_model::{CasePolicy, MemberSpec};

/// A proposed pairing, by original member names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPair {
    pub destination: String,
    pub source: String,
}

/// Strategy for resolving unmatched destination members against a source
/// member set.
///
/// Destinations a matcher cannot resolve are simply omitted from the
/// result, never an error.
pub trait PairMatcher: Send + Sync {
    /// Stable identity string; feeds the registry cache key so mappers
    /// built with different strategies do not collide.
    fn identity(&self) -> String;

    fn find_pairs(&self, unresolved: &[MemberSpec], sources: &[MemberSpec]) -> Vec<MemberPair>;
}

/// Default policy: structural name equality, case-insensitive unless
/// configured otherwise.
#[derive(Debug, Clone, Default)]
pub struct NameMatcher {
    case: CasePolicy,
}

impl NameMatcher {
    pub fn new(case: CasePolicy) -> Self {
        Self { case }
    }
}

impl PairMatcher for NameMatcher {
    fn identity(&self) -> String {
        format!("name:{:?}", self.case)
    }

    fn find_pairs(&self, unresolved: &[MemberSpec], sources: &[MemberSpec]) -> Vec<MemberPair> {
        let by_name: BTreeMap<String, &MemberSpec> = sources
            .iter()
            .map(|spec| (self.case.normalize(spec.name), spec))
            .collect();

        unresolved
            .iter()
            .filter_map(|destination| {
                by_name
                    .get(&self.case.normalize(destination.name))
                    .map(|source| MemberPair {
                        destination: destination.name.to_string(),
                        source: source.name.to_string(),
                    })
            })
            .collect()
    }
}

/// Runs matchers in order; each matcher only sees the destinations the
/// earlier ones left unresolved.
///
/// This is how a table-backed matcher falls through to default name
/// matching for entries the table does not cover.
#[derive(Clone, Default)]
pub struct MatcherChain {
    matchers: Vec<Arc<dyn PairMatcher>>,
}

impl MatcherChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, matcher: impl PairMatcher + 'static) -> Self {
        self.matchers.push(Arc::new(matcher));
        self
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl PairMatcher for MatcherChain {
    fn identity(&self) -> String {
        let parts: Vec<String> = self.matchers.iter().map(|m| m.identity()).collect();
        format!("chain:[{}]", parts.join(","))
    }

    fn find_pairs(&self, unresolved: &[MemberSpec], sources: &[MemberSpec]) -> Vec<MemberPair> {
        let mut remaining: Vec<MemberSpec> = unresolved.to_vec();
        let mut pairs = Vec::new();

        for matcher in &self.matchers {
            if remaining.is_empty() {
                break;
            }
            let found = matcher.find_pairs(&remaining, sources);
            for pair in found {
                remaining.retain(|spec| spec.name != pair.destination);
                pairs.push(pair);
            }
        }

        pairs
    }
}

impl std::fmt::Debug for MatcherChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatcherChain({})", self.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwise_model::ValueKind;

    fn spec(name: &'static str) -> MemberSpec {
        MemberSpec {
            name,
            key: name.to_lowercase(),
            kind: ValueKind::Str,
            type_name: "alloc::string::String",
        }
    }

    #[test]
    fn name_matcher_ignores_case_by_default() {
        let matcher = NameMatcher::default();
        let pairs = matcher.find_pairs(&[spec("FirstName")], &[spec("FIRSTNAME"), spec("Other")]);
        assert_eq!(
            pairs,
            vec![MemberPair {
                destination: "FirstName".into(),
                source: "FIRSTNAME".into(),
            }]
        );
    }

    #[test]
    fn unmatched_destinations_are_omitted() {
        let matcher = NameMatcher::default();
        let pairs = matcher.find_pairs(&[spec("Missing")], &[spec("Other")]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn sensitive_matcher_requires_exact_names() {
        let matcher = NameMatcher::new(CasePolicy::Sensitive);
        assert!(
            matcher
                .find_pairs(&[spec("FirstName")], &[spec("FIRSTNAME")])
                .is_empty()
        );
    }

    #[test]
    fn chain_falls_through_to_later_matchers() {
        struct Fixed;

        impl PairMatcher for Fixed {
            fn identity(&self) -> String {
                "fixed".into()
            }

            fn find_pairs(
                &self,
                unresolved: &[MemberSpec],
                _sources: &[MemberSpec],
            ) -> Vec<MemberPair> {
                unresolved
                    .iter()
                    .filter(|spec| spec.name == "A")
                    .map(|spec| MemberPair {
                        destination: spec.name.to_string(),
                        source: "X".into(),
                    })
                    .collect()
            }
        }

        let chain = MatcherChain::new().with(Fixed).with(NameMatcher::default());
        let pairs = chain.find_pairs(&[spec("A"), spec("B")], &[spec("A"), spec("B"), spec("X")]);

        // the fixed matcher claims A; name matching resolves only B
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].source, "X");
        assert_eq!(pairs[1].destination, "B");
        assert_eq!(pairs[1].source, "B");
    }

    #[test]
    fn chain_identity_names_every_stage() {
        let chain = MatcherChain::new().with(NameMatcher::default());
        assert_eq!(chain.identity(), "chain:[name:Insensitive]");
    }
}
