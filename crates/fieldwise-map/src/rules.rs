//! Mutable rule state built up by the authoring API.
//!
//! A [`RuleSet`] owns the destination-member → rule mapping, the skip set,
//! and the dirty flag that drives recompilation. It is mutated only by the
//! authoring API; the compiler reads it and never writes back.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use fieldwise_model::{CasePolicy, Value};

/// Boolean gate evaluated per invocation against the source instance.
pub type Condition<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Value expression evaluated per invocation against the source instance.
pub type ValueFn<S> = Arc<dyn Fn(&S) -> Value + Send + Sync>;

/// How a rule produces the value for its destination member.
pub enum RuleKind<S> {
    /// Read a named source member (strict coercion into scalar
    /// destinations).
    Direct { source: String },
    /// Compute the value from the source instance (same coercion policy
    /// as `Direct`).
    Compute { value: ValueFn<S> },
    /// Assign a constant (lenient: a non-convertible value is skipped).
    Set { value: Value },
    /// Assign a computed value (lenient, like `Set`).
    SetWith { value: ValueFn<S> },
}

impl<S> RuleKind<S> {
    fn tag(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Compute { .. } => "compute",
            Self::Set { .. } => "set",
            Self::SetWith { .. } => "set_with",
        }
    }

    fn source(&self) -> Option<&str> {
        match self {
            Self::Direct { source } => Some(source),
            _ => None,
        }
    }
}

impl<S> Clone for RuleKind<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct { source } => Self::Direct {
                source: source.clone(),
            },
            Self::Compute { value } => Self::Compute {
                value: value.clone(),
            },
            Self::Set { value } => Self::Set {
                value: value.clone(),
            },
            Self::SetWith { value } => Self::SetWith {
                value: value.clone(),
            },
        }
    }
}

impl<S> fmt::Debug for RuleKind<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { source } => f.debug_struct("Direct").field("source", source).finish(),
            Self::Compute { .. } => f.write_str("Compute"),
            Self::Set { value } => f.debug_struct("Set").field("value", value).finish(),
            Self::SetWith { .. } => f.write_str("SetWith"),
        }
    }
}

/// Whether a rule came from the authoring API or from auto-matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOrigin {
    Explicit,
    Matched,
}

/// A single destination-member-scoped mapping instruction.
pub struct Rule<S> {
    key: String,
    destination: String,
    kind: RuleKind<S>,
    condition: Option<Condition<S>>,
    origin: RuleOrigin,
}

impl<S> Rule<S> {
    /// Normalized destination key, unique within a rule set.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Destination member name as authored.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn kind(&self) -> &RuleKind<S> {
        &self.kind
    }

    pub fn condition(&self) -> Option<&Condition<S>> {
        self.condition.as_ref()
    }

    pub fn origin(&self) -> RuleOrigin {
        self.origin
    }

    fn summary(&self) -> RuleSummary {
        RuleSummary {
            destination: self.destination.clone(),
            kind: self.kind.tag(),
            source: self.kind.source().map(str::to_string),
            conditional: self.condition.is_some(),
            origin: self.origin,
        }
    }
}

impl<S> fmt::Debug for Rule<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("destination", &self.destination)
            .field("kind", &self.kind.tag())
            .field("conditional", &self.condition.is_some())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Serializable snapshot of one rule, for introspection and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub destination: String,
    pub kind: &'static str,
    pub source: Option<String>,
    pub conditional: bool,
    pub origin: RuleOrigin,
}

/// Counts over a rule set.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RuleSetStats {
    pub explicit: usize,
    pub matched: usize,
    pub skipped: usize,
    pub conditional: usize,
}

/// The mutable rule state for one mapper.
///
/// Rules keep declaration order; re-registering a destination moves it to
/// the end, so the most recent call wins. A skip removes any existing rule
/// for that destination and blocks later registrations until restored.
pub struct RuleSet<S> {
    case: CasePolicy,
    rules: Vec<Rule<S>>,
    skips: BTreeSet<String>,
    dirty: bool,
}

impl<S> RuleSet<S> {
    pub fn new(case: CasePolicy) -> Self {
        Self {
            case,
            rules: Vec::new(),
            skips: BTreeSet::new(),
            dirty: true,
        }
    }

    /// Register a direct member-to-member rule.
    pub fn field_map(
        &mut self,
        destination: &str,
        source: &str,
        condition: Option<Condition<S>>,
    ) -> bool {
        self.insert(
            destination,
            RuleKind::Direct {
                source: source.to_string(),
            },
            condition,
            RuleOrigin::Explicit,
        )
    }

    /// Register a computed-source rule.
    pub fn field_compute(
        &mut self,
        destination: &str,
        value: ValueFn<S>,
        condition: Option<Condition<S>>,
    ) -> bool {
        self.insert(
            destination,
            RuleKind::Compute { value },
            condition,
            RuleOrigin::Explicit,
        )
    }

    /// Register an explicit constant assignment.
    pub fn field_set(
        &mut self,
        destination: &str,
        value: Value,
        condition: Option<Condition<S>>,
    ) -> bool {
        self.insert(
            destination,
            RuleKind::Set { value },
            condition,
            RuleOrigin::Explicit,
        )
    }

    /// Register an explicit computed assignment.
    pub fn field_set_with(
        &mut self,
        destination: &str,
        value: ValueFn<S>,
        condition: Option<Condition<S>>,
    ) -> bool {
        self.insert(
            destination,
            RuleKind::SetWith { value },
            condition,
            RuleOrigin::Explicit,
        )
    }

    /// Add an auto-matched direct rule, unless the destination is already
    /// resolved or skipped.
    pub fn push_matched(&mut self, destination: &str, source: &str) -> bool {
        let key = self.case.normalize(destination);
        if self.is_resolved(&key) || self.skips.contains(&key) {
            return false;
        }
        self.insert(
            destination,
            RuleKind::Direct {
                source: source.to_string(),
            },
            None,
            RuleOrigin::Matched,
        )
    }

    /// Skip the destination member: drop any existing rule and block new
    /// ones.
    pub fn field_skip(&mut self, destination: &str) {
        let key = self.case.normalize(destination);
        self.rules.retain(|rule| rule.key != key);
        self.skips.insert(key);
        self.dirty = true;
    }

    /// Lift a skip. Returns whether the member was skipped.
    pub fn field_restore(&mut self, destination: &str) -> bool {
        let key = self.case.normalize(destination);
        let removed = self.skips.remove(&key);
        if removed {
            self.dirty = true;
        }
        removed
    }

    fn insert(
        &mut self,
        destination: &str,
        kind: RuleKind<S>,
        condition: Option<Condition<S>>,
        origin: RuleOrigin,
    ) -> bool {
        let key = self.case.normalize(destination);
        if self.skips.contains(&key) {
            return false;
        }
        self.rules.retain(|rule| rule.key != key);
        self.rules.push(Rule {
            key,
            destination: destination.to_string(),
            kind,
            condition,
            origin,
        });
        self.dirty = true;
        true
    }

    pub fn is_resolved(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.key == key)
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.skips.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule<S>> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.rules.iter().map(Rule::summary).collect()
    }

    pub fn stats(&self) -> RuleSetStats {
        let mut stats = RuleSetStats {
            skipped: self.skips.len(),
            ..RuleSetStats::default()
        };
        for rule in &self.rules {
            match rule.origin {
                RuleOrigin::Explicit => stats.explicit += 1,
                RuleOrigin::Matched => stats.matched += 1,
            }
            if rule.condition.is_some() {
                stats.conditional += 1;
            }
        }
        stats
    }
}

impl<S> fmt::Debug for RuleSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules)
            .field("skips", &self.skips)
            .field("dirty", &self.dirty)
            .finish()
    }
}
