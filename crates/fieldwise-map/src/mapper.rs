//! The mapper orchestrator and its configuration.

use std::fmt;
use std::sync::{Arc, RwLock};

use fieldwise_model::{CasePolicy, FieldCatalog, MemberSpec, Reflect, Value};

use crate::compile::{CompiledTransform, compile};
use crate::error::MapError;
use crate::matcher::{NameMatcher, PairMatcher};
use crate::rules::{RuleSet, RuleSetStats, RuleSummary};

/// Configuration for a mapper instance.
///
/// The default carries case-insensitive matching, auto-matching enabled,
/// and the structural [`NameMatcher`]. The identity string derived from a
/// configuration feeds the registry cache key.
#[derive(Clone)]
pub struct MapperConfig {
    case: CasePolicy,
    auto_match: bool,
    matcher: Option<Arc<dyn PairMatcher>>,
    custom_matcher: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            case: CasePolicy::default(),
            auto_match: true,
            matcher: Some(Arc::new(NameMatcher::default())),
            custom_matcher: false,
        }
    }
}

impl MapperConfig {
    /// A configuration with no matcher and auto-matching disabled; only
    /// explicit rules apply.
    pub fn empty() -> Self {
        Self {
            case: CasePolicy::default(),
            auto_match: false,
            matcher: None,
            custom_matcher: false,
        }
    }

    /// Change the case policy. The default name matcher follows it; a
    /// matcher supplied through [`with_matcher`](Self::with_matcher) is
    /// left alone.
    pub fn with_case(mut self, case: CasePolicy) -> Self {
        self.case = case;
        if !self.custom_matcher && self.matcher.is_some() {
            self.matcher = Some(Arc::new(NameMatcher::new(case)));
        }
        self
    }

    pub fn with_matcher(mut self, matcher: impl PairMatcher + 'static) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self.custom_matcher = true;
        self
    }

    pub fn auto_match(mut self, enabled: bool) -> Self {
        self.auto_match = enabled;
        self
    }

    pub fn case(&self) -> CasePolicy {
        self.case
    }

    pub fn auto_match_enabled(&self) -> bool {
        self.auto_match
    }

    pub fn matcher(&self) -> Option<&Arc<dyn PairMatcher>> {
        self.matcher.as_ref()
    }

    /// Stable identity for registry keying.
    pub fn identity(&self) -> String {
        let matcher = self
            .matcher
            .as_ref()
            .map_or_else(|| "none".to_string(), |m| m.identity());
        format!(
            "case={:?};auto={};matcher={}",
            self.case, self.auto_match, matcher
        )
    }
}

impl fmt::Debug for MapperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapperConfig({})", self.identity())
    }
}

struct MapperState<D, S> {
    rules: RuleSet<S>,
    compiled: Option<Arc<CompiledTransform<D, S>>>,
}

/// Reusable mapping pipeline from `S` instances onto `D` instances.
///
/// A mapper owns a field catalog per side, the rule set built up by the
/// authoring API, and the current compiled transform. Compilation is lazy:
/// the first map call after any rule mutation finalizes the rule set
/// (auto-matching unresolved destination members through the configured
/// pair matcher) and compiles a fresh transform.
///
/// Authoring methods take `&self` and chain. Concurrent map calls against
/// a clean mapper are safe; callers mutating rules while other threads map
/// must serialize externally.
///
/// # Example
///
/// ```ignore
/// let mapper = Mapper::<Summary, Record>::new();
/// mapper
///     .field_map("Headline", "Title")
///     .field_skip("Internal");
/// let summary = mapper.map(&record)?;
/// ```
pub struct Mapper<D: Reflect, S: Reflect> {
    config: MapperConfig,
    destinations: FieldCatalog<D>,
    sources: FieldCatalog<S>,
    state: RwLock<MapperState<D, S>>,
}

impl<D: Reflect, S: Reflect> Default for Mapper<D, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Reflect, S: Reflect> Mapper<D, S> {
    pub fn new() -> Self {
        Self::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        let case = config.case();
        Self {
            config,
            destinations: FieldCatalog::destination(case),
            sources: FieldCatalog::source(case),
            state: RwLock::new(MapperState {
                rules: RuleSet::new(case),
                compiled: None,
            }),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Map a destination member from a named source member.
    pub fn field_map(&self, destination: &str, source: &str) -> &Self {
        self.edit(|rules| {
            rules.field_map(destination, source, None);
        })
    }

    /// Like [`field_map`](Self::field_map), gated by a per-invocation
    /// condition; when it evaluates false the member keeps its prior value.
    pub fn field_map_if(
        &self,
        destination: &str,
        source: &str,
        condition: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> &Self {
        self.edit(|rules| {
            rules.field_map(destination, source, Some(Arc::new(condition)));
        })
    }

    /// Map a destination member from a value computed off the source
    /// instance. Coercion is as strict as a direct map.
    pub fn field_compute(
        &self,
        destination: &str,
        value: impl Fn(&S) -> Value + Send + Sync + 'static,
    ) -> &Self {
        self.edit(|rules| {
            rules.field_compute(destination, Arc::new(value), None);
        })
    }

    pub fn field_compute_if(
        &self,
        destination: &str,
        value: impl Fn(&S) -> Value + Send + Sync + 'static,
        condition: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> &Self {
        self.edit(|rules| {
            rules.field_compute(destination, Arc::new(value), Some(Arc::new(condition)));
        })
    }

    /// Assign a constant to a destination member. A value that cannot
    /// coerce is silently skipped; this leniency is part of the contract.
    pub fn field_set(&self, destination: &str, value: impl Into<Value>) -> &Self {
        let value = value.into();
        self.edit(|rules| {
            rules.field_set(destination, value, None);
        })
    }

    pub fn field_set_if(
        &self,
        destination: &str,
        value: impl Into<Value>,
        condition: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> &Self {
        let value = value.into();
        self.edit(|rules| {
            rules.field_set(destination, value, Some(Arc::new(condition)));
        })
    }

    /// Assign a computed value with the same lenient coercion as
    /// [`field_set`](Self::field_set).
    pub fn field_set_with(
        &self,
        destination: &str,
        value: impl Fn(&S) -> Value + Send + Sync + 'static,
    ) -> &Self {
        self.edit(|rules| {
            rules.field_set_with(destination, Arc::new(value), None);
        })
    }

    pub fn field_set_with_if(
        &self,
        destination: &str,
        value: impl Fn(&S) -> Value + Send + Sync + 'static,
        condition: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> &Self {
        self.edit(|rules| {
            rules.field_set_with(destination, Arc::new(value), Some(Arc::new(condition)));
        })
    }

    /// Exclude a destination member from mapping entirely. Wins over any
    /// earlier or later rule for that member until restored.
    pub fn field_skip(&self, destination: &str) -> &Self {
        self.edit(|rules| rules.field_skip(destination))
    }

    /// Lift a skip and immediately re-resolve the member through the pair
    /// matcher, as if it had never been skipped.
    pub fn field_restore(&self, destination: &str) -> &Self {
        let mut state = self.state.write().expect("mapper state lock poisoned");
        if state.rules.field_restore(destination)
            && self.config.auto_match_enabled()
            && let Some(matcher) = self.config.matcher()
            && let Some(member) = self.destinations.get(destination)
        {
            let unresolved = vec![member.spec(self.destinations.normalize(destination))];
            for pair in matcher.find_pairs(&unresolved, &self.sources.specs()) {
                state.rules.push_matched(&pair.destination, &pair.source);
            }
        }
        drop(state);
        self
    }

    /// Map onto a fresh destination instance.
    pub fn map(&self, source: &S) -> Result<D, MapError>
    where
        D: Default,
    {
        let mut destination = D::default();
        self.map_into(&mut destination, source)?;
        Ok(destination)
    }

    /// Apply the compiled transform onto an existing destination instance.
    pub fn map_into(&self, destination: &mut D, source: &S) -> Result<(), MapError> {
        let transform = self.ensure_compiled()?;
        transform.apply(destination, source)
    }

    /// Element-wise lazy mapping over a source sequence.
    pub fn map_iter<'a, I>(&'a self, sources: I) -> impl Iterator<Item = Result<D, MapError>> + 'a
    where
        D: Default,
        I: IntoIterator<Item = &'a S>,
        I::IntoIter: 'a,
    {
        sources.into_iter().map(move |source| self.map(source))
    }

    /// Snapshot of the current rules, in execution order.
    pub fn rules_summary(&self) -> Vec<RuleSummary> {
        self.state
            .read()
            .expect("mapper state lock poisoned")
            .rules
            .summaries()
    }

    pub fn stats(&self) -> RuleSetStats {
        self.state
            .read()
            .expect("mapper state lock poisoned")
            .rules
            .stats()
    }

    pub fn is_dirty(&self) -> bool {
        self.state
            .read()
            .expect("mapper state lock poisoned")
            .rules
            .is_dirty()
    }

    fn edit(&self, f: impl FnOnce(&mut RuleSet<S>)) -> &Self {
        let mut state = self.state.write().expect("mapper state lock poisoned");
        f(&mut state.rules);
        drop(state);
        self
    }

    fn ensure_compiled(&self) -> Result<Arc<CompiledTransform<D, S>>, MapError> {
        {
            let state = self.state.read().expect("mapper state lock poisoned");
            if !state.rules.is_dirty()
                && let Some(compiled) = &state.compiled
            {
                return Ok(compiled.clone());
            }
        }

        let mut state = self.state.write().expect("mapper state lock poisoned");
        // another thread may have compiled while we waited for the lock
        if !state.rules.is_dirty()
            && let Some(compiled) = &state.compiled
        {
            return Ok(compiled.clone());
        }

        let matched = self.auto_match(&mut state.rules)?;
        let transform = Arc::new(compile(&state.rules, &self.destinations, &self.sources)?);
        state.rules.mark_clean();
        state.compiled = Some(transform.clone());

        tracing::debug!(
            destination = std::any::type_name::<D>(),
            source = std::any::type_name::<S>(),
            steps = transform.len(),
            matched,
            "compiled mapping transform"
        );

        Ok(transform)
    }

    /// Fill every unresolved, unskipped destination member through the
    /// configured pair matcher. Idempotent: a fully resolved rule set asks
    /// for nothing.
    fn auto_match(&self, rules: &mut RuleSet<S>) -> Result<usize, MapError> {
        if !self.config.auto_match_enabled() {
            return Ok(0);
        }

        let unresolved: Vec<MemberSpec> = self
            .destinations
            .specs()
            .into_iter()
            .filter(|spec| !rules.is_resolved(&spec.key) && !rules.is_skipped(&spec.key))
            .collect();
        if unresolved.is_empty() {
            return Ok(0);
        }

        let matcher = self.config.matcher().ok_or(MapError::MatcherMissing)?;
        let mut matched = 0;
        for pair in matcher.find_pairs(&unresolved, &self.sources.specs()) {
            if rules.push_matched(&pair.destination, &pair.source) {
                tracing::trace!(
                    destination = %pair.destination,
                    source = %pair.source,
                    "auto-matched member pair"
                );
                matched += 1;
            }
        }
        Ok(matched)
    }
}

impl<D: Reflect, S: Reflect> fmt::Debug for Mapper<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("destination", &std::any::type_name::<D>())
            .field("source", &std::any::type_name::<S>())
            .field("config", &self.config)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_change_recases_the_default_matcher() {
        let config = MapperConfig::default().with_case(CasePolicy::Sensitive);
        assert!(config.identity().contains("name:Sensitive"));
    }

    #[test]
    fn case_change_keeps_a_custom_matcher() {
        let config = MapperConfig::default()
            .with_matcher(NameMatcher::default())
            .with_case(CasePolicy::Sensitive);
        assert!(config.identity().contains("name:Insensitive"));
    }

    #[test]
    fn empty_config_stays_matcherless_across_case_changes() {
        let config = MapperConfig::empty().with_case(CasePolicy::Sensitive);
        assert!(config.matcher().is_none());
    }
}
