//! Rule compilation into an executable batch transform.
//!
//! Each rule compiles to one boxed step closure over `(&mut D, &S)`; the
//! batch transform is the ordered vector of steps. All member resolution,
//! reconciliation checks, and accessor lookups happen here, so an
//! invocation pays only for reads, coercions, and writes.

use fieldwise_model::{FieldCatalog, Member, Reflect, Setter, Value};

use crate::error::MapError;
use crate::rules::{Rule, RuleKind, RuleSet};

type Step<D, S> = Box<dyn Fn(&mut D, &S) -> Result<(), MapError> + Send + Sync>;

/// The executable batch transform for one (destination, source) pair.
///
/// Steps run in rule-declaration order, auto-matched rules last. A
/// transform is rebuilt wholesale on recompilation, never mutated.
pub struct CompiledTransform<D, S> {
    steps: Vec<Step<D, S>>,
}

impl<D, S> CompiledTransform<D, S> {
    /// Run every step against an existing destination instance.
    pub fn apply(&self, destination: &mut D, source: &S) -> Result<(), MapError> {
        for step in &self.steps {
            step(destination, source)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<D, S> std::fmt::Debug for CompiledTransform<D, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompiledTransform({} steps)", self.steps.len())
    }
}

/// Compile every rule in declaration order.
pub(crate) fn compile<D: Reflect, S: Reflect>(
    rules: &RuleSet<S>,
    destinations: &FieldCatalog<D>,
    sources: &FieldCatalog<S>,
) -> Result<CompiledTransform<D, S>, MapError> {
    let mut steps = Vec::with_capacity(rules.len());
    for rule in rules.iter() {
        steps.push(compile_rule(rule, destinations, sources)?);
    }
    Ok(CompiledTransform { steps })
}

fn compile_rule<D: Reflect, S: Reflect>(
    rule: &Rule<S>,
    destinations: &FieldCatalog<D>,
    sources: &FieldCatalog<S>,
) -> Result<Step<D, S>, MapError> {
    let member = destinations
        .get_by_key(rule.key())
        .ok_or_else(|| MapError::UnknownDestination {
            name: rule.destination().to_string(),
        })?;
    let setter = writable_setter(member, rule.destination())?;
    let condition = rule.condition().cloned();
    let destination = rule.destination().to_string();
    // Scalar destinations fail loudly on conversion errors; string and
    // opaque destinations degrade to a skipped assignment.
    let strict = member.kind().is_scalar();

    match rule.kind() {
        RuleKind::Direct { source } => {
            let source_member =
                sources.get(source).ok_or_else(|| MapError::UnknownSource {
                    name: source.clone(),
                })?;
            if strict && !member.kind().accepts(source_member.kind()) {
                return Err(MapError::Irreconcilable {
                    destination,
                    destination_type: member.type_name(),
                    source_member: source.clone(),
                    source_type: source_member.type_name(),
                });
            }
            let getter =
                source_member
                    .getter()
                    .ok_or_else(|| MapError::UnknownSource {
                        name: source.clone(),
                    })?;
            Ok(Box::new(move |d, s| {
                if gated(&condition, s) {
                    return Ok(());
                }
                assign(d, &setter, getter(s), strict, &destination)
            }))
        }
        RuleKind::Compute { value } => {
            let value = value.clone();
            Ok(Box::new(move |d, s| {
                if gated(&condition, s) {
                    return Ok(());
                }
                assign(d, &setter, value(s), strict, &destination)
            }))
        }
        RuleKind::Set { value } => {
            let value = value.clone();
            Ok(Box::new(move |d, s| {
                if gated(&condition, s) {
                    return Ok(());
                }
                // explicit assignment is lenient by contract
                assign(d, &setter, value.clone(), false, &destination)
            }))
        }
        RuleKind::SetWith { value } => {
            let value = value.clone();
            Ok(Box::new(move |d, s| {
                if gated(&condition, s) {
                    return Ok(());
                }
                assign(d, &setter, value(s), false, &destination)
            }))
        }
    }
}

fn writable_setter<D>(member: &Member<D>, destination: &str) -> Result<Setter<D>, MapError> {
    // destination catalogs only hold writable members; kept as a guard so
    // a hand-built catalog cannot panic the compiler
    member.setter().ok_or_else(|| MapError::UnknownDestination {
        name: destination.to_string(),
    })
}

fn gated<S>(condition: &Option<crate::rules::Condition<S>>, source: &S) -> bool {
    matches!(condition, Some(condition) if !condition(source))
}

fn assign<D>(
    destination_instance: &mut D,
    setter: &Setter<D>,
    value: Value,
    strict: bool,
    destination: &str,
) -> Result<(), MapError> {
    match setter(destination_instance, value) {
        Ok(_) => Ok(()),
        Err(error) if strict => Err(MapError::Conversion {
            destination: destination.to_string(),
            error,
        }),
        Err(_) => Ok(()),
    }
}
