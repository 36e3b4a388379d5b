//! Rule-driven object mapping between reflected types.
//!
//! A [`Mapper`] carries a set of per-member rules from a source type onto a
//! destination type. Members pair up automatically by name (or through a
//! custom [`PairMatcher`]), explicit rules override or skip individual
//! members, and the whole rule set compiles lazily into a reusable batch
//! transform on the first map call. The [`MapperRegistry`] caches one
//! mapper per type pair and configuration.
//!
//! Types opt in by implementing [`fieldwise_model::Reflect`], which
//! registers the member accessors everything here is built on.

#![deny(unsafe_code)]

pub mod compile;
pub mod error;
pub mod mapper;
pub mod matcher;
pub mod registry;
pub mod rules;
pub mod table;

pub use compile::CompiledTransform;
pub use error::{MapError, Result};
pub use mapper::{Mapper, MapperConfig};
pub use matcher::{MatcherChain, MemberPair, NameMatcher, PairMatcher};
pub use registry::MapperRegistry;
pub use rules::{Condition, RuleOrigin, RuleSet, RuleSetStats, RuleSummary, ValueFn};
pub use table::TableMatcher;
