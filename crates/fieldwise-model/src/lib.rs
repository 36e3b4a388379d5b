#![deny(unsafe_code)]

//! Data model for the fieldwise mapping engine.
//!
//! This crate provides the building blocks the mapping crate compiles
//! against:
//!
//! - **value**: the [`Value`] union carried between members, with checked
//!   scalar coercion and type-erased opaque payloads
//! - **member**: accessor descriptors registered once per type via
//!   [`Reflect`]
//! - **catalog**: per-role member lookup tables with a fixed case policy

pub mod catalog;
pub mod error;
pub mod member;
pub mod value;

pub use catalog::{CasePolicy, FieldCatalog};
pub use error::{ConvertError, Result};
pub use member::{Assigned, Getter, Member, MemberSpec, Members, Reflect, Setter};
pub use value::{Coerced, FieldValue, OpaqueValue, Value, ValueKind};
