// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Gatehouse Authors

//! # core-logic
//!
//! A small logic-programming engine for authorization policies written as
//! `allow(actor, action, resource)` and `allow_field(actor, action, resource, field)`
//! rules.
//!
//! The crate provides:
//! - A term model (variables, literals, typed instance patterns, lists)
//! - A type registry describing host-side types (attributes, methods, constructors)
//! - A unifier producing immutable, append-only bindings
//! - A rule store indexed by predicate name and arity
//! - A lazy, depth-first, backtracking resolver
//! - A decision API (`is_allowed`, `allowed_fields`) over atomically published
//!   policy snapshots
//!
//! ## Example
//!
//! ```
//! use core_logic::{Policy, RuleBuilder, Term, TypeRegistry, Value};
//!
//! let policy = Policy::new(TypeRegistry::new());
//! policy
//!     .load(vec![RuleBuilder::new("allow")
//!         .arg(Term::var("_actor"))
//!         .arg(Term::string("read"))
//!         .arg(Term::string("docs"))
//!         .build()
//!         .unwrap()])
//!     .unwrap();
//!
//! assert!(policy.is_allowed(Value::string("alice"), "read", Value::string("docs")).unwrap());
//! assert!(!policy.is_allowed(Value::string("alice"), "write", Value::string("docs")).unwrap());
//! ```
//!
//! ## Limits
//!
//! - `MAX_RULES_PER_POLICY` = 1024 (default, configurable)
//! - `MAX_GOALS_PER_RULE` = 64 (default, configurable)
//! - `MAX_PREDICATE_NAME_LENGTH` = 128
//! - `DEFAULT_MAX_DEPTH` = 128 nested predicate calls per query

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authorizer;
pub mod bindings;
pub mod builder;
pub mod config;
pub mod document;
pub mod error;
pub mod host;
pub mod knowledge;
pub mod policy;
pub mod registry;
pub mod resolver;
pub mod rule;
pub mod term;
pub mod unify;
pub mod validation;

pub use authorizer::{Authorizer, Decision, PolicyAuthorizer};
pub use bindings::Bindings;
pub use builder::RuleBuilder;
pub use config::EngineConfig;
pub use document::PolicyDocument;
pub use error::{HostError, PolicyError, QueryError, Result};
pub use host::{HostBridge, HostObject, Instance};
pub use knowledge::RuleStore;
pub use policy::{LoadReport, Policy, PolicySnapshot};
pub use registry::{Constructor, TypeDecl, TypeDescriptor, TypeRegistry};
pub use resolver::Solutions;
pub use rule::{Goal, Rule};
pub use term::{InstanceMatch, Literal, Symbol, Term, Value};
pub use validation::PolicyWarning;

/// Default maximum number of rules accepted in a single load
pub const MAX_RULES_PER_POLICY: usize = 1024;

/// Default maximum number of goals in one rule body
pub const MAX_GOALS_PER_RULE: usize = 64;

/// Maximum length of a predicate name
pub const MAX_PREDICATE_NAME_LENGTH: usize = 128;

/// Default ceiling on nested predicate calls within one query
pub const DEFAULT_MAX_DEPTH: usize = 128;
