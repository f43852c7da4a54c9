// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Gatehouse Authors

//! # gatehouse
//!
//! Authorization rules written as a small logic program and evaluated
//! against host objects.
//!
//! Policies are sets of `allow(actor, action, resource)` and
//! `allow_field(actor, action, resource, field)` rules. The engine
//! answers two questions: may this actor do this, and which fields may it
//! touch.
//!
//! ## Quick Start
//!
//! ```rust
//! use gatehouse::policy::{Goal, Policy, Rule, Term, TypeRegistry, Value};
//!
//! let policy = Policy::new(TypeRegistry::new());
//! policy
//!     .load(vec![Rule::new(
//!         "allow_field",
//!         vec![
//!             Term::var("_actor"),
//!             Term::string("read"),
//!             Term::var("_doc"),
//!             Term::var("field"),
//!         ],
//!         vec![Goal::member(Term::var("field"), Term::strings(["title", "summary"]))],
//!     )])
//!     .unwrap();
//!
//! let fields = policy
//!     .allowed_fields(Value::string("alice"), "read", Value::string("doc1"))
//!     .unwrap();
//! assert_eq!(fields.len(), 2);
//! ```
//!
//! ## Architecture
//!
//! This facade crate re-exports:
//!
//! - [`policy`] - the evaluation engine (from `core-logic`)
//! - [`documents`] - YAML/TOML/JSON policy documents (from `app-utils`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Policy engine module.
///
/// Re-exports `core_logic`: terms, rules, the type registry, the resolver
/// and the decision API.
pub mod policy {
    pub use core_logic::*;
}

/// Policy document module.
///
/// Re-exports `app_utils` for parsing and loading policy files.
pub mod documents {
    pub use app_utils::*;
}

// Convenience re-exports at root level
pub use core_logic::{Authorizer, Decision, Policy, PolicyDocument, TypeRegistry, Value};
