//! Authorization decisions
//!
//! [`PolicyAuthorizer`] answers the two decision queries against one
//! snapshot:
//!
//! - `is_allowed(actor, action, resource)`: does `allow(actor, action, resource)`
//!   have at least one solution?
//! - `allowed_fields(actor, action, resource)`: every distinct string bound to
//!   `field` across all solutions of `allow_field(actor, action, resource, field)`
//!
//! A query error is never folded into a denial. Callers who want a single
//! value use [`Decision`], which keeps "denied" and "evaluation broke" apart.

use crate::error::QueryError;
use crate::policy::{Policy, PolicySnapshot};
use crate::rule::Goal;
use crate::term::{Term, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Predicate consulted by `is_allowed`
pub const ALLOW: &str = "allow";

/// Predicate consulted by `allowed_fields`
pub const ALLOW_FIELD: &str = "allow_field";

/// Query variable that `allowed_fields` collects
const FIELD_VAR: &str = "field";

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// At least one rule allows the request
    Allow,
    /// No rule allows the request
    Deny,
    /// Evaluation failed; treat as deny but report separately
    Indeterminate(QueryError),
}

impl Decision {
    /// Only `Allow` permits access
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl From<Result<bool, QueryError>> for Decision {
    fn from(result: Result<bool, QueryError>) -> Self {
        match result {
            Ok(true) => Self::Allow,
            Ok(false) => Self::Deny,
            Err(err) => Self::Indeterminate(err),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
            Self::Indeterminate(err) => write!(f, "indeterminate ({})", err),
        }
    }
}

/// Evaluates decision queries against one snapshot
///
/// ## Example
///
/// ```
/// use core_logic::authorizer::PolicyAuthorizer;
/// use core_logic::{Policy, Rule, Term, TypeRegistry, Value};
///
/// let policy = Policy::new(TypeRegistry::new());
/// policy
///     .load(vec![Rule::new(
///         "allow_field",
///         vec![
///             Term::var("_actor"),
///             Term::string("read"),
///             Term::var("_widget"),
///             Term::string("name"),
///         ],
///         vec![],
///     )])
///     .unwrap();
///
/// let snapshot = policy.snapshot();
/// let authorizer = PolicyAuthorizer::new(&snapshot);
/// let fields = authorizer
///     .allowed_fields(Value::string("alice"), "read", Value::string("w1"))
///     .unwrap();
/// assert!(fields.contains("name"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PolicyAuthorizer<'a> {
    snapshot: &'a Arc<PolicySnapshot>,
}

impl<'a> PolicyAuthorizer<'a> {
    /// Create an authorizer over a snapshot
    #[must_use]
    pub const fn new(snapshot: &'a Arc<PolicySnapshot>) -> Self {
        Self { snapshot }
    }

    /// Check whether `actor` may perform `action` on `resource`
    ///
    /// # Errors
    ///
    /// Returns the `QueryError` hit before the first solution, if any
    pub fn is_allowed(&self, actor: Value, action: &str, resource: Value) -> Result<bool, QueryError> {
        self.snapshot
            .solve(vec![Goal::call(
                ALLOW,
                [
                    Term::Value(actor),
                    Term::string(action),
                    Term::Value(resource),
                ],
            )])
            .exists()
    }

    /// Collect every field `actor` may access with `action` on `resource`
    ///
    /// Bindings that are not strings are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first `QueryError` hit while enumerating; fields found
    /// before it are discarded
    pub fn allowed_fields(
        &self,
        actor: Value,
        action: &str,
        resource: Value,
    ) -> Result<BTreeSet<String>, QueryError> {
        let solutions = self.snapshot.solve(vec![Goal::call(
            ALLOW_FIELD,
            [
                Term::Value(actor),
                Term::string(action),
                Term::Value(resource),
                Term::var(FIELD_VAR),
            ],
        )]);

        let mut fields = BTreeSet::new();
        for bindings in solutions {
            if let Some(field) = bindings?.string_of(FIELD_VAR) {
                fields.insert(field);
            }
        }
        Ok(fields)
    }

    /// Three-way decision for `is_allowed`
    #[must_use]
    pub fn decide(&self, actor: Value, action: &str, resource: Value) -> Decision {
        self.is_allowed(actor, action, resource).into()
    }

    /// Number of rules in the snapshot
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.snapshot.rules().len()
    }
}

/// Anything that can answer decision queries
///
/// Lets embedders depend on the decision API without naming a concrete
/// policy type.
pub trait Authorizer {
    /// Check whether access is allowed
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if evaluation broke
    fn is_allowed(&self, actor: Value, action: &str, resource: Value) -> Result<bool, QueryError>;

    /// Fields accessible with `action`
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if evaluation broke
    fn allowed_fields(
        &self,
        actor: Value,
        action: &str,
        resource: Value,
    ) -> Result<BTreeSet<String>, QueryError>;

    /// Three-way decision
    fn decide(&self, actor: Value, action: &str, resource: Value) -> Decision {
        self.is_allowed(actor, action, resource).into()
    }
}

impl<'a> Authorizer for PolicyAuthorizer<'a> {
    fn is_allowed(&self, actor: Value, action: &str, resource: Value) -> Result<bool, QueryError> {
        PolicyAuthorizer::is_allowed(self, actor, action, resource)
    }

    fn allowed_fields(
        &self,
        actor: Value,
        action: &str,
        resource: Value,
    ) -> Result<BTreeSet<String>, QueryError> {
        PolicyAuthorizer::allowed_fields(self, actor, action, resource)
    }
}

impl Authorizer for Policy {
    fn is_allowed(&self, actor: Value, action: &str, resource: Value) -> Result<bool, QueryError> {
        Policy::is_allowed(self, actor, action, resource)
    }

    fn allowed_fields(
        &self,
        actor: Value,
        action: &str,
        resource: Value,
    ) -> Result<BTreeSet<String>, QueryError> {
        Policy::allowed_fields(self, actor, action, resource)
    }
}
