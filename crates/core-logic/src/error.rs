//! Error types for core-logic
//!
//! Three layers, matching when each error can happen:
//! - [`PolicyError`]: raised while loading rules, before any query runs
//! - [`QueryError`]: aborts a single query (distinct from a clean denial)
//! - [`HostError`]: raised at the host bridge; usually just fails one goal

use thiserror::Error;

/// Result type alias for load-time operations
pub type Result<T> = core::result::Result<T, PolicyError>;

/// Errors reported while loading a policy
///
/// A load that fails with any of these leaves the previously published
/// snapshot untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Rule structure is invalid
    #[error("rule #{index} `{rule}` is malformed: {reason}")]
    MalformedRule {
        /// Position of the rule in the loaded batch
        index: usize,
        /// Rendered rule text
        rule: String,
        /// What is wrong with it
        reason: String,
    },

    /// A pattern, constructor or class literal names an unregistered type
    #[error("rule #{index} `{rule}` references unknown type `{type_name}`{hint}")]
    UnknownType {
        /// Position of the rule in the loaded batch
        index: usize,
        /// Rendered rule text
        rule: String,
        /// The unresolved type name
        type_name: String,
        /// Optional ", did you mean X?" suffix
        hint: String,
    },

    /// A variable is consumed before the head or an earlier goal binds it
    #[error("rule #{index} `{rule}` uses variable `{variable}` before it is bound")]
    UnboundVariable {
        /// Position of the rule in the loaded batch
        index: usize,
        /// Rendered rule text
        rule: String,
        /// Offending variable
        variable: String,
    },

    /// A method call disagrees with the registered arity
    #[error(
        "rule #{index} `{rule}` calls `{type_name}.{method}` with {found} argument(s), expected {expected}"
    )]
    BadArity {
        /// Position of the rule in the loaded batch
        index: usize,
        /// Rendered rule text
        rule: String,
        /// Receiver type
        type_name: String,
        /// Method name
        method: String,
        /// Registered arity
        expected: usize,
        /// Arity used in the rule
        found: usize,
    },

    /// Batch exceeds the configured rule limit
    #[error("policy exceeds maximum {max} rules (attempted: {attempted})")]
    TooManyRules {
        /// Maximum allowed rules
        max: usize,
        /// Attempted number of rules
        attempted: usize,
    },

    /// A rule body exceeds the configured goal limit
    #[error("rule #{index} `{rule}`: {length} goals, maximum is {max}")]
    TooManyGoals {
        /// Position of the rule in the loaded batch
        index: usize,
        /// Rendered rule text
        rule: String,
        /// Maximum allowed goals
        max: usize,
        /// Actual body length
        length: usize,
    },

    /// Predicate name exceeds `MAX_PREDICATE_NAME_LENGTH`
    #[error("rule #{index} `{rule}`: name exceeds maximum {max} characters (length: {length})")]
    NameTooLong {
        /// Position of the rule in the loaded batch
        index: usize,
        /// Rendered rule text
        rule: String,
        /// Maximum allowed length
        max: usize,
        /// Actual name length
        length: usize,
    },

    /// Policy document name exceeds `MAX_PREDICATE_NAME_LENGTH`
    #[error("policy name exceeds maximum {max} characters (length: {length})")]
    PolicyNameTooLong {
        /// Maximum allowed length
        max: usize,
        /// Actual name length
        length: usize,
    },

    /// A type declaration could not be registered
    #[error("invalid type declaration `{type_name}`: {reason}")]
    InvalidType {
        /// Declared type name
        type_name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Document or configuration could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for PolicyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors that abort a query
///
/// These are reported as an indeterminate decision, never folded into a denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Nested predicate calls went deeper than the configured ceiling
    #[error("recursion limit of {max_depth} exceeded while solving `{predicate}`")]
    RecursionLimitExceeded {
        /// Configured ceiling
        max_depth: usize,
        /// Predicate being called when the ceiling was hit
        predicate: String,
    },

    /// The host broke the bridge contract (unregistered type, explicit violation)
    #[error("host contract violation: {0}")]
    HostContract(String),
}

/// Errors raised by host objects or by the bridge on their behalf
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Attribute is not readable on this type
    #[error("`{type_name}` has no readable attribute `{attribute}`")]
    MissingAttribute {
        /// Receiver type
        type_name: String,
        /// Requested attribute
        attribute: String,
    },

    /// Method is not invokable on this type
    #[error("`{type_name}` has no method `{method}`")]
    MissingMethod {
        /// Receiver type
        type_name: String,
        /// Requested method
        method: String,
    },

    /// Value of the wrong shape crossed the boundary
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The host call itself failed
    #[error("host call failed: {0}")]
    Failed(String),

    /// The host signals that the engine misused it
    #[error("contract violation: {0}")]
    ContractViolation(String),
}

impl HostError {
    /// Whether this error must abort the query instead of failing one goal
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}

impl From<HostError> for QueryError {
    fn from(err: HostError) -> Self {
        Self::HostContract(err.to_string())
    }
}
