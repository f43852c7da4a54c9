//! Policies and snapshots
//!
//! A [`PolicySnapshot`] is an immutable, versioned rule base: the indexed
//! rules, the registry they were validated against, the engine limits and
//! the load warnings. A [`Policy`] publishes snapshots. Loading validates a
//! whole batch, builds a new snapshot, and swaps it in; queries clone the
//! current `Arc` and keep using it even if a reload happens meanwhile.
//!
//! ## Security Constraints
//!
//! - `max_rules` (default 1024): rules per load
//! - `max_goals` (default 64): goals per rule body
//! - `max_depth` (default 128): nested predicate calls per query

use crate::authorizer::{Decision, PolicyAuthorizer};
use crate::config::EngineConfig;
use crate::document::PolicyDocument;
use crate::error::{QueryError, Result};
use crate::knowledge::RuleStore;
use crate::registry::TypeRegistry;
use crate::resolver::Solutions;
use crate::rule::{Goal, Rule};
use crate::term::{Term, Value};
use crate::validation::{self, PolicyWarning};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable, versioned rule base
#[derive(Debug)]
pub struct PolicySnapshot {
    rules: RuleStore,
    registry: Arc<TypeRegistry>,
    config: EngineConfig,
    version: u64,
    warnings: Vec<PolicyWarning>,
}

impl PolicySnapshot {
    /// Validate `rules` and index them
    ///
    /// # Errors
    ///
    /// Any load-time error from validation; see [`validation::validate`]
    pub fn build(
        rules: Vec<Rule>,
        registry: Arc<TypeRegistry>,
        config: EngineConfig,
        version: u64,
    ) -> Result<Self> {
        let warnings = validation::validate(&rules, &registry, &config)?;
        Ok(Self {
            rules: RuleStore::new(rules),
            registry,
            config,
            version,
            warnings,
        })
    }

    /// Snapshot with no rules (every query denies)
    #[must_use]
    pub fn empty(registry: Arc<TypeRegistry>, config: EngineConfig) -> Self {
        Self {
            rules: RuleStore::default(),
            registry,
            config,
            version: 0,
            warnings: Vec::new(),
        }
    }

    /// Indexed rules
    #[must_use]
    pub const fn rules(&self) -> &RuleStore {
        &self.rules
    }

    /// Registry the rules were validated against
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Engine limits
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Publication counter; 0 for the initial empty snapshot
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Warnings produced when this snapshot was loaded
    #[must_use]
    pub fn warnings(&self) -> &[PolicyWarning] {
        &self.warnings
    }

    /// Solve a conjunction of goals lazily
    #[must_use]
    pub fn solve(self: &Arc<Self>, goals: Vec<Goal>) -> Solutions {
        Solutions::new(Arc::clone(self), goals)
    }
}

/// Summary of a successful load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Version of the published snapshot
    pub version: u64,
    /// Number of rules loaded
    pub rules: usize,
    /// Number of distinct `(name, arity)` predicates
    pub predicates: usize,
    /// Non-fatal findings
    pub warnings: Vec<PolicyWarning>,
}

/// Publisher of policy snapshots
///
/// # Example
///
/// ```
/// use core_logic::{Goal, Policy, RuleBuilder, Term, TypeRegistry, Value};
///
/// let policy = Policy::new(TypeRegistry::new());
/// let report = policy
///     .load(vec![
///         RuleBuilder::new("allow")
///             .arg(Term::var("actor"))
///             .arg(Term::string("read"))
///             .arg(Term::var("_resource"))
///             .when(Goal::member(Term::var("actor"), Term::strings(["alice", "bob"])))
///             .build()
///             .unwrap(),
///     ])
///     .unwrap();
///
/// assert_eq!(report.version, 1);
/// assert!(policy.is_allowed(Value::string("bob"), "read", Value::string("doc")).unwrap());
/// assert!(!policy.is_allowed(Value::string("eve"), "read", Value::string("doc")).unwrap());
/// ```
#[derive(Debug)]
pub struct Policy {
    registry: Arc<TypeRegistry>,
    config: EngineConfig,
    current: RwLock<Arc<PolicySnapshot>>,
}

impl Policy {
    /// Empty policy with default limits
    #[must_use]
    pub fn new(registry: TypeRegistry) -> Self {
        Self::from_parts(registry, EngineConfig::default())
    }

    /// Empty policy with custom limits
    ///
    /// # Errors
    ///
    /// `Serialization` if `config` fails [`EngineConfig::validate`]
    pub fn with_config(registry: TypeRegistry, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(registry, config))
    }

    fn from_parts(registry: TypeRegistry, config: EngineConfig) -> Self {
        let registry = Arc::new(registry);
        let empty = PolicySnapshot::empty(Arc::clone(&registry), config);
        Self {
            registry,
            config,
            current: RwLock::new(Arc::new(empty)),
        }
    }

    /// Policy built from a document
    ///
    /// The document's type declarations are added to `registry` (which
    /// carries the host constructors), then its rules are loaded.
    ///
    /// # Errors
    ///
    /// `InvalidType` for a rejected declaration, an invalid `config`, or
    /// any load error
    pub fn from_document(
        document: PolicyDocument,
        mut registry: TypeRegistry,
        config: EngineConfig,
    ) -> Result<(Self, LoadReport)> {
        document.declare_types(&mut registry)?;
        let policy = Self::with_config(registry, config)?;
        let report = policy.load(document.into_rules())?;
        Ok((policy, report))
    }

    /// Type registry shared by every snapshot
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Engine limits
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current snapshot
    ///
    /// Hold on to it to evaluate several queries against the same rules.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Version of the current snapshot
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.read().version()
    }

    /// Validate and publish a new rule set, replacing the current one
    ///
    /// In-flight queries keep the snapshot they started with.
    ///
    /// # Errors
    ///
    /// Any load-time error; the current snapshot is left untouched
    pub fn load(&self, rules: Vec<Rule>) -> Result<LoadReport> {
        let rule_count = rules.len();
        // Validation happens outside the lock; the version is fixed at swap time
        let mut snapshot =
            PolicySnapshot::build(rules, Arc::clone(&self.registry), self.config, 0)?;

        for warning in snapshot.warnings() {
            warn!(%warning, "policy warning");
        }

        let mut current = self.current.write();
        snapshot.version = current.version() + 1;
        let report = LoadReport {
            version: snapshot.version,
            rules: rule_count,
            predicates: snapshot.rules().signatures().count(),
            warnings: snapshot.warnings().to_vec(),
        };
        *current = Arc::new(snapshot);
        drop(current);

        debug!(
            version = report.version,
            rules = report.rules,
            predicates = report.predicates,
            "policy published"
        );
        Ok(report)
    }

    /// Solve `name(args...)` against the current snapshot
    #[must_use]
    pub fn query(&self, name: &str, args: Vec<Term>) -> Solutions {
        self.snapshot().solve(vec![Goal::call(name, args)])
    }

    /// Whether `actor` may perform `action` on `resource`
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if evaluation broke before an answer was found
    pub fn is_allowed(
        &self,
        actor: impl Into<Value>,
        action: &str,
        resource: impl Into<Value>,
    ) -> core::result::Result<bool, QueryError> {
        let snapshot = self.snapshot();
        PolicyAuthorizer::new(&snapshot).is_allowed(actor.into(), action, resource.into())
    }

    /// Fields of `resource` that `actor` may access with `action`
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if evaluation broke while enumerating
    pub fn allowed_fields(
        &self,
        actor: impl Into<Value>,
        action: &str,
        resource: impl Into<Value>,
    ) -> core::result::Result<BTreeSet<String>, QueryError> {
        let snapshot = self.snapshot();
        PolicyAuthorizer::new(&snapshot).allowed_fields(actor.into(), action, resource.into())
    }

    /// `is_allowed` folded into a three-way decision
    #[must_use]
    pub fn decide(
        &self,
        actor: impl Into<Value>,
        action: &str,
        resource: impl Into<Value>,
    ) -> Decision {
        let snapshot = self.snapshot();
        PolicyAuthorizer::new(&snapshot).decide(actor.into(), action, resource.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RuleBuilder;
    use crate::error::PolicyError;

    fn fact(action: &str) -> Rule {
        RuleBuilder::new("allow")
            .arg(Term::var("_actor"))
            .arg(Term::string(action))
            .arg(Term::var("_resource"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_policy_denies() {
        let policy = Policy::new(TypeRegistry::new());
        assert_eq!(policy.version(), 0);
        assert!(!policy.is_allowed("alice", "read", "doc").unwrap());
        assert!(policy.allowed_fields("alice", "read", "doc").unwrap().is_empty());
    }

    #[test]
    fn test_load_bumps_version() {
        let policy = Policy::new(TypeRegistry::new());
        let report = policy.load(vec![fact("read")]).unwrap();
        assert_eq!(report.version, 1);
        assert_eq!(report.rules, 1);
        assert_eq!(report.predicates, 1);

        let report = policy.load(vec![fact("read"), fact("write")]).unwrap();
        assert_eq!(report.version, 2);
        assert!(policy.is_allowed("alice", "write", "doc").unwrap());
    }

    #[test]
    fn test_failed_load_keeps_previous_snapshot() {
        let policy = Policy::new(TypeRegistry::new());
        policy.load(vec![fact("read")]).unwrap();

        let bad = Rule::new("allow", vec![Term::typed("_a", "Ghost")], vec![]);
        assert!(matches!(
            policy.load(vec![fact("write"), bad]),
            Err(PolicyError::UnknownType { index: 1, .. })
        ));

        assert_eq!(policy.version(), 1);
        assert!(policy.is_allowed("alice", "read", "doc").unwrap());
        assert!(!policy.is_allowed("alice", "write", "doc").unwrap());
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let policy = Policy::new(TypeRegistry::new());
        policy.load(vec![fact("read")]).unwrap();

        let old = policy.snapshot();
        policy.load(vec![fact("write")]).unwrap();

        let mut solutions = old.solve(vec![Goal::call(
            "allow",
            vec![Term::string("a"), Term::string("read"), Term::string("b")],
        )]);
        assert!(matches!(solutions.next(), Some(Ok(_))));
        assert_eq!(old.version(), 1);
        assert_eq!(policy.version(), 2);
    }

    #[test]
    fn test_query_exposes_bindings() {
        let policy = Policy::new(TypeRegistry::new());
        policy
            .load(vec![
                Rule::new("role", vec![Term::string("alice"), Term::string("admin")], vec![]),
                Rule::new("role", vec![Term::string("bob"), Term::string("member")], vec![]),
            ])
            .unwrap();

        let names: Vec<String> = policy
            .query("role", vec![Term::var("who"), Term::var("_role")])
            .map(|env| env.unwrap().string_of("who").unwrap())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_with_config_validates_limits() {
        assert!(matches!(
            Policy::with_config(TypeRegistry::new(), EngineConfig::default().with_max_depth(0)),
            Err(PolicyError::Serialization(msg)) if msg.contains("max_depth")
        ));
        let document = PolicyDocument::new("empty", 1, vec![], vec![]).unwrap();
        let config = EngineConfig::default().with_max_rules(0);
        assert!(Policy::from_document(document, TypeRegistry::new(), config).is_err());
    }

    #[test]
    fn test_rule_limit_comes_from_config() {
        let rules: Vec<Rule> = (0..1100)
            .map(|i| Rule::new("fact", vec![Term::integer(i)], vec![]))
            .collect();

        assert!(matches!(
            Policy::new(TypeRegistry::new()).load(rules.clone()),
            Err(PolicyError::TooManyRules { max: 1024, attempted: 1100 })
        ));

        let config = EngineConfig::default().with_max_rules(2048);
        let policy = Policy::with_config(TypeRegistry::new(), config).unwrap();
        assert_eq!(policy.load(rules).unwrap().rules, 1100);
    }
}
