//! Builder pattern for ergonomic rule construction

use crate::error::{PolicyError, Result};
use crate::rule::{Goal, Rule};
use crate::term::Term;
use crate::MAX_PREDICATE_NAME_LENGTH;

/// Builder for creating [`Rule`] instances with a fluent API
///
/// # Examples
///
/// ```
/// use core_logic::builder::RuleBuilder;
/// use core_logic::{Goal, Term};
///
/// // allow(actor: Actor, "create", company: Company) if company.role(actor) = "admin";
/// let rule = RuleBuilder::new("allow")
///     .arg(Term::typed("actor", "Actor"))
///     .arg(Term::string("create"))
///     .arg(Term::typed("company", "Company"))
///     .when(Goal::method(
///         Term::var("company"),
///         "role",
///         [Term::var("actor")],
///         Term::string("admin"),
///     ))
///     .build()
///     .unwrap();
///
/// assert_eq!(rule.arity(), 3);
/// assert_eq!(
///     rule.to_string(),
///     r#"allow(actor: Actor, "create", company: Company) if company.role(actor) = "admin";"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    name: String,
    args: Vec<Term>,
    body: Vec<Goal>,
}

impl RuleBuilder {
    /// Start a rule for predicate `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Append a head parameter
    #[must_use]
    pub fn arg(mut self, term: impl Into<Term>) -> Self {
        self.args.push(term.into());
        self
    }

    /// Append several head parameters
    #[must_use]
    pub fn args(mut self, terms: impl IntoIterator<Item = Term>) -> Self {
        self.args.extend(terms);
        self
    }

    /// Append a body goal (conjunction)
    #[must_use]
    pub fn when(mut self, goal: Goal) -> Self {
        self.body.push(goal);
        self
    }

    /// Shorthand for `.when(Goal::call(name, args))`
    #[must_use]
    pub fn calls(self, name: impl Into<String>, args: impl IntoIterator<Item = Term>) -> Self {
        self.when(Goal::call(name, args))
    }

    /// Build the `Rule`
    ///
    /// Only the name is checked here. Types, variable binding order and
    /// limits are checked when the rule is loaded into a policy.
    ///
    /// # Errors
    ///
    /// - `NameTooLong` if the name exceeds `MAX_PREDICATE_NAME_LENGTH`
    /// - `MalformedRule` if the name is empty
    pub fn build(self) -> Result<Rule> {
        let rule = Rule::new(self.name, self.args, self.body);
        if rule.name.len() > MAX_PREDICATE_NAME_LENGTH {
            return Err(PolicyError::NameTooLong {
                index: 0,
                rule: rule.to_string(),
                max: MAX_PREDICATE_NAME_LENGTH,
                length: rule.name.len(),
            });
        }
        if rule.name.is_empty() {
            return Err(PolicyError::MalformedRule {
                index: 0,
                rule: rule.to_string(),
                reason: "predicate name is required".to_string(),
            });
        }
        Ok(rule)
    }
}
