//! Load-time validation
//!
//! [`validate`] checks a whole batch of rules against a registry before any
//! of them is published. Structural problems are errors and abort the load;
//! suspicious but legal constructs are returned as [`PolicyWarning`]s.

use crate::config::EngineConfig;
use crate::error::{PolicyError, Result};
use crate::registry::TypeRegistry;
use crate::rule::{Goal, Rule};
use crate::term::{Literal, Symbol, Term, Value};
use crate::MAX_PREDICATE_NAME_LENGTH;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Non-fatal finding reported by a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyWarning {
    /// A named variable occurs only once in its rule
    SingletonVariable {
        /// Position of the rule in the loaded batch
        index: usize,
        /// Rendered rule text
        rule: String,
        /// The variable
        variable: String,
    },

    /// A body calls a predicate with no rules of that arity
    UndefinedPredicate {
        /// Position of the calling rule in the loaded batch
        index: usize,
        /// Called predicate
        predicate: String,
        /// Arity of the call
        arity: usize,
        /// Arities that do exist under the same name
        defined: Vec<usize>,
    },

    /// Registered types whose `specializes` chain loops back to them
    SpecializationCycle {
        /// Types on a cycle
        types: Vec<String>,
    },
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingletonVariable {
                index,
                rule,
                variable,
            } => write!(
                f,
                "rule #{} `{}`: singleton variable `{}` is unused or undefined; \
                 prefix it with `_` if that is intended",
                index, rule, variable
            ),
            Self::UndefinedPredicate {
                index,
                predicate,
                arity,
                defined,
            } => {
                write!(
                    f,
                    "rule #{} calls `{}/{}`, which has no rules",
                    index, predicate, arity
                )?;
                if !defined.is_empty() {
                    let arities: Vec<String> = defined.iter().map(ToString::to_string).collect();
                    write!(f, " (defined with arity {})", arities.join(", "))?;
                }
                Ok(())
            }
            Self::SpecializationCycle { types } => write!(
                f,
                "types {} specialize themselves; dispatch through them may recurse until the depth limit",
                types.join(", ")
            ),
        }
    }
}

/// Built-in type a common misspelling most likely meant
fn builtin_hint(type_name: &str) -> Option<&'static str> {
    let hint = match type_name {
        "bool" | "boolean" | "Bool" => "Boolean",
        "int" | "integer" | "i32" | "i64" | "u32" | "u64" | "usize" | "Int" | "number" => {
            "Integer"
        }
        "str" | "string" | "char" | "Str" => "String",
        "list" | "array" | "Array" | "vec" | "Vec" => "List",
        "dict" | "Dict" | "dictionary" | "hash" | "Hash" | "map" | "Map" | "HashMap"
        | "hashmap" | "hash_map" | "object" | "Object" => "Dictionary",
        "class" | "type" | "Type" => "Class",
        _ => return None,
    };
    Some(hint)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates one rule at a time, tracking what the rule has bound so far
struct RuleCheck<'a> {
    index: usize,
    rule: &'a Rule,
    registry: &'a TypeRegistry,
}

impl<'a> RuleCheck<'a> {
    fn rendered(&self) -> String {
        self.rule.to_string()
    }

    fn malformed(&self, reason: impl Into<String>) -> PolicyError {
        PolicyError::MalformedRule {
            index: self.index,
            rule: self.rendered(),
            reason: reason.into(),
        }
    }

    fn require_type(&self, type_name: &str) -> Result<()> {
        if self.registry.has_type(type_name) {
            return Ok(());
        }
        Err(PolicyError::UnknownType {
            index: self.index,
            rule: self.rendered(),
            type_name: type_name.to_string(),
            hint: builtin_hint(type_name)
                .map(|t| format!(", did you mean {}?", t))
                .unwrap_or_default(),
        })
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name.len() > MAX_PREDICATE_NAME_LENGTH {
            return Err(PolicyError::NameTooLong {
                index: self.index,
                rule: self.rendered(),
                max: MAX_PREDICATE_NAME_LENGTH,
                length: name.len(),
            });
        }
        if !is_identifier(name) {
            return Err(self.malformed(format!("`{}` is not a valid predicate name", name)));
        }
        Ok(())
    }

    /// Types and structure of every pattern and class literal in `term`
    fn check_term(&self, term: &Term) -> Result<()> {
        match term {
            Term::Variable(_) => Ok(()),
            Term::Literal(Literal::Class { class }) => self.require_type(class),
            Term::Literal(_) => Ok(()),
            Term::Value(value) => self.check_value(value),
            Term::List(items) => items.iter().try_for_each(|t| self.check_term(t)),
            Term::Pattern(pattern) => {
                self.require_type(&pattern.type_name)?;
                for (field, sub) in &pattern.fields {
                    if field.is_empty() {
                        return Err(self.malformed(format!(
                            "pattern on `{}` has an empty field name",
                            pattern.type_name
                        )));
                    }
                    self.check_term(sub)?;
                }
                Ok(())
            }
        }
    }

    fn check_value(&self, value: &Value) -> Result<()> {
        match value {
            Value::Literal(Literal::Class { class }) => self.require_type(class),
            Value::List(items) => items.iter().try_for_each(|v| self.check_value(v)),
            Value::Dict(entries) => entries.values().try_for_each(|v| self.check_value(v)),
            Value::Literal(_) | Value::Instance(_) => Ok(()),
        }
    }

    fn check_goal(&self, goal: &Goal, static_types: &BTreeMap<&Symbol, &str>) -> Result<()> {
        goal.terms().into_iter().try_for_each(|t| self.check_term(t))?;

        match goal {
            Goal::PredicateCall { name, .. } => self.check_name(name),
            Goal::AttributeAccess { attribute, .. } if attribute.is_empty() => {
                Err(self.malformed("attribute name cannot be empty"))
            }
            Goal::MethodCall { method, .. } if method.is_empty() => {
                Err(self.malformed("method name cannot be empty"))
            }
            Goal::MethodCall {
                receiver: Term::Variable(var),
                method,
                args,
                ..
            } => {
                let Some(type_name) = static_types.get(var) else {
                    return Ok(());
                };
                match self.registry.method_arity(type_name, method) {
                    Some(expected) if expected != args.len() => Err(PolicyError::BadArity {
                        index: self.index,
                        rule: self.rendered(),
                        type_name: (*type_name).to_string(),
                        method: method.clone(),
                        expected,
                        found: args.len(),
                    }),
                    _ => Ok(()),
                }
            }
            Goal::Construct { type_name, .. } => {
                self.require_type(type_name)?;
                let has_constructor = self
                    .registry
                    .get(type_name)
                    .is_some_and(|desc| desc.constructor.is_some());
                if has_constructor {
                    Ok(())
                } else {
                    Err(self.malformed(format!("type `{}` has no constructor", type_name)))
                }
            }
            _ => Ok(()),
        }
    }

    fn check(&self, max_goals: usize) -> Result<()> {
        self.check_name(&self.rule.name)?;
        if self.rule.body.len() > max_goals {
            return Err(PolicyError::TooManyGoals {
                index: self.index,
                rule: self.rendered(),
                max: max_goals,
                length: self.rule.body.len(),
            });
        }

        let mut bound: BTreeSet<&Symbol> = BTreeSet::new();
        // `param: Type` head parameters give their variable a static type
        let mut static_types: BTreeMap<&Symbol, &str> = BTreeMap::new();
        for arg in &self.rule.args {
            self.check_term(arg)?;
            arg.for_each_var(&mut |v| {
                bound.insert(v);
            });
            if let Term::Pattern(pattern) = arg {
                if let Some(var) = &pattern.bind {
                    static_types.insert(var, pattern.type_name.as_str());
                }
            }
        }

        for goal in &self.rule.body {
            for input in goal.inputs() {
                let mut unbound = None;
                input.for_each_var(&mut |v| {
                    if unbound.is_none() && !bound.contains(v) {
                        unbound = Some(v);
                    }
                });
                if let Some(var) = unbound {
                    return Err(PolicyError::UnboundVariable {
                        index: self.index,
                        rule: self.rendered(),
                        variable: var.name().to_string(),
                    });
                }
            }
            self.check_goal(goal, &static_types)?;
            for term in goal.terms() {
                term.for_each_var(&mut |v| {
                    bound.insert(v);
                });
            }
        }
        Ok(())
    }

    fn singletons(&self) -> Vec<PolicyWarning> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut order = Vec::new();
        for var in self.rule.variables() {
            if var.is_anonymous() {
                continue;
            }
            let count = counts.entry(var.name()).or_insert(0);
            if *count == 0 {
                order.push(var.name());
            }
            *count += 1;
        }
        order
            .into_iter()
            .filter(|name| counts.get(name) == Some(&1))
            .map(|name| PolicyWarning::SingletonVariable {
                index: self.index,
                rule: self.rendered(),
                variable: name.to_string(),
            })
            .collect()
    }
}

/// Validate a batch of rules
///
/// # Errors
///
/// Returns the first problem found, in rule order:
/// - `TooManyRules` if the batch exceeds `config.max_rules`
/// - `NameTooLong`, `MalformedRule` for bad names and structure
/// - `TooManyGoals` if a body exceeds `config.max_goals`
/// - `UnknownType` for patterns, class literals or constructors naming an
///   unregistered type
/// - `UnboundVariable` if a receiver, method argument, membership list or
///   constructor argument is used before anything binds it
/// - `BadArity` if a method call on a statically typed receiver disagrees
///   with the registry
pub fn validate(
    rules: &[Rule],
    registry: &TypeRegistry,
    config: &EngineConfig,
) -> Result<Vec<PolicyWarning>> {
    if rules.len() > config.max_rules {
        return Err(PolicyError::TooManyRules {
            max: config.max_rules,
            attempted: rules.len(),
        });
    }

    let mut warnings = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        let check = RuleCheck {
            index,
            rule,
            registry,
        };
        check.check(config.max_goals)?;
        warnings.extend(check.singletons());
    }

    let mut signatures: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
    for rule in rules {
        signatures
            .entry(rule.name.as_str())
            .or_default()
            .insert(rule.arity());
    }
    let mut reported = BTreeSet::new();
    for (index, rule) in rules.iter().enumerate() {
        for goal in &rule.body {
            let Goal::PredicateCall { name, args } = goal else {
                continue;
            };
            let arities = signatures.get(name.as_str());
            if arities.is_some_and(|a| a.contains(&args.len())) {
                continue;
            }
            if reported.insert((name.as_str(), args.len())) {
                warnings.push(PolicyWarning::UndefinedPredicate {
                    index,
                    predicate: name.clone(),
                    arity: args.len(),
                    defined: arities.map(|a| a.iter().copied().collect()).unwrap_or_default(),
                });
            }
        }
    }

    let cycles = registry.specialization_cycles();
    if !cycles.is_empty() {
        warnings.push(PolicyWarning::SpecializationCycle { types: cycles });
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeDescriptor;
    use crate::term::InstanceMatch;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(
            TypeDescriptor::new("Company")
                .attribute("name")
                .method("role", 1),
        );
        registry
    }

    fn check(rules: Vec<Rule>) -> Result<Vec<PolicyWarning>> {
        validate(&rules, &registry(), &EngineConfig::default())
    }

    #[test]
    fn test_unknown_type_with_hint() {
        let rule = Rule::new("allow", vec![Term::typed("_x", "dict")], vec![]);
        match check(vec![rule]) {
            Err(PolicyError::UnknownType { type_name, hint, .. }) => {
                assert_eq!(type_name, "dict");
                assert_eq!(hint, ", did you mean Dictionary?");
            }
            other => panic!("expected UnknownType, got {:?}", other),
        }

        let rule = Rule::new("allow", vec![Term::typed("_x", "Widget")], vec![]);
        match check(vec![rule]) {
            Err(PolicyError::UnknownType { hint, .. }) => assert!(hint.is_empty()),
            other => panic!("expected UnknownType, got {:?}", other),
        }
    }

    #[test]
    fn test_unbound_receiver() {
        let rule = Rule::new(
            "allow",
            vec![Term::var("_actor")],
            vec![Goal::attribute(Term::var("company"), "name", Term::var("_n"))],
        );
        assert!(matches!(
            check(vec![rule]),
            Err(PolicyError::UnboundVariable { variable, .. }) if variable == "company"
        ));
    }

    #[test]
    fn test_earlier_goal_binds() {
        let rule = Rule::new(
            "allow",
            vec![Term::var("company")],
            vec![
                Goal::attribute(Term::var("company"), "name", Term::var("name")),
                Goal::member(Term::var("name"), Term::strings(["acme"])),
            ],
        );
        assert!(check(vec![rule]).unwrap().is_empty());
    }

    #[test]
    fn test_bad_arity_on_typed_receiver() {
        let rule = Rule::new(
            "allow",
            vec![Term::typed("company", "Company")],
            vec![Goal::method(
                Term::var("company"),
                "role",
                [],
                Term::string("admin"),
            )],
        );
        assert!(matches!(
            check(vec![rule]),
            Err(PolicyError::BadArity { expected: 1, found: 0, .. })
        ));
    }

    #[test]
    fn test_construct_requires_constructor() {
        let rule = Rule::new(
            "allow",
            vec![Term::var("name")],
            vec![Goal::construct("Company", [Term::var("name")], Term::var("_c"))],
        );
        assert!(matches!(
            check(vec![rule]),
            Err(PolicyError::MalformedRule { .. })
        ));
    }

    #[test]
    fn test_bad_names() {
        assert!(matches!(
            check(vec![Rule::new("", vec![], vec![])]),
            Err(PolicyError::MalformedRule { .. })
        ));
        assert!(matches!(
            check(vec![Rule::new("a".repeat(129), vec![], vec![])]),
            Err(PolicyError::NameTooLong { index: 0, max: 128, length: 129, .. })
        ));
        let rule = Rule::new(
            "allow",
            vec![Term::Pattern(InstanceMatch::new("Dictionary").field("", Term::var("_x")))],
            vec![],
        );
        assert!(matches!(check(vec![rule]), Err(PolicyError::MalformedRule { .. })));
    }

    #[test]
    fn test_name_and_goal_errors_locate_the_rule() {
        let long = "p".repeat(200);
        let rules = vec![
            Rule::new("ok", vec![], vec![]),
            Rule::new(
                "allow",
                vec![Term::var("_a")],
                vec![Goal::call(long.as_str(), [Term::var("_a")])],
            ),
        ];
        match check(rules) {
            Err(PolicyError::NameTooLong { index, rule, length, .. }) => {
                assert_eq!(index, 1);
                assert!(rule.starts_with("allow(_a) if"), "{}", rule);
                assert_eq!(length, 200);
            }
            other => panic!("expected NameTooLong, got {:?}", other),
        }

        let body = (0..65)
            .map(|_| Goal::unify(Term::integer(1), Term::integer(1)))
            .collect();
        let rules = vec![Rule::new("ok", vec![], vec![]), Rule::new("busy", vec![], body)];
        let err = check(rules).unwrap_err();
        assert!(matches!(&err, PolicyError::TooManyGoals { index: 1, rule, .. } if rule.starts_with("busy")));
        assert!(err.to_string().starts_with("rule #1 `busy"), "{}", err);
    }

    #[test]
    fn test_limits() {
        let config = EngineConfig::default().with_max_rules(1);
        let rules = vec![Rule::new("a", vec![], vec![]), Rule::new("b", vec![], vec![])];
        assert!(matches!(
            validate(&rules, &registry(), &config),
            Err(PolicyError::TooManyRules { max: 1, attempted: 2 })
        ));

        let body = (0..65)
            .map(|_| Goal::unify(Term::integer(1), Term::integer(1)))
            .collect();
        assert!(matches!(
            check(vec![Rule::new("a", vec![], body)]),
            Err(PolicyError::TooManyGoals { index: 0, max: 64, length: 65, .. })
        ));
    }

    #[test]
    fn test_warnings() {
        let rules = vec![
            Rule::new(
                "allow",
                vec![Term::var("actor"), Term::var("_action")],
                vec![Goal::call("has_role", [Term::var("actor")])],
            ),
            Rule::new("has_role", vec![Term::var("_a"), Term::var("_b")], vec![]),
        ];
        let warnings = check(rules).unwrap();

        assert_eq!(
            warnings,
            vec![PolicyWarning::UndefinedPredicate {
                index: 0,
                predicate: "has_role".to_string(),
                arity: 1,
                defined: vec![2],
            }]
        );
    }

    #[test]
    fn test_singleton_warning() {
        let rule = Rule::new(
            "allow",
            vec![Term::var("actor"), Term::string("read"), Term::var("_r")],
            vec![],
        );
        let warnings = check(vec![rule]).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("singleton variable `actor`"));
    }

    #[test]
    fn test_cycle_warning() {
        let mut registry = registry();
        registry.register(TypeDescriptor::new("A").specializes("B"));
        registry.register(TypeDescriptor::new("B").specializes("A"));
        let warnings = validate(&[], &registry, &EngineConfig::default()).unwrap();
        assert_eq!(
            warnings,
            vec![PolicyWarning::SpecializationCycle {
                types: vec!["A".to_string(), "B".to_string()]
            }]
        );
    }
}
