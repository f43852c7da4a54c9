//! Rules and goals
//!
//! A [`Rule`] is a head (`name(args...)`) plus a body: a conjunction of
//! [`Goal`]s evaluated left to right. Several rules with the same name and
//! arity are alternatives (logical OR), tried in load order.

use crate::term::{Symbol, Term};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One conjunct of a rule body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Call another predicate (or the same one, recursively)
    #[serde(rename = "call")]
    PredicateCall {
        /// Predicate name
        name: String,
        /// Arguments, unified against the callee's head
        #[serde(default)]
        args: Vec<Term>,
    },

    /// Structural unification of two terms
    #[serde(rename = "unify")]
    Unification(Term, Term),

    /// Read `receiver.attribute` and unify it with `bound_to`
    #[serde(rename = "attribute")]
    AttributeAccess {
        /// Term resolving to the receiver
        receiver: Term,
        /// Attribute name
        attribute: String,
        /// Term unified with the attribute value
        bound_to: Term,
    },

    /// Invoke `receiver.method(args...)` and unify the result with `bound_to`
    #[serde(rename = "method")]
    MethodCall {
        /// Term resolving to the receiver
        receiver: Term,
        /// Method name
        method: String,
        /// Arguments, resolved before the call
        #[serde(default)]
        args: Vec<Term>,
        /// Term unified with the return value
        bound_to: Term,
    },

    /// `item in list`
    #[serde(rename = "member")]
    Membership {
        /// Element term; unbound variables are bound to each element in turn
        item: Term,
        /// Term resolving to a list
        list: Term,
    },

    /// Build a host value with the type's constructor and unify it with `bound_to`
    #[serde(rename = "construct")]
    Construct {
        /// Registered type
        #[serde(rename = "type")]
        type_name: String,
        /// Constructor arguments
        #[serde(default)]
        args: Vec<Term>,
        /// Term unified with the constructed value
        bound_to: Term,
    },
}

impl Goal {
    /// `name(args...)`
    #[must_use]
    pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = Term>) -> Self {
        Self::PredicateCall {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// `left = right`
    #[must_use]
    pub fn unify(left: Term, right: Term) -> Self {
        Self::Unification(left, right)
    }

    /// `receiver.attribute = bound_to`
    #[must_use]
    pub fn attribute(receiver: Term, attribute: impl Into<String>, bound_to: Term) -> Self {
        Self::AttributeAccess {
            receiver,
            attribute: attribute.into(),
            bound_to,
        }
    }

    /// `receiver.method(args...) = bound_to`
    #[must_use]
    pub fn method(
        receiver: Term,
        method: impl Into<String>,
        args: impl IntoIterator<Item = Term>,
        bound_to: Term,
    ) -> Self {
        Self::MethodCall {
            receiver,
            method: method.into(),
            args: args.into_iter().collect(),
            bound_to,
        }
    }

    /// `item in list`
    #[must_use]
    pub fn member(item: Term, list: Term) -> Self {
        Self::Membership { item, list }
    }

    /// `bound_to = new Type(args...)`
    #[must_use]
    pub fn construct(
        type_name: impl Into<String>,
        args: impl IntoIterator<Item = Term>,
        bound_to: Term,
    ) -> Self {
        Self::Construct {
            type_name: type_name.into(),
            args: args.into_iter().collect(),
            bound_to,
        }
    }

    /// Terms that must already be bound when the goal runs
    #[must_use]
    pub fn inputs(&self) -> Vec<&Term> {
        match self {
            Self::PredicateCall { .. } | Self::Unification(..) => Vec::new(),
            Self::AttributeAccess { receiver, .. } => vec![receiver],
            Self::MethodCall { receiver, args, .. } => {
                core::iter::once(receiver).chain(args.iter()).collect()
            }
            Self::Membership { list, .. } => vec![list],
            Self::Construct { args, .. } => args.iter().collect(),
        }
    }

    /// Every term mentioned by the goal
    #[must_use]
    pub fn terms(&self) -> Vec<&Term> {
        match self {
            Self::PredicateCall { args, .. } => args.iter().collect(),
            Self::Unification(left, right) => vec![left, right],
            Self::AttributeAccess {
                receiver, bound_to, ..
            } => vec![receiver, bound_to],
            Self::MethodCall {
                receiver,
                args,
                bound_to,
                ..
            } => core::iter::once(receiver)
                .chain(args.iter())
                .chain(core::iter::once(bound_to))
                .collect(),
            Self::Membership { item, list } => vec![item, list],
            Self::Construct { args, bound_to, .. } => {
                args.iter().chain(core::iter::once(bound_to)).collect()
            }
        }
    }

    /// Copy with every variable moved to `generation`
    #[must_use]
    pub fn renamed(&self, generation: u64) -> Self {
        let r = |t: &Term| t.renamed(generation);
        let rs = |ts: &Vec<Term>| -> Vec<Term> {
            ts.iter().map(|t| t.renamed(generation)).collect()
        };
        match self {
            Self::PredicateCall { name, args } => Self::PredicateCall {
                name: name.clone(),
                args: rs(args),
            },
            Self::Unification(left, right) => Self::Unification(r(left), r(right)),
            Self::AttributeAccess {
                receiver,
                attribute,
                bound_to,
            } => Self::AttributeAccess {
                receiver: r(receiver),
                attribute: attribute.clone(),
                bound_to: r(bound_to),
            },
            Self::MethodCall {
                receiver,
                method,
                args,
                bound_to,
            } => Self::MethodCall {
                receiver: r(receiver),
                method: method.clone(),
                args: rs(args),
                bound_to: r(bound_to),
            },
            Self::Membership { item, list } => Self::Membership {
                item: r(item),
                list: r(list),
            },
            Self::Construct {
                type_name,
                args,
                bound_to,
            } => Self::Construct {
                type_name: type_name.clone(),
                args: rs(args),
                bound_to: r(bound_to),
            },
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PredicateCall { name, args } => {
                write!(f, "{}(", name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Self::Unification(left, right) => write!(f, "{} = {}", left, right),
            Self::AttributeAccess {
                receiver,
                attribute,
                bound_to,
            } => write!(f, "{}.{} = {}", receiver, attribute, bound_to),
            Self::MethodCall {
                receiver,
                method,
                args,
                bound_to,
            } => {
                write!(f, "{}.{}(", receiver, method)?;
                write_args(f, args)?;
                write!(f, ") = {}", bound_to)
            }
            Self::Membership { item, list } => write!(f, "{} in {}", item, list),
            Self::Construct {
                type_name,
                args,
                bound_to,
            } => {
                write!(f, "{} = new {}(", bound_to, type_name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}

/// Head plus body
///
/// An empty body makes the rule an unconditional fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Predicate name
    pub name: String,
    /// Head parameters
    #[serde(default)]
    pub args: Vec<Term>,
    /// Conjunction of goals
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<Goal>,
}

impl Rule {
    /// Create a rule
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<Term>, body: Vec<Goal>) -> Self {
        Self {
            name: name.into(),
            args,
            body,
        }
    }

    /// Number of head parameters
    #[must_use]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Whether the rule has no body
    #[must_use]
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Head and body with every variable moved to `generation`
    #[must_use]
    pub fn instantiate(&self, generation: u64) -> (Vec<Term>, Vec<Goal>) {
        (
            self.args.iter().map(|t| t.renamed(generation)).collect(),
            self.body.iter().map(|g| g.renamed(generation)).collect(),
        )
    }

    /// Every variable occurrence in head then body, in order
    #[must_use]
    pub fn variables(&self) -> Vec<&Symbol> {
        let mut vars = Vec::new();
        for arg in &self.args {
            arg.for_each_var(&mut |v| vars.push(v));
        }
        for goal in &self.body {
            for term in goal.terms() {
                term.for_each_var(&mut |v| vars.push(v));
            }
        }
        vars
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        write_args(f, &self.args)?;
        write!(f, ")")?;
        for (i, goal) in self.body.iter().enumerate() {
            if i == 0 {
                write!(f, " if {}", goal)?;
            } else {
                write!(f, " and {}", goal)?;
            }
        }
        write!(f, ";")
    }
}
