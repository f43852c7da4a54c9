//! Term model
//!
//! - [`Literal`]: strings, integers, booleans and class references
//! - [`Value`]: ground values that cross the host boundary
//! - [`Term`]: what rules are written in (variables, literals, lists, typed patterns)
//! - [`Symbol`]: a variable identity (name plus renaming generation)

use crate::host::Instance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar constant
///
/// Equality is exact: no coercion between numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Boolean constant
    Bool(bool),
    /// Integer constant
    Integer(i64),
    /// String constant
    String(String),
    /// Reference to a registered type, used as a value
    Class {
        /// Referenced type name
        class: String,
    },
}

impl Literal {
    /// Name of the built-in type this literal belongs to
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::String(_) => "String",
            Self::Class { .. } => "Class",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Class { class } => write!(f, "{}", class),
        }
    }
}

/// Ground value
///
/// Query arguments, host attribute results and constructor outputs are all
/// values. Instances are opaque and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Scalar
    Literal(Literal),
    /// Ordered list
    List(Vec<Value>),
    /// String-keyed dictionary (e.g. `{"sub": "alice"}`)
    Dict(BTreeMap<String, Value>),
    /// Opaque host object
    #[serde(skip)]
    Instance(Instance),
}

impl Value {
    /// String value
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Literal::String(s.into()))
    }

    /// Integer value
    #[must_use]
    pub const fn integer(i: i64) -> Self {
        Self::Literal(Literal::Integer(i))
    }

    /// Boolean value
    #[must_use]
    pub const fn boolean(b: bool) -> Self {
        Self::Literal(Literal::Bool(b))
    }

    /// Reference to a registered type
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::Literal(Literal::Class { class: name.into() })
    }

    /// Dictionary from key/value pairs
    #[must_use]
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Name of the runtime type used for pattern dispatch
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Literal(l) => l.type_name(),
            Self::List(_) => "List",
            Self::Dict(_) => "Dictionary",
            Self::Instance(i) => i.type_name(),
        }
    }

    /// Borrow the string payload, if this is a string literal
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::boolean(b)
    }
}

impl From<Literal> for Value {
    fn from(l: Literal) -> Self {
        Self::Literal(l)
    }
}

impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Self::Instance(i)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(l) => write!(f, "{}", l),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Self::Instance(i) => write!(f, "<{}>", i.type_name()),
        }
    }
}

/// Variable identity
///
/// Rules are written with generation 0. Every time the resolver applies a
/// rule it renames the rule's variables to a fresh generation, so recursive
/// calls never capture the caller's variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol {
    name: String,
    generation: u64,
}

impl Symbol {
    /// Variable as written in rule text
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generation: 0,
        }
    }

    /// Same name, different generation
    #[must_use]
    pub fn renamed(&self, generation: u64) -> Self {
        Self {
            name: self.name.clone(),
            generation,
        }
    }

    /// Name as written
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renaming generation (0 for rule text and query variables)
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Underscore-prefixed variables are "don't care" names
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name.starts_with('_')
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<Symbol> for String {
    fn from(sym: Symbol) -> Self {
        sym.name
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}#{}", self.name, self.generation)
        }
    }
}

/// Typed pattern, optionally destructuring attributes
///
/// `actor: Actor` is `InstanceMatch { type_name: "Actor", bind: Some(actor) }`;
/// `Dictionary{sub: name}` is a pattern with one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMatch {
    /// Expected type (or a supertype of the runtime type)
    #[serde(rename = "type")]
    pub type_name: String,
    /// Attribute sub-patterns, matched in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<(String, Term)>,
    /// Variable receiving the matched value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<Symbol>,
}

impl InstanceMatch {
    /// Pattern matching any value of `type_name`
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            bind: None,
        }
    }

    /// Require an attribute and match it against `pattern`
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, pattern: Term) -> Self {
        self.fields.push((name.into(), pattern));
        self
    }

    /// Bind the matched value to a variable
    #[must_use]
    pub fn bind(mut self, var: impl Into<Symbol>) -> Self {
        self.bind = Some(var.into());
        self
    }
}

impl fmt::Display for InstanceMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(var) = &self.bind {
            write!(f, "{}: ", var)?;
        }
        write!(f, "{}", self.type_name)?;
        if !self.fields.is_empty() {
            write!(f, "{{")?;
            for (i, (name, pattern)) in self.fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", name, pattern)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// Rule term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// Logic variable
    #[serde(rename = "var")]
    Variable(Symbol),
    /// Constant
    #[serde(rename = "lit")]
    Literal(Literal),
    /// List of terms, unified element-wise
    #[serde(rename = "list")]
    List(Vec<Term>),
    /// Typed pattern
    #[serde(rename = "match")]
    Pattern(InstanceMatch),
    /// Ground value injected by a query or a host call
    #[serde(rename = "value")]
    Value(Value),
}

impl Term {
    /// Variable term
    #[must_use]
    pub fn var(name: impl Into<Symbol>) -> Self {
        Self::Variable(name.into())
    }

    /// String literal
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Literal::String(s.into()))
    }

    /// Integer literal
    #[must_use]
    pub const fn integer(i: i64) -> Self {
        Self::Literal(Literal::Integer(i))
    }

    /// Boolean literal
    #[must_use]
    pub const fn boolean(b: bool) -> Self {
        Self::Literal(Literal::Bool(b))
    }

    /// Class reference literal
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::Literal(Literal::Class { class: name.into() })
    }

    /// List of string literals
    #[must_use]
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Self::string).collect())
    }

    /// `var: Type` head parameter
    #[must_use]
    pub fn typed(var: impl Into<Symbol>, type_name: impl Into<String>) -> Self {
        Self::Pattern(InstanceMatch::new(type_name).bind(var))
    }

    /// Any value of `type_name`
    #[must_use]
    pub fn instance_of(type_name: impl Into<String>) -> Self {
        Self::Pattern(InstanceMatch::new(type_name))
    }

    /// Visit every variable occurrence, including pattern bindings
    pub fn for_each_var<'a>(&'a self, f: &mut impl FnMut(&'a Symbol)) {
        match self {
            Self::Variable(v) => f(v),
            Self::List(items) => items.iter().for_each(|t| t.for_each_var(f)),
            Self::Pattern(p) => {
                if let Some(v) = &p.bind {
                    f(v);
                }
                p.fields.iter().for_each(|(_, t)| t.for_each_var(f));
            }
            Self::Literal(_) | Self::Value(_) => {}
        }
    }

    /// Copy with every variable moved to `generation`
    #[must_use]
    pub fn renamed(&self, generation: u64) -> Self {
        match self {
            Self::Variable(v) => Self::Variable(v.renamed(generation)),
            Self::List(items) => Self::List(items.iter().map(|t| t.renamed(generation)).collect()),
            Self::Pattern(p) => Self::Pattern(InstanceMatch {
                type_name: p.type_name.clone(),
                fields: p
                    .fields
                    .iter()
                    .map(|(name, t)| (name.clone(), t.renamed(generation)))
                    .collect(),
                bind: p.bind.as_ref().map(|v| v.renamed(generation)),
            }),
            Self::Literal(_) | Self::Value(_) => self.clone(),
        }
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Literal> for Term {
    fn from(l: Literal) -> Self {
        Self::Literal(l)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(v) => write!(f, "{}", v),
            Self::Literal(l) => write!(f, "{}", l),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Pattern(p) => write!(f, "{}", p),
            Self::Value(v) => write!(f, "{}", v),
        }
    }
}
