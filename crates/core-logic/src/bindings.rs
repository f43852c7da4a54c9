//! Immutable, append-only variable bindings
//!
//! Extending a [`Bindings`] returns a new environment that shares its tail
//! with the old one. Backtracking is just dropping the extension.

use crate::term::{Literal, Symbol, Term, Value};
use std::fmt;
use std::sync::Arc;

struct Binding {
    var: Symbol,
    term: Term,
    next: Option<Arc<Binding>>,
}

/// Environment mapping variables to terms
///
/// A variable may be bound to another variable (aliasing); lookups follow
/// such chains.
#[derive(Clone, Default)]
pub struct Bindings {
    head: Option<Arc<Binding>>,
    len: usize,
}

impl Bindings {
    /// Empty environment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bindings made so far
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is bound
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// New environment with `var` bound to `term`
    #[must_use]
    pub fn bind(&self, var: Symbol, term: Term) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                var,
                term,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Direct binding of `var`, most recent first
    #[must_use]
    pub fn get(&self, var: &Symbol) -> Option<&Term> {
        let mut node = self.head.as_deref();
        while let Some(binding) = node {
            if &binding.var == var {
                return Some(&binding.term);
            }
            node = binding.next.as_deref();
        }
        None
    }

    /// Follow variable-to-variable links until reaching a non-variable or an unbound variable
    #[must_use]
    pub fn walk(&self, term: &Term) -> Term {
        let mut current = term;
        while let Term::Variable(var) = current {
            match self.get(var) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.clone()
    }

    /// Whether `var` appears in `term` once bindings are followed
    ///
    /// Binding a variable to a term containing itself would make the
    /// environment cyclic, so the unifier refuses such bindings.
    #[must_use]
    pub fn occurs(&self, var: &Symbol, term: &Term) -> bool {
        match self.walk(term) {
            Term::Variable(v) => &v == var,
            Term::List(items) => items.iter().any(|t| self.occurs(var, t)),
            Term::Pattern(p) => p.fields.iter().any(|(_, t)| self.occurs(var, t)),
            Term::Literal(_) | Term::Value(_) => false,
        }
    }

    /// Fully resolve `term` to a ground value
    ///
    /// Returns `None` if an unbound variable or an uninstantiated pattern remains.
    #[must_use]
    pub fn resolve(&self, term: &Term) -> Option<Value> {
        match self.walk(term) {
            Term::Variable(_) | Term::Pattern(_) => None,
            Term::Literal(l) => Some(Value::Literal(l)),
            Term::Value(v) => Some(v),
            Term::List(items) => items
                .iter()
                .map(|t| self.resolve(t))
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
        }
    }

    /// Resolve the query variable `name` (generation 0)
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<Value> {
        self.resolve(&Term::Variable(Symbol::new(name)))
    }

    /// Whether `term` still contains an unbound variable
    #[must_use]
    pub fn is_ground(&self, term: &Term) -> bool {
        match self.walk(term) {
            Term::Variable(_) => false,
            Term::List(items) => items.iter().all(|t| self.is_ground(t)),
            Term::Pattern(_) => false,
            Term::Literal(_) | Term::Value(_) => true,
        }
    }

    /// Resolve `name` to a string, if it is bound to one
    #[must_use]
    pub fn string_of(&self, name: &str) -> Option<String> {
        match self.value_of(name)? {
            Value::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Bindings of generation-0 variables (the ones a query names), oldest first
    #[must_use]
    pub fn query_variables(&self) -> Vec<(Symbol, Option<Value>)> {
        let mut seen = Vec::new();
        let mut node = self.head.as_deref();
        while let Some(binding) = node {
            if binding.var.generation() == 0 && !seen.contains(&binding.var) {
                seen.push(binding.var.clone());
            }
            node = binding.next.as_deref();
        }
        seen.reverse();
        seen.into_iter()
            .map(|var| {
                let value = self.resolve(&Term::Variable(var.clone()));
                (var, value)
            })
            .collect()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut node = self.head.as_deref();
        while let Some(binding) = node {
            map.entry(&binding.var.to_string(), &binding.term.to_string());
            node = binding.next.as_deref();
        }
        map.finish()
    }
}
