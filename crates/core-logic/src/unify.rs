//! Structural unification
//!
//! `unify(pattern, value, env)` returns `Ok(Some(env'))` with an extended
//! environment or `Ok(None)`. Failure is the normal backtracking signal.
//! Host errors raised while reading a pattern's attributes fail the match,
//! except contract violations, which abort the query as they do for
//! attribute goals.

use crate::bindings::Bindings;
use crate::error::QueryError;
use crate::host::HostBridge;
use crate::registry::TypeRegistry;
use crate::term::{InstanceMatch, Term, Value};
use tracing::trace;

/// Outcome of a unification: an extended environment, a clean failure, or a
/// query error
pub type Unified = Result<Option<Bindings>, QueryError>;

/// Unifier bound to a type registry
#[derive(Debug, Clone, Copy)]
pub struct Unifier<'a> {
    registry: &'a TypeRegistry,
    bridge: HostBridge<'a>,
}

/// Canonical shape of a walked term
///
/// Ground scalars and ground lists look the same whether they came from rule
/// text (`Term::Literal`, `Term::List`) or from the host (`Term::Value`).
enum Shape {
    Var(crate::term::Symbol),
    Scalar(crate::term::Literal),
    List(Vec<Term>),
    Pattern(InstanceMatch),
    Opaque(Value),
}

fn shape(term: Term) -> Shape {
    match term {
        Term::Variable(v) => Shape::Var(v),
        Term::Literal(l) | Term::Value(Value::Literal(l)) => Shape::Scalar(l),
        Term::List(items) => Shape::List(items),
        Term::Value(Value::List(values)) => {
            Shape::List(values.into_iter().map(Term::Value).collect())
        }
        Term::Pattern(p) => Shape::Pattern(p),
        Term::Value(v) => Shape::Opaque(v),
    }
}

impl<'a> Unifier<'a> {
    /// Create a unifier
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            bridge: HostBridge::new(registry),
        }
    }

    /// Unify two terms under `env`
    ///
    /// # Errors
    ///
    /// `QueryError::HostContract` if a pattern's attribute read breaks the
    /// host contract
    pub fn unify(&self, left: &Term, right: &Term, env: &Bindings) -> Unified {
        let left = shape(env.walk(left));
        let right = shape(env.walk(right));

        match (left, right) {
            (Shape::Var(x), Shape::Var(y)) if x == y => Ok(Some(env.clone())),
            // Patterns only match ground values; an unbound variable never
            // satisfies a type check
            (Shape::Pattern(p), other) | (other, Shape::Pattern(p)) => {
                self.match_pattern(&p, &unshape(other), env)
            }
            (Shape::Var(x), other) | (other, Shape::Var(x)) => {
                let term = unshape(other);
                if env.occurs(&x, &term) {
                    trace!(variable = %x, %term, "occurs check failed");
                    return Ok(None);
                }
                Ok(Some(env.bind(x, term)))
            }
            (Shape::Scalar(a), Shape::Scalar(b)) => Ok((a == b).then(|| env.clone())),
            (Shape::List(xs), Shape::List(ys)) => self.unify_all(&xs, &ys, env),
            (Shape::Opaque(a), Shape::Opaque(b)) => Ok((a == b).then(|| env.clone())),
            _ => Ok(None),
        }
    }

    /// Unify two sequences element-wise; lengths must agree
    ///
    /// # Errors
    ///
    /// See [`Unifier::unify`]
    pub fn unify_all(&self, left: &[Term], right: &[Term], env: &Bindings) -> Unified {
        if left.len() != right.len() {
            return Ok(None);
        }
        let mut env = env.clone();
        for (l, r) in left.iter().zip(right) {
            match self.unify(l, r, &env)? {
                Some(next) => env = next,
                None => return Ok(None),
            }
        }
        Ok(Some(env))
    }

    /// Match a typed pattern against a (ground) term
    ///
    /// Succeeds iff the runtime type is the pattern's type or specializes it,
    /// every listed attribute can be read and unifies with its sub-pattern,
    /// and the optional binding variable unifies with the matched value.
    ///
    /// # Errors
    ///
    /// `QueryError::HostContract` if reading an attribute breaks the host
    /// contract; any other host error just fails the match
    pub fn match_pattern(&self, pattern: &InstanceMatch, target: &Term, env: &Bindings) -> Unified {
        let Some(value) = env.resolve(target) else {
            return Ok(None);
        };
        if !self.registry.value_is_a(&value, &pattern.type_name) {
            return Ok(None);
        }

        let mut env = env.clone();
        for (attribute, sub_pattern) in &pattern.fields {
            let field = match self.bridge.attribute(&value, attribute) {
                Ok(field) => field,
                Err(err) if err.is_contract_violation() => return Err(err.into()),
                Err(err) => {
                    trace!(%attribute, error = %err, "pattern attribute unavailable");
                    return Ok(None);
                }
            };
            match self.unify(sub_pattern, &Term::Value(field), &env)? {
                Some(next) => env = next,
                None => return Ok(None),
            }
        }

        match &pattern.bind {
            Some(var) => self.unify(&Term::Variable(var.clone()), &Term::Value(value), &env),
            None => Ok(Some(env)),
        }
    }
}

fn unshape(shape: Shape) -> Term {
    match shape {
        Shape::Var(v) => Term::Variable(v),
        Shape::Scalar(l) => Term::Literal(l),
        Shape::List(items) => Term::List(items),
        Shape::Pattern(p) => Term::Pattern(p),
        Shape::Opaque(v) => Term::Value(v),
    }
}
