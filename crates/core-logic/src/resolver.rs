//! Depth-first backtracking resolver
//!
//! [`Solutions`] is a lazy iterator: each call to `next` resumes the search
//! where the previous answer left off, so a caller that only needs to know
//! whether any answer exists stops after the first one.
//!
//! The search state is a stack of choice points. A choice point holds the
//! remaining conjunction of goals (a shared, immutable list) and the bindings
//! reached so far. Expanding the first goal pushes one choice point per
//! alternative, in reverse, so alternatives are explored in rule-store order.

use crate::bindings::Bindings;
use crate::error::{HostError, QueryError};
use crate::host::HostBridge;
use crate::policy::PolicySnapshot;
use crate::rule::Goal;
use crate::term::{Term, Value};
use crate::unify::Unifier;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Remaining goals, shared between choice points
type Goals = Option<Arc<GoalNode>>;

struct GoalNode {
    goal: Goal,
    /// Number of predicate calls enclosing this goal
    depth: usize,
    next: Goals,
}

fn prepend(goals: Vec<Goal>, depth: usize, tail: Goals) -> Goals {
    goals
        .into_iter()
        .rev()
        .fold(tail, |next, goal| Some(Arc::new(GoalNode { goal, depth, next })))
}

struct ChoicePoint {
    goals: Goals,
    bindings: Bindings,
}

/// Lazy sequence of answers to a query
///
/// Yields `Ok(bindings)` once per way of satisfying the query. A query error
/// (recursion ceiling, host contract violation) is yielded once, after which
/// the iterator is exhausted.
pub struct Solutions {
    snapshot: Arc<PolicySnapshot>,
    stack: Vec<ChoicePoint>,
    generation: u64,
    halted: bool,
}

impl Solutions {
    /// Start solving the conjunction `goals` against `snapshot`
    ///
    /// Variables in `goals` keep generation 0; every rule application renames
    /// its own variables to a fresh generation.
    #[must_use]
    pub fn new(snapshot: Arc<PolicySnapshot>, goals: Vec<Goal>) -> Self {
        Self {
            snapshot,
            stack: vec![ChoicePoint {
                goals: prepend(goals, 0, None),
                bindings: Bindings::new(),
            }],
            generation: 0,
            halted: false,
        }
    }

    /// Whether any answer exists
    ///
    /// # Errors
    ///
    /// Returns the query error hit before the first answer, if any
    pub fn exists(mut self) -> Result<bool, QueryError> {
        self.next().transpose().map(|first| first.is_some())
    }

    fn fresh_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Expand the first goal of `node` under `env`, pushing every alternative
    fn step(&mut self, node: &GoalNode, env: &Bindings) -> Result<(), QueryError> {
        let snapshot = Arc::clone(&self.snapshot);
        let registry = snapshot.registry();
        let unifier = Unifier::new(registry);
        let bridge = HostBridge::new(registry);
        let next = &node.next;

        let alternatives = match &node.goal {
            Goal::PredicateCall { name, args } => {
                let max_depth = snapshot.config().max_depth;
                if node.depth >= max_depth {
                    warn!(predicate = %name, max_depth, "recursion limit exceeded");
                    return Err(QueryError::RecursionLimitExceeded {
                        max_depth,
                        predicate: name.clone(),
                    });
                }

                let rules = snapshot.rules().find_rules(name, args.len());
                if rules.is_empty() {
                    trace!(predicate = %name, arity = args.len(), "no rules");
                }
                let mut alternatives = Vec::with_capacity(rules.len());
                for rule in rules {
                    let (head, body) = rule.instantiate(self.fresh_generation());
                    if let Some(bindings) = unifier.unify_all(&head, args, env)? {
                        alternatives.push(ChoicePoint {
                            goals: prepend(body, node.depth + 1, next.clone()),
                            bindings,
                        });
                    }
                }
                alternatives
            }

            Goal::Unification(left, right) => unifier
                .unify(left, right, env)?
                .map(|bindings| ChoicePoint {
                    goals: next.clone(),
                    bindings,
                })
                .into_iter()
                .collect(),

            Goal::AttributeAccess {
                receiver,
                attribute,
                bound_to,
            } => {
                let Some(receiver) = env.resolve(receiver) else {
                    trace!(goal = %node.goal, "receiver unbound");
                    return Ok(());
                };
                let Some(value) = host_result(bridge.attribute(&receiver, attribute), &node.goal)?
                else {
                    return Ok(());
                };
                bind_result(&unifier, bound_to, value, env, next)?
            }

            Goal::MethodCall {
                receiver,
                method,
                args,
                bound_to,
            } => {
                let (Some(receiver), Some(args)) = (env.resolve(receiver), resolve_all(env, args))
                else {
                    trace!(goal = %node.goal, "receiver or argument unbound");
                    return Ok(());
                };
                let Some(value) =
                    host_result(bridge.call_method(&receiver, method, &args), &node.goal)?
                else {
                    return Ok(());
                };
                bind_result(&unifier, bound_to, value, env, next)?
            }

            Goal::Construct {
                type_name,
                args,
                bound_to,
            } => {
                let Some(args) = resolve_all(env, args) else {
                    trace!(goal = %node.goal, "constructor argument unbound");
                    return Ok(());
                };
                let Some(value) = host_result(bridge.construct(type_name, &args), &node.goal)?
                else {
                    return Ok(());
                };
                bind_result(&unifier, bound_to, value, env, next)?
            }

            Goal::Membership { item, list } => {
                let Some(Value::List(elements)) = env.resolve(list) else {
                    trace!(goal = %node.goal, "membership target is not a ground list");
                    return Ok(());
                };

                if env.is_ground(item) {
                    // Equality test: succeeds at most once
                    let found = env
                        .resolve(item)
                        .is_some_and(|item| elements.contains(&item));
                    if found {
                        vec![ChoicePoint {
                            goals: next.clone(),
                            bindings: env.clone(),
                        }]
                    } else {
                        Vec::new()
                    }
                } else {
                    let mut alternatives = Vec::with_capacity(elements.len());
                    for element in elements {
                        if let Some(bindings) = unifier.unify(item, &Term::Value(element), env)? {
                            alternatives.push(ChoicePoint {
                                goals: next.clone(),
                                bindings,
                            });
                        }
                    }
                    alternatives
                }
            }
        };

        self.stack.extend(alternatives.into_iter().rev());
        Ok(())
    }
}

/// Unify a host-produced value with the goal's `bound_to` term
fn bind_result(
    unifier: &Unifier<'_>,
    bound_to: &Term,
    value: Value,
    env: &Bindings,
    next: &Goals,
) -> Result<Vec<ChoicePoint>, QueryError> {
    Ok(unifier
        .unify(bound_to, &Term::Value(value), env)?
        .map(|bindings| ChoicePoint {
            goals: next.clone(),
            bindings,
        })
        .into_iter()
        .collect())
}

fn resolve_all(env: &Bindings, terms: &[Term]) -> Option<Vec<Value>> {
    terms.iter().map(|t| env.resolve(t)).collect()
}

/// Host errors fail the goal; contract violations abort the query
fn host_result(result: Result<Value, HostError>, goal: &Goal) -> Result<Option<Value>, QueryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_contract_violation() => {
            warn!(%goal, error = %err, "host contract violation");
            Err(err.into())
        }
        Err(err) => {
            trace!(%goal, error = %err, "host call failed");
            Ok(None)
        }
    }
}

impl Iterator for Solutions {
    type Item = Result<Bindings, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }

        while let Some(point) = self.stack.pop() {
            let Some(node) = point.goals else {
                return Some(Ok(point.bindings));
            };
            if let Err(err) = self.step(&node, &point.bindings) {
                self.halted = true;
                self.stack.clear();
                return Some(Err(err));
            }
        }
        None
    }
}

impl fmt::Debug for Solutions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solutions")
            .field("version", &self.snapshot.version())
            .field("pending", &self.stack.len())
            .field("halted", &self.halted)
            .finish()
    }
}
