//! Rule store and matcher
//!
//! Rules are grouped by `(predicate name, arity)` and kept in load order.
//! Shape filtering is left to unification in the resolver: head patterns can
//! be arbitrarily typed, so the store never pre-filters by argument shape.

use crate::rule::Rule;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable index of rules
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: BTreeMap<String, BTreeMap<usize, Vec<Arc<Rule>>>>,
    len: usize,
}

impl RuleStore {
    /// Index `rules`, preserving their order within each predicate
    #[must_use]
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut store = Self::default();
        for rule in rules {
            store
                .rules
                .entry(rule.name.clone())
                .or_default()
                .entry(rule.arity())
                .or_default()
                .push(Arc::new(rule));
            store.len += 1;
        }
        store
    }

    /// Candidate rules for a call, in load order
    #[must_use]
    pub fn find_rules(&self, name: &str, arity: usize) -> &[Arc<Rule>] {
        self.rules
            .get(name)
            .and_then(|by_arity| by_arity.get(&arity))
            .map_or(&[], Vec::as_slice)
    }

    /// Every `(name, arity)` signature, sorted
    pub fn signatures(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.rules.iter().flat_map(|(name, by_arity)| {
            by_arity.keys().map(move |arity| (name.as_str(), *arity))
        })
    }

    /// Total number of rules
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the store has no rules
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}
