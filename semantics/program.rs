//! A ground normal logic program, indexed by head atom. Each head maps
//! to the list of its rule bodies, and each body is a conjunction of
//! literals. Facts are heads whose only body is empty.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lpwmc_syntax::{Atom, Literal};

/// A conjunction of literals. Literal order is irrelevant.
pub type Body = BTreeSet<Literal>;

/// A collection of normal rules `head :- body`, grouped by head.
///
/// Facts are maintained incrementally: when a head becomes a fact, its
/// positive literal is removed from all other bodies, and any head left
/// with an empty body is promoted to a fact in turn. That promotion is
/// done in a single pass; the newly promoted facts are *not* propagated
/// further, so rules added earlier may still mention them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RuleDatabase {
    rules: BTreeMap<Atom, Vec<Body>>,
}

impl RuleDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bodies of the rules for `head`; empty if there are none.
    pub fn bodies(&self, head: &Atom) -> &[Body] {
        self.rules.get(head).map(Vec::as_slice).unwrap_or_default()
    }

    /// Is `head` defined by at least one rule?
    pub fn contains(&self, head: &Atom) -> bool {
        self.rules.contains_key(head)
    }

    pub fn is_fact(&self, head: &Atom) -> bool {
        matches!(self.bodies(head), [body] if body.is_empty())
    }

    pub fn heads(&self) -> impl Iterator<Item = &Atom> {
        self.rules.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Atom, &[Body])> {
        self.rules
            .iter()
            .map(|(head, bodies)| (head, bodies.as_slice()))
    }

    /// Every atom mentioned anywhere, in a head or a body.
    pub fn atoms(&self) -> BTreeSet<Atom> {
        self.iter()
            .flat_map(|(head, bodies)| {
                Some(head)
                    .into_iter()
                    .chain(bodies.iter().flatten().map(Literal::atom))
            })
            .cloned()
            .collect()
    }

    /// The number of defined heads.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The number of rules, counting each body separately.
    pub fn num_rules(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// Add the rule `head :- body`. Positive literals on known facts are
    /// dropped from the body first. A head that is already a fact is
    /// left alone, since the fact subsumes any conditional rule.
    pub fn add_rule(&mut self, head: Atom, body: impl IntoIterator<Item = Literal>) {
        let body = body
            .into_iter()
            .filter(|lit| !(lit.is_positive() && self.is_fact(lit.atom())))
            .collect::<Body>();
        if self.is_fact(&head) {
            return;
        }
        if body.is_empty() {
            self.rules.insert(head.clone(), vec![Body::new()]);
            self.propagate_fact(&head);
        } else {
            self.rules.entry(head).or_default().push(body);
        }
    }

    fn propagate_fact(&mut self, fact: &Atom) {
        let fact = Literal::positive(fact.clone());
        for (head, bodies) in self.rules.iter_mut() {
            if head == fact.atom() {
                continue;
            }
            let mut promote = false;
            for body in bodies.iter_mut() {
                promote |= body.remove(&fact) && body.is_empty();
            }
            if promote {
                *bodies = vec![Body::new()];
            }
        }
    }
}

/// Prolog syntax, one rule per line.
impl fmt::Display for RuleDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (head, bodies) in self.iter() {
            for body in bodies {
                if body.is_empty() {
                    f.write_fmt(format_args!("{head}.\n"))?;
                } else {
                    let body = body
                        .iter()
                        .map(|lit| lit.prolog().to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    f.write_fmt(format_args!("{head} :- {body}.\n"))?;
                }
            }
        }
        Ok(())
    }
}
