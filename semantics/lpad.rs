//! Turn a ground program of annotated disjunctions into a weighted
//! normal program.
//!
//! Each annotated disjunction `p0::h0; ...; pn::hn :- body` (rule number
//! `r`) introduces one probabilistic _choice atom_ `choice_node_r_i` per
//! head, weighted `pi`, and a residual choice `choice_node_r_{n+1}` for
//! choosing no head at all, weighted `1 - Σpi`. The normal rules are then
//! `hi :- choice_node_r_i, body`. Clauses over the choice atoms make
//! exactly one of them true whenever the body holds, and none otherwise.

use std::collections::BTreeSet;
use std::iter::once;

use thiserror::Error;

use lpwmc_syntax::{Atom, Literal, Rule, Statement};
use lpwmc_tracer::{trace, Trace};

use crate::program::RuleDatabase;
use crate::weights::Weights;

/// Slack for rounding errors in probability sums.
const EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LpadError {
    #[error("probability {1} of {0} is not between 0 and 1")]
    Probability(Atom, f64),
    #[error("probabilities sum to {1} in `{0}`")]
    Total(String, f64),
}

/// The choice atoms of one annotated disjunction, and the clauses
/// that constrain them.
#[derive(Clone, Debug, PartialEq)]
pub struct Choices {
    pub atoms: Vec<Atom>,
    pub clauses: Vec<Vec<Literal>>,
}

impl Choices {
    fn new(atoms: Vec<Atom>, body: &[Literal]) -> Self {
        let mut clauses = Vec::new();
        for (i, a) in atoms.iter().enumerate() {
            for b in &atoms[i + 1..] {
                clauses.push(vec![
                    Literal::negative(a.clone()),
                    Literal::negative(b.clone()),
                ]);
            }
        }
        for lit in body {
            for a in &atoms {
                clauses.push(vec![Literal::negative(a.clone()), lit.clone()]);
            }
        }
        clauses.push(
            atoms
                .iter()
                .cloned()
                .map(Literal::positive)
                .chain(body.iter().cloned().map(Literal::negate))
                .collect(),
        );
        Self { atoms, clauses }
    }
}

/// A weighted normal program with queries and evidence.
#[derive(Clone, Debug, Default)]
pub struct GroundProgram {
    pub rules: RuleDatabase,
    pub weights: Weights<Literal>,
    pub queries: BTreeSet<Literal>,
    pub evidence: BTreeSet<Literal>,
    pub choices: Vec<Choices>,
}

impl GroundProgram {
    pub fn new(
        statements: impl IntoIterator<Item = Statement>,
        trace: Trace,
    ) -> Result<Self, LpadError> {
        let mut program = Self::default();
        for statement in statements {
            match statement {
                Statement::Rule(rule) => program.add_disjunction(&rule)?,
                Statement::Query(lit) => {
                    program.queries.insert(lit);
                }
                Statement::Evidence(lit) => {
                    program.evidence.insert(lit);
                }
            }
        }
        trace!(
            trace,
            Ground,
            "{} annotated disjunctions, {} defined atoms, {} rules, {} queries, {} evidence",
            program.choices.len(),
            program.rules.len(),
            program.rules.num_rules(),
            program.queries.len(),
            program.evidence.len()
        );
        trace!(trace, Ground, "Normal program:\n{}", program.rules);
        Ok(program)
    }

    fn add_disjunction(&mut self, rule: &Rule) -> Result<(), LpadError> {
        let r = self.choices.len();
        let mut total = 0.0;
        let mut atoms = Vec::with_capacity(rule.head.len() + 1);
        for (i, choice) in rule.head.iter().enumerate() {
            let p = choice.probability;
            if !(0.0..=1.0).contains(&p) {
                return Err(LpadError::Probability(choice.atom.clone(), p));
            }
            total += p;

            let node = Atom::new(format!("choice_node_{r}_{i}"));
            self.weights
                .insert_pair(Literal::positive(node.clone()), p, 1.0);
            self.weights
                .insert_pair(Literal::positive(choice.atom.clone()), 1.0, 1.0);
            self.rules.add_rule(
                choice.atom.clone(),
                once(Literal::positive(node.clone())).chain(rule.body.iter().cloned()),
            );
            atoms.push(node);
        }
        if total > 1.0 + EPSILON {
            return Err(LpadError::Total(rule.to_string(), total));
        }

        let none = Atom::new(format!("choice_node_{r}_{}", rule.head.len()));
        self.weights
            .insert_pair(Literal::positive(none.clone()), (1.0 - total).max(0.0), 1.0);
        atoms.push(none);
        self.choices.push(Choices::new(atoms, &rule.body));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use lpwmc_syntax::{atom, neg, parse_program, pos};

    use super::*;
    use crate::program::Body;

    fn ground(source: &str) -> Result<GroundProgram, LpadError> {
        GroundProgram::new(parse_program(source).expect("parse failed"), Trace::none())
    }

    #[test]
    fn fact() {
        let program = ground("0.3::a.").expect("ground failed");
        assert_eq!(
            program.rules.bodies(&atom!(a)),
            [Body::from([pos!(choice_node_0_0)])]
        );
        assert_eq!(program.weights.get(&pos!(choice_node_0_0)), Ok(0.3));
        assert_eq!(program.weights.get(&neg!(choice_node_0_0)), Ok(1.0));
        assert_eq!(program.weights.get(&pos!(choice_node_0_1)), Ok(0.7));
        assert_eq!(program.weights.get(&pos!(a)), Ok(1.0));
        assert_eq!(program.weights.get(&neg!(a)), Ok(1.0));
        assert_eq!(
            program.choices,
            [Choices {
                atoms: vec![atom!(choice_node_0_0), atom!(choice_node_0_1)],
                clauses: vec![
                    vec![neg!(choice_node_0_0), neg!(choice_node_0_1)],
                    vec![pos!(choice_node_0_0), pos!(choice_node_0_1)],
                ],
            }]
        );
    }

    #[test]
    fn disjunction() {
        let program = ground(
            "0.2::c.
             0.5::a; 0.25::b :- c, \\+d.
             query(a). evidence(b, false).",
        )
        .expect("ground failed");
        assert_eq!(
            program.rules.bodies(&atom!(b)),
            [Body::from([pos!(choice_node_1_1), pos!(c), neg!(d)])]
        );
        assert_eq!(program.weights.get(&pos!(choice_node_1_2)), Ok(0.25));
        let choices = &program.choices[1];
        assert_eq!(choices.atoms.len(), 3);
        assert_eq!(choices.clauses.len(), 3 + 2 * 3 + 1);
        assert_eq!(
            choices.clauses.last(),
            Some(&vec![
                pos!(choice_node_1_0),
                pos!(choice_node_1_1),
                pos!(choice_node_1_2),
                neg!(c),
                pos!(d),
            ])
        );
        assert_eq!(program.queries, BTreeSet::from([pos!(a)]));
        assert_eq!(program.evidence, BTreeSet::from([neg!(b)]));
    }

    #[test]
    fn certain() {
        let program = ground("0.25::a; 0.25::b; 0.5::c.").expect("ground failed");
        assert_eq!(program.weights.get(&pos!(choice_node_0_3)), Ok(0.0));
        let program = ground("a :- b.").expect("ground failed");
        assert_eq!(program.weights.get(&pos!(choice_node_0_0)), Ok(1.0));
        assert_eq!(program.weights.get(&pos!(choice_node_0_1)), Ok(0.0));
    }

    #[test]
    fn errors() {
        assert_eq!(
            ground("1.5::a.").map(|_| ()),
            Err(LpadError::Probability(atom!(a), 1.5))
        );
        assert!(matches!(
            ground("0.6::a; 0.6::b."),
            Err(LpadError::Total(_, _))
        ));
    }
}
