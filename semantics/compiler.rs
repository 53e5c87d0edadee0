//! Compile a ground probabilistic program into weighted CNF.
//!
//! The pipeline is: annotated disjunctions → weighted normal program
//! (see [`crate::lpad`]) → loop breaking from the queries and evidence
//! (see [`crate::loops`]) → Clark's completion (see [`crate::completion`]).
//! The weighted model count of the result, conditioned on the evidence,
//! is the probability of the queries.

use std::collections::BTreeSet;

use thiserror::Error;

use lpwmc_cnf::{CnfError, Var};
use lpwmc_syntax::{Literal, Statement};
use lpwmc_tracer::{trace, Trace};

use crate::completion::{ClarkCompletion, Compilation};
use crate::lpad::{Choices, GroundProgram, LpadError};
use crate::loops::{LoopBreaker, Resolved};
use crate::translation::Variable;
use crate::weights::WeightError;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Program(#[from] LpadError),
    #[error(transparent)]
    Weight(#[from] WeightError),
    #[error(transparent)]
    Cnf(#[from] CnfError),
}

/// A compiled program, together with its queries and evidence as
/// signed CNF variables.
#[derive(Clone, Debug)]
pub struct WmcProblem {
    pub compilation: Compilation,
    pub queries: BTreeSet<Var>,
    pub evidence: BTreeSet<Var>,
}

pub struct WmcCompiler {
    program: GroundProgram,
    trace: Trace,
}

impl WmcCompiler {
    pub fn new(
        statements: impl IntoIterator<Item = Statement>,
        trace: Trace,
    ) -> Result<Self, CompileError> {
        let program = GroundProgram::new(statements, trace)?;
        Ok(Self::from_program(program, trace))
    }

    /// Compile an already weighted normal program.
    pub fn from_program(program: GroundProgram, trace: Trace) -> Self {
        Self { program, trace }
    }

    pub fn program(&self) -> &GroundProgram {
        &self.program
    }

    pub fn add_query(&mut self, lit: Literal) {
        self.program.queries.insert(lit);
    }

    pub fn add_evidence(&mut self, lit: Literal) {
        self.program.evidence.insert(lit);
    }

    pub fn run(&self) -> Result<WmcProblem, CompileError> {
        let program = &self.program;
        let mut breaker = LoopBreaker::new(&program.rules, &program.weights, self.trace);
        for lit in program.queries.iter().chain(&program.evidence) {
            breaker.resolve_seed(lit)?;
        }

        // Constrain the choices of every annotated disjunction we reach.
        // Resolving the constraints may reach further disjunctions.
        let mut constraints = Vec::new();
        let mut unreached = program.choices.iter().collect::<Vec<&Choices>>();
        loop {
            let (reached, rest): (Vec<_>, Vec<_>) = unreached
                .into_iter()
                .partition(|choices| choices.atoms.iter().any(|a| breaker.visited(a)));
            if reached.is_empty() {
                break;
            }
            for choices in reached {
                'clauses: for clause in &choices.clauses {
                    let mut resolved = Vec::with_capacity(clause.len());
                    for lit in clause {
                        match breaker.resolve_seed(lit)? {
                            Resolved::Variant(lit) => resolved.push(lit),
                            Resolved::Eliminated => (),
                            Resolved::Vacuous => continue 'clauses,
                        }
                    }
                    constraints.push(resolved);
                }
            }
            unreached = rest;
        }

        let unlooped = breaker.finish(&program.evidence);
        let mut completion =
            ClarkCompletion::new(&unlooped.program, &unlooped.weights, self.trace);
        for lit in program.queries.iter().chain(&unlooped.evidence) {
            completion.complete(lit)?;
        }
        for clause in &constraints {
            completion.constrain(clause)?;
        }
        for atom in &unlooped.falsified {
            completion.deny(atom)?;
        }
        let compilation = completion.finish();

        let signed = |lits: &BTreeSet<Literal>| {
            lits.iter()
                .filter_map(|lit| {
                    let var = Variable::Atom(lit.atom().clone());
                    let index = compilation.translation.get(&var)?;
                    Some(if lit.is_positive() { index } else { -index })
                })
                .collect::<BTreeSet<Var>>()
        };
        let queries = signed(&program.queries);
        let evidence = signed(&unlooped.evidence);
        trace!(self.trace, Encode, "Weighted CNF:\n{}", compilation.cnf);
        Ok(WmcProblem {
            compilation,
            queries,
            evidence,
        })
    }
}

#[cfg(test)]
mod test {
    use lpwmc_syntax::{parse_program, pos};

    use super::*;
    use crate::completion::test::each_interpretation;
    use crate::program::RuleDatabase;
    use crate::weights::Weights;

    fn compile(source: &str) -> WmcProblem {
        let statements = parse_program(source).expect("parse failed");
        WmcCompiler::new(statements, Trace::none())
            .expect("bad program")
            .run()
            .expect("compilation failed")
    }

    /// Weighted model counts of all models, and of those satisfying
    /// the signed variable `query`, by exhaustive enumeration.
    fn wmc(c: &Compilation, query: Var) -> (f64, f64) {
        let vars = c
            .translation
            .iter()
            .map(|(index, _)| index.unsigned_abs())
            .collect::<Vec<_>>();
        let (mut total, mut satisfying) = (0.0, 0.0);
        each_interpretation(&vars, |interp| {
            if !c.cnf.eval(interp) {
                return;
            }
            let weight = vars
                .iter()
                .map(|&v| {
                    let v = v as Var;
                    let lit = if interp.contains(&v.unsigned_abs()) { v } else { -v };
                    c.weights.get(&lit).expect("missing weight")
                })
                .product::<f64>();
            total += weight;
            if interp.contains(&query.unsigned_abs()) == (query > 0) {
                satisfying += weight;
            }
        });
        (total, satisfying)
    }

    fn probability(problem: &WmcProblem) -> f64 {
        let query = *problem.queries.iter().next().expect("no query");
        let (total, satisfying) = wmc(&problem.compilation, query);
        satisfying / total
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} ≉ {b}");
    }

    #[test]
    fn noisy_or() {
        let problem = compile("0.3::a. 0.4::b. c :- a. c :- b. query(c).");
        let (total, _) = wmc(&problem.compilation, 1);
        assert_close(total, 1.0);
        assert_close(probability(&problem), 1.0 - 0.7 * 0.6);
    }

    #[test]
    fn disjunction() {
        let problem = compile("0.2::a; 0.5::b. c :- \\+a. query(c).");
        assert_close(probability(&problem), 0.8);
        let problem = compile("0.2::a; 0.5::b. query(b).");
        assert_close(probability(&problem), 0.5);
    }

    #[test]
    fn negative_query() {
        let problem = compile("0.3::a. query(\\+a).");
        assert_eq!(problem.queries.len(), 1);
        assert!(problem.queries.iter().all(|&q| q < 0));
        assert_close(probability(&problem), 0.7);
    }

    #[test]
    fn cyclic() {
        let mut rules = RuleDatabase::new();
        rules.add_rule("a".into(), [pos!(b)]);
        rules.add_rule("b".into(), [pos!(a)]);
        rules.add_rule("a".into(), [pos!(x)]);
        rules.add_rule("b".into(), [pos!(y)]);
        let mut weights = Weights::new();
        weights.insert_pair(pos!(x), 0.5, 0.5);
        weights.insert_pair(pos!(y), 0.5, 0.5);
        weights.insert_pair(pos!(a), 1.0, 1.0);
        weights.insert_pair(pos!(b), 1.0, 1.0);
        let program = GroundProgram {
            rules,
            weights,
            queries: [pos!(a)].into(),
            ..GroundProgram::default()
        };
        let problem = WmcCompiler::from_program(program, Trace::none())
            .run()
            .expect("compilation failed");
        assert_close(probability(&problem), 0.75);
    }

    #[test]
    fn unsupported_query() {
        let problem = compile("0.5::x. a :- b. b :- a. query(a).");
        let a = *problem.queries.iter().next().expect("no query");
        assert!(problem.compilation.cnf.clauses().any(|c| c == [-a]));
        assert_close(probability(&problem), 0.0);
    }

    #[test]
    fn evidence() {
        let problem = compile("0.5::a. 0.5::b :- a. query(b). evidence(a, true).");
        assert_eq!(problem.evidence.len(), 1);
        let a = *problem.evidence.iter().next().expect("no evidence");
        let b = *problem.queries.iter().next().expect("no query");
        assert!(a > 0);
        // b implies a, so P(b | a) = P(b) / P(a).
        let (_, with_a) = wmc(&problem.compilation, a);
        let (_, with_b) = wmc(&problem.compilation, b);
        assert_close(with_a, 0.5);
        assert_close(with_b / with_a, 0.5);
    }

    #[test]
    fn missing_weight() {
        let statements = parse_program("a :- b. query(a).").expect("parse failed");
        let result = WmcCompiler::new(statements, Trace::none())
            .expect("bad program")
            .run();
        assert_eq!(
            result.map(|_| ()),
            Err(CompileError::Weight(WeightError::Missing(String::from("b"))))
        );
    }

    #[test]
    fn bad_program() {
        let statements = parse_program("2::a.").expect("parse failed");
        assert!(matches!(
            WmcCompiler::new(statements, Trace::none()),
            Err(CompileError::Program(LpadError::Probability(..)))
        ));
    }

    #[test]
    fn extra_seeds() {
        let statements = parse_program("0.5::a. 0.5::b.").expect("parse failed");
        let mut compiler = WmcCompiler::new(statements, Trace::none()).expect("bad program");
        compiler.add_query(pos!(a));
        compiler.add_evidence("-b".parse().expect("literal"));
        let problem = compiler.run().expect("compilation failed");
        assert_eq!(problem.queries.len(), 1);
        assert_eq!(problem.evidence.len(), 1);
        assert!(problem.evidence.iter().all(|&e| e < 0));
        assert_eq!(compiler.program().queries.len(), 1);
    }
}
