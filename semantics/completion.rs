//! Clark's completion of an acyclic program, in CNF.
//!
//! The rules for an atom are read as an equivalence rather than a set
//! of implications: `a` holds iff some body of `a` does. With a single
//! body that is `a ↔ b1 ∧ ... ∧ bm`, which is already a conjunction of
//! clauses. With several bodies, distributing the disjunction of
//! conjunctions would blow up, so each body gets an auxiliary variable
//! `Di ↔ ⋀Bi`, and `a ↔ ⋁Di`.
//!
//! Only atoms reachable from the seeds are completed, each at most once.

use std::collections::{BTreeSet, HashMap};

use lpwmc_cnf::{Cnf, CnfError, NodeId, Var};
use lpwmc_syntax::{Atom, Literal};
use lpwmc_tracer::{trace, Trace};

use crate::program::RuleDatabase;
use crate::translation::{Translation, Variable};
use crate::weights::Weights;

/// The weighted CNF encoding of a program.
#[derive(Clone, Debug, Default)]
pub struct Compilation {
    pub cnf: Cnf,
    /// Which atom each CNF variable stands for.
    pub translation: Translation,
    /// Weights of signed CNF variables.
    pub weights: Weights<Var>,
}

pub struct ClarkCompletion<'a> {
    program: &'a RuleDatabase,
    weights: &'a Weights<Literal>,
    done: BTreeSet<Atom>,
    leaves: HashMap<(Variable, bool), NodeId>,
    compilation: Compilation,
    trace: Trace,
}

impl<'a> ClarkCompletion<'a> {
    pub fn new(program: &'a RuleDatabase, weights: &'a Weights<Literal>, trace: Trace) -> Self {
        Self {
            program,
            weights,
            done: BTreeSet::new(),
            leaves: HashMap::new(),
            compilation: Compilation::default(),
            trace,
        }
    }

    /// Emit the completion of the atom of `lit` and everything it depends
    /// on. An atom without rules is left as a free variable.
    pub fn complete(&mut self, lit: &Literal) -> Result<(), CnfError> {
        let atom = lit.atom();
        if !self.done.insert(atom.clone()) {
            return Ok(());
        }
        let program = self.program;
        let head = Variable::Atom(atom.clone());
        match program.bodies(atom) {
            [] => {
                self.variable(&head);
            }
            [body] => {
                let mut support = vec![self.leaf(&head, true)?];
                for lit in body {
                    self.complete(lit)?;
                    let necessary = [self.leaf(&head, false)?, self.literal(lit, true)?];
                    self.clause(necessary)?;
                    support.push(self.literal(lit, false)?);
                }
                self.clause(support)?;
            }
            bodies => {
                let mut support = vec![self.leaf(&head, false)?];
                for (i, body) in bodies.iter().enumerate() {
                    let aux = Variable::Body(atom.clone(), i);
                    support.push(self.leaf(&aux, true)?);
                    let sufficient = [self.leaf(&head, true)?, self.leaf(&aux, false)?];
                    self.clause(sufficient)?;

                    let mut conjunction = vec![self.leaf(&aux, true)?];
                    for lit in body {
                        self.complete(lit)?;
                        let necessary = [self.leaf(&aux, false)?, self.literal(lit, true)?];
                        self.clause(necessary)?;
                        conjunction.push(self.literal(lit, false)?);
                    }
                    self.clause(conjunction)?;
                }
                self.clause(support)?;
            }
        }
        Ok(())
    }

    /// Assert that an atom is false.
    pub fn deny(&mut self, atom: &Atom) -> Result<(), CnfError> {
        self.complete(&Literal::positive(atom.clone()))?;
        let leaf = self.leaf(&Variable::Atom(atom.clone()), false)?;
        self.clause([leaf])
    }

    /// Add an arbitrary clause over (completed) literals.
    pub fn constrain<'l>(
        &mut self,
        clause: impl IntoIterator<Item = &'l Literal>,
    ) -> Result<(), CnfError> {
        let mut leaves = Vec::new();
        for lit in clause {
            self.complete(lit)?;
            leaves.push(self.literal(lit, true)?);
        }
        self.clause(leaves)
    }

    pub fn finish(self) -> Compilation {
        let compilation = self.compilation;
        trace!(
            self.trace,
            Complete,
            "Completed {} atoms into {} clauses over {} variables",
            self.done.len(),
            compilation.cnf.len(),
            compilation.translation.len()
        );
        compilation
    }

    /// A leaf for `lit` if `same`, else for its negation.
    fn literal(&mut self, lit: &Literal, same: bool) -> Result<NodeId, CnfError> {
        let var = Variable::Atom(lit.atom().clone());
        self.leaf(&var, lit.is_positive() == same)
    }

    fn leaf(&mut self, var: &Variable, positive: bool) -> Result<NodeId, CnfError> {
        if let Some(&id) = self.leaves.get(&(var.clone(), positive)) {
            return Ok(id);
        }
        let index = self.variable(var);
        let id = self
            .compilation
            .cnf
            .leaf(if positive { index } else { -index })?;
        self.leaves.insert((var.clone(), positive), id);
        Ok(id)
    }

    /// The CNF variable for `var`, numbering and weighting it if new.
    fn variable(&mut self, var: &Variable) -> Var {
        if let Some(index) = self.compilation.translation.get(var) {
            return index;
        }
        let index = self.compilation.translation.add(var.clone());
        let (weight, opposite) = match var {
            Variable::Atom(atom) => (
                self.weights
                    .get(&Literal::positive(atom.clone()))
                    .unwrap_or(1.0),
                self.weights
                    .get(&Literal::negative(atom.clone()))
                    .unwrap_or(1.0),
            ),
            Variable::Body(..) => (1.0, 1.0),
        };
        self.compilation
            .weights
            .insert_pair(index, weight, opposite);
        trace!(self.trace, Encode, "{index} {var} {weight} {opposite}");
        index
    }

    fn clause(&mut self, leaves: impl IntoIterator<Item = NodeId>) -> Result<(), CnfError> {
        let cnf = &mut self.compilation.cnf;
        let clause = cnf.disjunction(leaves);
        cnf.add(clause)
    }
}

/// Complete the program from the given seeds.
pub fn complete<'s>(
    program: &RuleDatabase,
    weights: &Weights<Literal>,
    seeds: impl IntoIterator<Item = &'s Literal>,
    trace: Trace,
) -> Result<Compilation, CnfError> {
    let mut completion = ClarkCompletion::new(program, weights, trace);
    for seed in seeds {
        completion.complete(seed)?;
    }
    Ok(completion.finish())
}

#[cfg(test)]
pub(crate) mod test {
    use gray_codes::{InclusionExclusion, SetMutation};
    use lpwmc_syntax::{atom, neg, pos};

    use super::*;

    fn program(rules: &[(Atom, &[Literal])]) -> RuleDatabase {
        let mut program = RuleDatabase::new();
        for (head, body) in rules {
            program.add_rule(head.clone(), body.iter().cloned());
        }
        program
    }

    fn compile(program: &RuleDatabase, seeds: &[Literal]) -> Compilation {
        complete(program, &Weights::new(), seeds, Trace::none()).expect("completion failed")
    }

    fn var(c: &Compilation, atom: Atom) -> Var {
        c.translation.get(&Variable::Atom(atom)).expect("no variable")
    }

    fn aux(c: &Compilation, atom: Atom, i: usize) -> Var {
        c.translation.get(&Variable::Body(atom, i)).expect("no variable")
    }

    /// Clauses as a set of sets, ignoring order.
    fn clauses(c: &Compilation) -> BTreeSet<BTreeSet<Var>> {
        c.cnf.clauses().map(|c| c.into_iter().collect()).collect()
    }

    fn clause_set(clauses: &[&[Var]]) -> BTreeSet<BTreeSet<Var>> {
        clauses
            .iter()
            .map(|c| c.iter().copied().collect())
            .collect()
    }

    /// Call `f` on every subset of `vars`.
    pub(crate) fn each_interpretation(vars: &[u64], mut f: impl FnMut(&BTreeSet<u64>)) {
        let mut interp = BTreeSet::new();
        f(&interp);
        for mutation in InclusionExclusion::of_len(vars.len()) {
            match mutation {
                SetMutation::Insert(i) => interp.insert(vars[i]),
                SetMutation::Remove(i) => interp.remove(&vars[i]),
            };
            f(&interp);
        }
    }

    #[test]
    fn zero_rules() {
        let c = compile(&RuleDatabase::new(), &[pos!(q)]);
        assert!(c.cnf.is_empty());
        assert_eq!(var(&c, atom!(q)), 1);
        assert_eq!(c.weights.get(&1), Ok(1.0));
        assert_eq!(c.weights.get(&-1), Ok(1.0));
    }

    #[test]
    fn one_rule() {
        let p = program(&[(atom!(a), &[pos!(b), pos!(c)])]);
        let c = compile(&p, &[pos!(a)]);
        let (a, b, cc) = (var(&c, atom!(a)), var(&c, atom!(b)), var(&c, atom!(c)));
        assert_eq!(
            clauses(&c),
            clause_set(&[&[-a, b], &[-a, cc], &[a, -b, -cc]])
        );
    }

    #[test]
    fn one_rule_negation() {
        let p = program(&[(atom!(a), &[neg!(b)])]);
        let c = compile(&p, &[neg!(a)]);
        let (a, b) = (var(&c, atom!(a)), var(&c, atom!(b)));
        assert_eq!(clauses(&c), clause_set(&[&[-a, -b], &[a, b]]));
    }

    #[test]
    fn two_rules() {
        let p = program(&[(atom!(a), &[pos!(b)]), (atom!(a), &[pos!(c)])]);
        let c = compile(&p, &[pos!(a)]);
        let (a, b, cc) = (var(&c, atom!(a)), var(&c, atom!(b)), var(&c, atom!(c)));
        let (d0, d1) = (aux(&c, atom!(a), 0), aux(&c, atom!(a), 1));
        assert_eq!(c.translation.len(), 5);
        assert_eq!(
            clauses(&c),
            clause_set(&[
                &[-a, d0, d1],
                &[a, -d0],
                &[a, -d1],
                &[-d0, b],
                &[d0, -b],
                &[-d1, cc],
                &[d1, -cc],
            ])
        );
    }

    #[test]
    fn facts() {
        let p = program(&[(atom!(a), &[])]);
        let c = compile(&p, &[pos!(a)]);
        assert_eq!(clauses(&c), clause_set(&[&[1]]));
    }

    #[test]
    fn shared() {
        let p = program(&[
            (atom!(a), &[pos!(c)]),
            (atom!(b), &[pos!(c), neg!(d)]),
            (atom!(c), &[pos!(d)]),
        ]);
        let c = compile(&p, &[pos!(a), neg!(b), pos!(a)]);
        assert_eq!(c.cnf.len(), 2 + 3 + 2, "each atom is completed once");
        assert_eq!(c.translation.len(), 4);
    }

    #[test]
    fn weights() {
        let p = program(&[(atom!(a), &[pos!(b)])]);
        let mut weights = Weights::new();
        weights.insert_pair(pos!(b), 0.25, 0.75);
        let c = complete(&p, &weights, &[pos!(a)], Trace::none()).expect("completion failed");
        let (a, b) = (var(&c, atom!(a)), var(&c, atom!(b)));
        assert_eq!(c.weights.get(&b), Ok(0.25));
        assert_eq!(c.weights.get(&-b), Ok(0.75));
        assert_eq!(c.weights.get(&a), Ok(1.0), "default weight");
        assert_eq!(c.weights.get(&-a), Ok(1.0), "default weight");
    }

    #[test]
    fn bijection() {
        let p = program(&[
            (atom!(a), &[pos!(b), neg!(c)]),
            (atom!(a), &[pos!(d)]),
            (atom!(d), &[neg!(e)]),
        ]);
        let c = compile(&p, &[pos!(a)]);
        let indices = c.translation.iter().map(|(i, _)| i).collect::<Vec<_>>();
        assert_eq!(indices, (1..=7).collect::<Vec<Var>>());
        for (index, var) in c.translation.iter() {
            assert_eq!(c.translation.get(var), Some(index));
            assert_eq!(c.translation.by_index(index), Some(var));
        }
    }

    #[test]
    fn deny() {
        let (program, weights) = (RuleDatabase::new(), Weights::new());
        let mut completion = ClarkCompletion::new(&program, &weights, Trace::none());
        completion.deny(&atom!(a)).expect("deny");
        let c = completion.finish();
        assert_eq!(clauses(&c), clause_set(&[&[-1]]));
    }

    /// The models of the completion, projected onto the program's atoms,
    /// are exactly the supported models of the (acyclic) program.
    #[test]
    fn supported_models() {
        let p = program(&[
            (atom!(a), &[pos!(b), neg!(c)]),
            (atom!(a), &[pos!(d)]),
            (atom!(b), &[neg!(d)]),
            (atom!(e), &[pos!(a), pos!(b)]),
            (atom!(e), &[neg!(a)]),
            (atom!(e), &[pos!(c)]),
        ]);
        let c = compile(&p, &[pos!(e)]);
        let vars = c.cnf.variables().into_iter().collect::<Vec<_>>();
        let atom_of = |v: u64| match c.translation.by_index(v as Var) {
            Some(Variable::Atom(atom)) => Some(atom.clone()),
            _ => None,
        };
        let mut models = 0;
        each_interpretation(&vars, |interp| {
            let truths = interp.iter().filter_map(|&v| atom_of(v)).collect::<BTreeSet<_>>();
            let holds = |lit: &Literal| truths.contains(lit.atom()) == lit.is_positive();
            let supported = vars.iter().filter_map(|&v| atom_of(v)).all(|atom| {
                let bodies = p.bodies(&atom);
                bodies.is_empty() || truths.contains(&atom) == bodies.iter().any(|b| b.iter().all(holds))
            });
            let auxiliaries_agree = vars.iter().all(|&v| match c.translation.by_index(v as Var) {
                Some(Variable::Body(head, i)) => {
                    interp.contains(&v) == p.bodies(head)[*i].iter().all(holds)
                }
                _ => true,
            });
            assert_eq!(c.cnf.eval(interp), supported && auxiliaries_agree);
            models += usize::from(supported && auxiliaries_agree);
        });
        // Free atoms c and d determine everything else.
        assert_eq!(models, 4);
    }
}
