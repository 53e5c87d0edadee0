//! Break positive loops by unrolling the program from its seeds.
//!
//! Clark's completion only captures the least-model semantics of a
//! program without positive loops: in `a :- b. b :- a.` the completion
//! admits a model where `a` and `b` support each other. We therefore
//! rewrite the program depth-first from the queries and evidence,
//! tracking the set of (positive) _ancestors_ on the current derivation
//! path. A body that mentions an ancestor would close a loop, so it is
//! cut; the ancestors responsible are recorded with the rewritten atom,
//! and an atom built with a non-empty set of cuts is only valid in
//! contexts where those atoms are ancestors, so it gets a fresh name.
//! Atoms built without cuts keep their names and are shared everywhere.
//!
//! Negation blocks cyclic support, so a negative occurrence starts a new
//! derivation context with no ancestors.

use std::collections::{BTreeMap, BTreeSet};

use lpwmc_syntax::{Atom, Literal};
use lpwmc_tracer::{trace, Trace};

use crate::program::{Body, RuleDatabase};
use crate::weights::{WeightError, Weights};

/// Atoms on the current derivation path.
pub type Ancestors = BTreeSet<Atom>;

/// Ancestors whose presence forced some body to be dropped.
pub type Cuts = BTreeSet<Atom>;

/// What a literal became in a particular derivation context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolved {
    /// The same literal over a (possibly renamed) variant of its atom.
    Variant(Literal),
    /// A positive literal whose atom has no derivation here.
    Eliminated,
    /// The negation of an atom with no derivation, which always holds.
    Vacuous,
}

/// One rewriting of an original atom, valid in any context whose
/// ancestors include its cuts. An atom of `None` means eliminated.
#[derive(Clone, Debug)]
struct Variant {
    atom: Option<Atom>,
    cuts: Cuts,
}

impl Variant {
    fn new(atom: Option<Atom>, cuts: Cuts) -> Self {
        Self { atom, cuts }
    }
}

/// The result of loop breaking.
#[derive(Clone, Debug, Default)]
pub struct Unlooped {
    /// A program without positive loops.
    pub program: RuleDatabase,
    /// Weights of every atom of the new program.
    pub weights: Weights<Literal>,
    /// Evidence pinned on every variant of each evidence atom.
    pub evidence: BTreeSet<Literal>,
    /// Atoms that have no derivation at all, and must be false.
    pub falsified: BTreeSet<Atom>,
}

pub struct LoopBreaker<'a> {
    program: &'a RuleDatabase,
    weights: &'a Weights<Literal>,
    variants: BTreeMap<Atom, Vec<Variant>>,
    building: Vec<(Atom, Ancestors)>,
    pending: BTreeSet<Atom>,
    taken: BTreeSet<Atom>,
    falsified: BTreeSet<Atom>,
    acyclic: RuleDatabase,
    new_weights: Weights<Literal>,
    trace: Trace,
}

impl<'a> LoopBreaker<'a> {
    pub fn new(program: &'a RuleDatabase, weights: &'a Weights<Literal>, trace: Trace) -> Self {
        trace!(trace, Break, "Breaking loops in:\n{}", program);
        let mut taken = program.atoms();
        taken.extend(weights.iter().map(|(lit, _)| lit.atom().clone()));
        Self {
            program,
            weights,
            variants: BTreeMap::new(),
            building: Vec::new(),
            pending: BTreeSet::new(),
            taken,
            falsified: BTreeSet::new(),
            acyclic: RuleDatabase::new(),
            new_weights: Weights::new(),
            trace,
        }
    }

    /// Resolve a query, evidence, or constraint literal at the top level.
    /// An atom that is eliminated there can never be true.
    pub fn resolve_seed(&mut self, lit: &Literal) -> Result<Resolved, WeightError> {
        let (resolved, _) = self.resolve(lit, &Ancestors::new())?;
        if !matches!(resolved, Resolved::Variant(_)) {
            trace!(self.trace, Break, "No derivation of {}", lit.atom());
            self.falsified.insert(lit.atom().clone());
        }
        Ok(resolved)
    }

    /// Has `atom` been resolved in some context?
    pub fn visited(&self, atom: &Atom) -> bool {
        self.variants.contains_key(atom)
    }

    /// Finish loop breaking and rewrite the evidence onto every variant
    /// ever built for its atom. Evidence on an atom without variants
    /// keeps its original name.
    pub fn finish<'e>(mut self, evidence: impl IntoIterator<Item = &'e Literal>) -> Unlooped {
        let mut rewritten = BTreeSet::new();
        for lit in evidence {
            let names = self
                .variants
                .get(lit.atom())
                .into_iter()
                .flatten()
                .filter_map(|variant| variant.atom.clone())
                .collect::<BTreeSet<_>>();
            if names.is_empty() {
                rewritten.insert(lit.clone());
            } else {
                rewritten.extend(names.into_iter().map(|atom| lit.with_atom(atom)));
            }
        }

        let unbuilt = self
            .pending
            .iter()
            .filter(|atom| !self.acyclic.contains(atom))
            .cloned()
            .collect::<Vec<_>>();
        self.falsified.extend(unbuilt);

        trace!(self.trace, Break, "Acyclic program:\n{}", self.acyclic);
        trace!(
            self.trace,
            Break,
            "Rewritten evidence: {{{}}}",
            rewritten
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Unlooped {
            program: self.acyclic,
            weights: self.new_weights,
            evidence: rewritten,
            falsified: self.falsified,
        }
    }

    fn resolve(
        &mut self,
        lit: &Literal,
        ancestors: &Ancestors,
    ) -> Result<(Resolved, Cuts), WeightError> {
        let reset = Ancestors::new();
        let ancestors = if lit.is_positive() { ancestors } else { &reset };
        let atom = lit.atom();
        let variant = match self.lookup(atom, ancestors) {
            Some(variant) => variant,
            None => self.build(atom, ancestors)?,
        };
        let resolved = match (variant.atom, lit.is_positive()) {
            (Some(atom), _) => Resolved::Variant(lit.with_atom(atom)),
            (None, true) => Resolved::Eliminated,
            (None, false) => Resolved::Vacuous,
        };
        Ok((resolved, variant.cuts))
    }

    /// The first variant of `atom` whose cuts are all ancestors.
    fn lookup(&self, atom: &Atom, ancestors: &Ancestors) -> Option<Variant> {
        self.variants
            .get(atom)?
            .iter()
            .find(|variant| variant.cuts.is_subset(ancestors))
            .cloned()
    }

    fn build(&mut self, atom: &Atom, ancestors: &Ancestors) -> Result<Variant, WeightError> {
        if self
            .building
            .iter()
            .any(|(a, context)| a == atom && context == ancestors)
        {
            // Only reachable through negation, so the context is empty
            // and the variant (if any) will be the atom itself.
            self.pending.insert(atom.clone());
            return Ok(Variant::new(Some(atom.clone()), Cuts::new()));
        }
        if !self.program.contains(atom) {
            self.copy_weights(atom, atom)?;
            return Ok(self.record(atom, Variant::new(Some(atom.clone()), Cuts::new())));
        }

        self.building.push((atom.clone(), ancestors.clone()));
        let built = self.build_bodies(atom, ancestors);
        self.building.pop();
        let (bodies, mut cuts) = built?;
        cuts.remove(atom);

        if let Some(variant) = self.lookup(atom, &cuts) {
            return Ok(variant);
        }
        if bodies.is_empty() {
            trace!(self.trace, Break, "Eliminated {} with cuts {:?}", atom, cuts);
            return Ok(self.record(atom, Variant::new(None, cuts)));
        }
        let name = if cuts.is_empty() {
            atom.clone()
        } else {
            self.fresh_name(atom)
        };
        trace!(self.trace, Break, "Built {} as {} with cuts {:?}", atom, name, cuts);
        self.copy_weights(atom, &name)?;
        for body in bodies {
            self.acyclic.add_rule(name.clone(), body);
        }
        Ok(self.record(atom, Variant::new(Some(name), cuts)))
    }

    /// Rewrite the bodies of `atom` in the context of `ancestors`,
    /// dropping those that close a loop or cannot be satisfied.
    fn build_bodies(
        &mut self,
        atom: &Atom,
        ancestors: &Ancestors,
    ) -> Result<(Vec<Body>, Cuts), WeightError> {
        let program = self.program;
        let mut inner = ancestors.clone();
        inner.insert(atom.clone());

        let mut bodies = Vec::new();
        let mut cuts = Cuts::new();
        'bodies: for body in program.bodies(atom) {
            let loops = body
                .iter()
                .filter(|lit| lit.is_positive() && ancestors.contains(lit.atom()))
                .map(|lit| lit.atom().clone())
                .collect::<Cuts>();
            if !loops.is_empty() {
                cuts.extend(loops);
                continue;
            }

            let mut renamed = Body::new();
            let mut body_cuts = Cuts::new();
            for lit in body {
                let (resolved, lit_cuts) = self.resolve(lit, &inner)?;
                match resolved {
                    Resolved::Variant(lit) => {
                        renamed.insert(lit);
                        body_cuts.extend(lit_cuts);
                    }
                    Resolved::Vacuous => (),
                    Resolved::Eliminated => {
                        cuts.extend(lit_cuts);
                        continue 'bodies;
                    }
                }
            }
            cuts.extend(body_cuts);
            bodies.push(renamed);
        }
        Ok((bodies, cuts))
    }

    fn record(&mut self, atom: &Atom, variant: Variant) -> Variant {
        self.variants
            .entry(atom.clone())
            .or_default()
            .push(variant.clone());
        variant
    }

    /// A name that no atom of the input or output has used, e.g., `a_1`.
    fn fresh_name(&mut self, atom: &Atom) -> Atom {
        let mut n = self.variants.get(atom).map_or(0, Vec::len);
        loop {
            let name = atom.suffixed(n);
            if self.taken.insert(name.clone()) {
                return name;
            }
            n += 1;
        }
    }

    fn copy_weights(&mut self, from: &Atom, to: &Atom) -> Result<(), WeightError> {
        for lit in [
            Literal::positive(from.clone()),
            Literal::negative(from.clone()),
        ] {
            let weight = self.weights.get(&lit)?;
            self.new_weights.insert(lit.with_atom(to.clone()), weight);
        }
        Ok(())
    }
}

/// Break the positive loops reachable from the queries and evidence.
pub fn break_loops(
    program: &RuleDatabase,
    weights: &Weights<Literal>,
    queries: &BTreeSet<Literal>,
    evidence: &BTreeSet<Literal>,
    trace: Trace,
) -> Result<Unlooped, WeightError> {
    let mut breaker = LoopBreaker::new(program, weights, trace);
    for lit in queries.iter().chain(evidence) {
        breaker.resolve_seed(lit)?;
    }
    Ok(breaker.finish(evidence))
}
