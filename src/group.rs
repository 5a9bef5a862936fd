//! Permutation groups given by generators.
//!
//! A [`PermGroup`] stores its generators and computes a stabilizer chain the first time a query
//! needs one. Chains are built with the randomized Schreier-Sims algorithm, seeded from the
//! group's [`GroupConfig`], and then verified deterministically unless the config says otherwise.
use std::fmt;
use std::sync::{Arc, OnceLock};

use num_bigint::BigUint;
use num_traits::One;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::bsgs::{
    self, alternating_bsgs, create_raw_bsgs_candidate, freeze, symmetric_bsgs, BsgsElement,
};
use crate::config::GroupConfig;
use crate::error::{check_degree, check_points, GroupError, Result};
use crate::perm::Perm;
use crate::random::ProductReplacement;
use crate::schreier::SchreierVector;
use crate::schreier_sims::{random_schreier_sims, schreier_sims, sifts_for_confidence};
use crate::search::subgroup;
use crate::El;

/// A permutation group on the points `0..degree`.
#[derive(Clone, Debug)]
pub struct PermGroup {
    degree: usize,
    generators: Vec<Perm>,
    base: Vec<El>,
    config: GroupConfig,
    chain: OnceLock<Arc<[BsgsElement]>>,
}

impl PermGroup {
    /// The group generated by a non-empty list of permutations of equal degree.
    pub fn new(generators: Vec<Perm>) -> Result<PermGroup> {
        let degree = generators.first().ok_or(GroupError::EmptyGroup)?.degree();
        for generator in generators.iter() {
            check_degree(degree, generator.degree())?;
        }
        Ok(PermGroup {
            degree,
            generators,
            base: vec![],
            config: GroupConfig::default(),
            chain: OnceLock::new(),
        })
    }

    /// Like [`PermGroup::new`], with a base prefix for the stabilizer chain.
    pub fn with_base(generators: Vec<Perm>, base: &[El]) -> Result<PermGroup> {
        let mut group = PermGroup::new(generators)?;
        check_points(base, group.degree)?;
        group.base = base.to_vec();
        Ok(group)
    }

    pub fn trivial(degree: usize) -> PermGroup {
        PermGroup {
            degree,
            generators: vec![],
            base: vec![],
            config: GroupConfig::default(),
            chain: OnceLock::new(),
        }
    }

    /// The symmetric group, with a precomputed chain.
    pub fn symmetric(degree: usize) -> Result<PermGroup> {
        Ok(PermGroup::from_chain(symmetric_bsgs(degree)?, GroupConfig::default()))
    }

    /// The alternating group, with a precomputed chain.
    pub fn alternating(degree: usize) -> Result<PermGroup> {
        Ok(PermGroup::from_chain(alternating_bsgs(degree)?, GroupConfig::default()))
    }

    fn from_chain(chain: Arc<[BsgsElement]>, config: GroupConfig) -> PermGroup {
        let degree = chain.first().map_or(0, BsgsElement::degree);
        let generators = chain
            .first()
            .map_or_else(Vec::new, |top| top.stabilizer_generators().to_vec());
        PermGroup {
            degree,
            generators,
            base: vec![],
            config,
            chain: OnceLock::from(chain),
        }
    }

    fn derived(&self, chain: Vec<BsgsElement>) -> PermGroup {
        PermGroup::from_chain(chain.into(), self.config)
    }

    /// Replace the configuration used for chain construction.
    pub fn with_config(mut self, config: GroupConfig) -> Result<PermGroup> {
        sifts_for_confidence(config.confidence)?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn generators(&self) -> &[Perm] {
        &self.generators
    }

    fn build_chain(&self) -> Result<Vec<BsgsElement>> {
        tracing::debug!(
            degree = self.degree,
            generators = self.generators.len(),
            "building stabilizer chain"
        );
        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        let mut chain = create_raw_bsgs_candidate(&self.base, &self.generators, self.degree)?;
        random_schreier_sims(&mut chain, self.config.confidence, &mut rng)?;
        if self.config.verify {
            schreier_sims(&mut chain)?;
        }
        Ok(freeze(chain))
    }

    /// The stabilizer chain of this group, computed on first use.
    pub fn bsgs(&self) -> Result<Arc<[BsgsElement]>> {
        if let Some(chain) = self.chain.get() {
            return Ok(chain.clone());
        }
        let chain: Arc<[BsgsElement]> = self.build_chain()?.into();
        Ok(self.chain.get_or_init(|| chain).clone())
    }

    pub fn base(&self) -> Result<Vec<El>> {
        Ok(bsgs::base_of(&self.bsgs()?))
    }

    pub fn order(&self) -> Result<BigUint> {
        Ok(bsgs::order(&self.bsgs()?))
    }

    pub fn is_trivial(&self) -> bool {
        self.generators.iter().all(Perm::is_identity)
    }

    pub fn is_member(&self, perm: &Perm) -> Result<bool> {
        check_degree(self.degree, perm.degree())?;
        bsgs::is_member(&self.bsgs()?, perm)
    }

    /// Whether every generator of `other` is a member of this group.
    pub fn contains_subgroup(&self, other: &PermGroup) -> Result<bool> {
        check_degree(self.degree, other.degree)?;
        let chain = self.bsgs()?;
        for generator in other.generators.iter() {
            if !bsgs::is_member(&chain, generator)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A random element, close to uniformly distributed.
    pub fn random_element<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Perm> {
        Ok(ProductReplacement::new(&self.generators, self.degree, rng)?.next_element(rng))
    }

    /// Orbit of a point in discovery order.
    pub fn orbit(&self, point: El) -> Result<Vec<El>> {
        Ok(SchreierVector::compute(point, &self.generators, self.degree)?
            .orbit()
            .to_vec())
    }

    /// All orbits, ordered by their least point.
    pub fn orbits(&self) -> Result<Vec<Vec<El>>> {
        let mut seen = vec![false; self.degree];
        let mut orbits = vec![];
        for point in 0..self.degree as El {
            if seen[point as usize] {
                continue;
            }
            let orbit = self.orbit(point)?;
            for &member in orbit.iter() {
                seen[member as usize] = true;
            }
            orbits.push(orbit);
        }
        Ok(orbits)
    }

    pub fn is_transitive(&self) -> Result<bool> {
        if self.degree <= 1 {
            return Ok(true);
        }
        Ok(SchreierVector::compute(0, &self.generators, self.degree)?.orbit_size() == self.degree)
    }

    pub fn is_abelian(&self) -> Result<bool> {
        for (index, generator) in self.generators.iter().enumerate() {
            for other in self.generators[index + 1..].iter() {
                if !generator.commutes_with(other)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Whether this is the full symmetric group on its points.
    pub fn is_symmetric(&self) -> Result<bool> {
        Ok(self.order()? == factorial(self.degree))
    }

    /// Whether this is the alternating group on its points.
    pub fn is_alternating(&self) -> Result<bool> {
        if self.degree < 3 {
            return Ok(self.order()?.is_one());
        }
        if self.generators.iter().any(Perm::is_odd) {
            return Ok(false);
        }
        Ok(self.order()? * BigUint::from(2u32) == factorial(self.degree))
    }

    /// Elements fixing every point in `points`.
    pub fn pointwise_stabilizer(&self, points: &[El]) -> Result<PermGroup> {
        let chain = subgroup::pointwise_stabilizer(&self.bsgs()?, points)?;
        Ok(self.derived(chain))
    }

    /// Elements mapping `set` onto itself.
    pub fn setwise_stabilizer(&self, set: &[El]) -> Result<PermGroup> {
        let chain = subgroup::setwise_stabilizer(&self.bsgs()?, set)?;
        Ok(self.derived(chain))
    }

    /// Elements of this group commuting with every element of `other`.
    pub fn centralizer_of(&self, other: &PermGroup) -> Result<PermGroup> {
        check_degree(self.degree, other.degree)?;
        if other.is_trivial() {
            return Ok(self.clone());
        }
        let unsigned = self
            .generators
            .iter()
            .chain(other.generators.iter())
            .all(|generator| !generator.is_antisymmetric());
        // a transitive abelian group is its own centralizer in the symmetric group
        if unsigned && other.is_transitive()? && other.is_abelian()? {
            if self.is_symmetric()? {
                return Ok(other.clone());
            }
            if self.is_alternating()? && !other.generators.iter().any(Perm::is_odd) {
                return Ok(other.clone());
            }
        }
        let chain = subgroup::centralizer(&self.bsgs()?, &other.generators)?;
        Ok(self.derived(chain))
    }

    pub fn centralizer_of_element(&self, element: &Perm) -> Result<PermGroup> {
        self.centralizer_of(&PermGroup::new(vec![element.clone()])?)
    }

    pub fn center(&self) -> Result<PermGroup> {
        self.centralizer_of(self)
    }

    /// The smallest normal subgroup of this group containing `other`.
    ///
    /// Conjugates of the generators by the generators of this group are added until the
    /// generated group no longer grows.
    pub fn normal_closure_of(&self, other: &PermGroup) -> Result<PermGroup> {
        check_degree(self.degree, other.degree)?;
        let mut generators: Vec<Perm> = other
            .generators
            .iter()
            .filter(|generator| !generator.is_identity())
            .cloned()
            .collect();
        let mut chain = create_raw_bsgs_candidate(&[], &generators, self.degree)?;
        schreier_sims(&mut chain)?;

        let mut pending = generators.clone();
        while let Some(element) = pending.pop() {
            for by in self.generators.iter() {
                let conjugate = element.conjugate(by)?;
                if bsgs::is_member(&chain, &conjugate)? {
                    continue;
                }
                chain[0].add_stabilizer(conjugate.clone());
                chain[0].recalculate_orbit_and_schreier_vector()?;
                schreier_sims(&mut chain)?;
                generators.push(conjugate.clone());
                pending.push(conjugate);
            }
        }

        let mut closure = PermGroup::from_chain(freeze(chain).into(), self.config);
        closure.generators = generators;
        Ok(closure)
    }

    /// The group generated by the generators of both groups.
    pub fn union(&self, other: &PermGroup) -> Result<PermGroup> {
        check_degree(self.degree, other.degree)?;
        let generators: Vec<Perm> = self
            .generators
            .iter()
            .chain(other.generators.iter())
            .cloned()
            .collect();
        if generators.is_empty() {
            return Ok(PermGroup::trivial(self.degree));
        }
        PermGroup::new(generators)?.with_config(self.config)
    }

    /// The commutator subgroup `[G, H]`, the normal closure of all commutators of generators in
    /// the group generated by both.
    pub fn commutator(&self, other: &PermGroup) -> Result<PermGroup> {
        check_degree(self.degree, other.degree)?;
        let mut commutators: Vec<Perm> = vec![];
        for g in self.generators.iter() {
            for h in other.generators.iter() {
                let commutator = g.commutator(h)?;
                if !commutator.is_identity() {
                    commutators.push(commutator);
                }
            }
        }
        if commutators.is_empty() {
            return Ok(PermGroup::trivial(self.degree));
        }
        self.union(other)?
            .normal_closure_of(&PermGroup::new(commutators)?)
    }

    pub fn derived_subgroup(&self) -> Result<PermGroup> {
        self.commutator(self)
    }

    /// Intersection of two groups, searching the smaller one.
    pub fn intersection(&self, other: &PermGroup) -> Result<PermGroup> {
        check_degree(self.degree, other.degree)?;
        let chain = if self.order()? <= other.order()? {
            subgroup::intersection(&self.bsgs()?, &other.bsgs()?)?
        } else {
            subgroup::intersection(&other.bsgs()?, &self.bsgs()?)?
        };
        Ok(self.derived(chain))
    }

    /// The least element of every coset `H g` of `subgroup` in this group.
    pub fn left_coset_representatives(&self, subgroup: &PermGroup) -> Result<Vec<Perm>> {
        subgroup::left_coset_representatives(&self.bsgs()?, &subgroup.bsgs()?)
    }

    /// The representative of the coset of `subgroup` containing `element`.
    pub fn left_transversal_of(&self, subgroup: &PermGroup, element: &Perm) -> Result<Perm> {
        subgroup::left_transversal_of(&self.bsgs()?, &subgroup.bsgs()?, element)
    }

    /// All elements mapping `from[i]` to `to[i]`, produced lazily.
    pub fn mappings(
        &self,
        from: &[El],
        to: &[El],
    ) -> Result<impl Iterator<Item = Result<Perm>>> {
        subgroup::mappings(&self.bsgs()?, from, to)
    }

    /// Some element mapping `from[i]` to `to[i]`, if there is one.
    pub fn mapping(&self, from: &[El], to: &[El]) -> Result<Option<Perm>> {
        self.mappings(from, to)?.next().transpose()
    }
}

fn factorial(n: usize) -> BigUint {
    (2..=n).fold(BigUint::one(), |product, factor| product * BigUint::from(factor))
}

impl fmt::Display for PermGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("<")?;
        for (index, generator) in self.generators.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            fmt::Display::fmt(generator, f)?;
        }
        f.write_str(">")
    }
}
