//! Stabilizer chains: bases and strong generating sets.
//!
//! A base `[β₀, ..., β_{k-1}]` of a group `G` defines the chain `G = G⁽⁰⁾ ⊇ G⁽¹⁾ ⊇ ... ⊇ G⁽ᵏ⁾ = 1`
//! where `G⁽ⁱ⁺¹⁾` is the stabilizer of `βᵢ` in `G⁽ⁱ⁾`. Each level of the chain stores its base
//! point, generators for `G⁽ⁱ⁾` and the orbit of the base point with a Schreier vector.
//!
//! Chains are plain vectors of levels. Algorithms that refine a chain work on
//! [`BsgsCandidateElement`]s; finished chains are frozen into [`BsgsElement`]s, which can be
//! shared between groups.
use std::borrow::Borrow;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use num_bigint::BigUint;
use num_traits::One;

use crate::action::RightAction;
use crate::assign::AssignValue;
use crate::error::{check_degree, check_points, GroupError, Result};
use crate::perm::Perm;
use crate::schreier::SchreierVector;
use crate::El;

/// One level of a stabilizer chain.
#[derive(Clone, Debug)]
pub struct BsgsElement {
    generators: Vec<Perm>,
    schreier: SchreierVector,
}

impl BsgsElement {
    /// Fails when the base point is out of range or a generator has a different degree.
    pub fn new(base_point: El, generators: Vec<Perm>, degree: usize) -> Result<BsgsElement> {
        let schreier = SchreierVector::compute(base_point, &generators, degree)?;
        Ok(BsgsElement {
            generators,
            schreier,
        })
    }

    pub fn base_point(&self) -> El {
        self.schreier.base_point()
    }

    /// Generators of the subgroup `G⁽ⁱ⁾` this level belongs to.
    pub fn stabilizer_generators(&self) -> &[Perm] {
        &self.generators
    }

    pub fn orbit(&self) -> &[El] {
        self.schreier.orbit()
    }

    pub fn orbit_size(&self) -> usize {
        self.schreier.orbit_size()
    }

    pub fn orbit_contains(&self, point: El) -> bool {
        self.schreier.contains(point)
    }

    pub fn schreier_vector(&self) -> &SchreierVector {
        &self.schreier
    }

    /// Number of points the level's permutations act on.
    pub fn degree(&self) -> usize {
        self.schreier.degree()
    }

    /// A permutation of this level's group sending the base point to `point`.
    pub fn transversal(&self, point: El) -> Result<Perm> {
        self.schreier.transversal(point, &self.generators)
    }

    /// The inverse of [`BsgsElement::transversal`], sending `point` back to the base point.
    pub fn inverse_transversal(&self, point: El) -> Result<Perm> {
        Ok(self.transversal(point)?.inverse().get())
    }

    /// The Schreier generator `u_β · x · u_{β^x}⁻¹` for orbit point `β` and generator `x`.
    ///
    /// It always fixes the base point.
    pub fn schreier_generator(&self, point: El, generator: &Perm) -> Result<Perm> {
        check_degree(self.degree(), generator.degree())?;
        let mut result = self.transversal(point)?;
        generator.right_apply_to(&mut result);
        let image = generator.right_apply(point);
        self.inverse_transversal(image)?.right_apply_to(&mut result);
        Ok(result)
    }
}

/// A level of a stabilizer chain that is still being refined.
///
/// Derefs to [`BsgsElement`] for all read access.
#[derive(Clone, Debug)]
pub struct BsgsCandidateElement {
    element: BsgsElement,
}

impl BsgsCandidateElement {
    pub fn new(
        base_point: El,
        generators: Vec<Perm>,
        degree: usize,
    ) -> Result<BsgsCandidateElement> {
        Ok(BsgsCandidateElement {
            element: BsgsElement::new(base_point, generators, degree)?,
        })
    }

    /// Append a generator without touching the orbit.
    ///
    /// Call [`BsgsCandidateElement::recalculate_orbit_and_schreier_vector`] afterwards.
    pub fn add_stabilizer(&mut self, generator: Perm) {
        self.element.generators.push(generator);
    }

    /// Replace all generators without touching the orbit.
    pub fn set_stabilizers(&mut self, generators: Vec<Perm>) {
        self.element.generators = generators;
    }

    /// Recompute orbit and Schreier vector from scratch.
    ///
    /// Fails when a generator added since the last recomputation has a different degree.
    pub fn recalculate_orbit_and_schreier_vector(&mut self) -> Result<()> {
        let base_point = self.element.base_point();
        tracing::trace!(
            base_point,
            generators = self.element.generators.len(),
            "recomputing orbit"
        );
        let degree = self.degree();
        self.element.schreier =
            SchreierVector::compute(base_point, &self.element.generators, degree)?;
        Ok(())
    }

    pub fn into_element(self) -> BsgsElement {
        self.element
    }
}

impl Deref for BsgsCandidateElement {
    type Target = BsgsElement;

    fn deref(&self) -> &BsgsElement {
        &self.element
    }
}

impl Borrow<BsgsElement> for BsgsCandidateElement {
    fn borrow(&self) -> &BsgsElement {
        &self.element
    }
}

impl From<&BsgsElement> for BsgsCandidateElement {
    fn from(element: &BsgsElement) -> BsgsCandidateElement {
        BsgsCandidateElement {
            element: element.clone(),
        }
    }
}

/// Freeze a candidate chain.
pub fn freeze(chain: Vec<BsgsCandidateElement>) -> Vec<BsgsElement> {
    chain
        .into_iter()
        .map(BsgsCandidateElement::into_element)
        .collect()
}

/// Copy a frozen chain into a fresh candidate chain.
pub fn thaw(chain: &[BsgsElement]) -> Vec<BsgsCandidateElement> {
    chain.iter().map(BsgsCandidateElement::from).collect()
}

/// Result of sifting a permutation through a stabilizer chain.
#[derive(Clone, Debug, PartialEq)]
pub struct StripResult {
    /// What is left of the permutation after dividing out transversals.
    pub remainder: Perm,
    /// First level whose orbit did not contain the image of its base point, or the chain length.
    pub termination_level: usize,
}

impl StripResult {
    /// Whether the permutation was fully explained by the chain.
    pub fn is_trivial<E: Borrow<BsgsElement>>(&self, chain: &[E]) -> bool {
        self.termination_level == chain.len() && self.remainder.is_identity()
    }
}

/// Sift a permutation through a chain.
///
/// Fails with [`GroupError::DegreeMismatch`] when the permutation and the chain act on different
/// numbers of points.
pub fn strip<E: Borrow<BsgsElement>>(chain: &[E], perm: &Perm) -> Result<StripResult> {
    strip_from(chain, perm, 0)
}

/// Sift a permutation through the levels `start..` of a chain.
///
/// The permutation is expected to fix the base points of the levels before `start`.
pub fn strip_from<E: Borrow<BsgsElement>>(
    chain: &[E],
    perm: &Perm,
    start: usize,
) -> Result<StripResult> {
    if let Some(first) = chain.first() {
        check_degree(first.borrow().degree(), perm.degree())?;
    }
    let mut remainder = perm.clone();
    for (level, element) in chain.iter().enumerate().skip(start) {
        let element = element.borrow();
        let image = remainder.right_apply(element.base_point());
        // an image outside the orbit ends the sift
        match element.inverse_transversal(image) {
            Ok(inverse) => inverse.right_apply_to(&mut remainder),
            Err(_) => {
                return Ok(StripResult {
                    remainder,
                    termination_level: level,
                })
            }
        }
    }
    Ok(StripResult {
        remainder,
        termination_level: chain.len(),
    })
}

/// Reject remainders that fix every point but carry the antisymmetry flag.
pub(crate) fn check_consistent(perm: &Perm) -> Result<()> {
    if perm.is_identity() && perm.is_antisymmetric() {
        return Err(GroupError::InconsistentGenerators);
    }
    Ok(())
}

/// Whether `perm` belongs to the group represented by a complete chain.
///
/// The antisymmetry flag takes part: a permutation with the wrong sign is not a member.
pub fn is_member<E: Borrow<BsgsElement>>(chain: &[E], perm: &Perm) -> Result<bool> {
    let stripped = strip(chain, perm)?;
    Ok(stripped.is_trivial(chain) && !stripped.remainder.is_antisymmetric())
}

/// Product of the orbit sizes.
///
/// This is the group order for a complete chain and a divisor of it for a candidate.
pub fn order<E: Borrow<BsgsElement>>(chain: &[E]) -> BigUint {
    chain.iter().fold(BigUint::one(), |order, element| {
        order * BigUint::from(element.borrow().orbit_size())
    })
}

pub fn base_of<E: Borrow<BsgsElement>>(chain: &[E]) -> Vec<El> {
    chain.iter().map(|element| element.borrow().base_point()).collect()
}

/// Check the Schreier-Sims condition on every level.
///
/// Every Schreier generator of a level must sift through the deeper levels.
pub fn is_bsgs<E: Borrow<BsgsElement>>(chain: &[E]) -> Result<bool> {
    for (level, element) in chain.iter().enumerate() {
        let element = element.borrow();
        for &point in element.orbit() {
            for generator in element.stabilizer_generators() {
                let schreier_generator = element.schreier_generator(point, generator)?;
                let stripped = strip_from(chain, &schreier_generator, level + 1)?;
                check_consistent(&stripped.remainder)?;
                if !stripped.is_trivial(chain) {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

/// Build an unrefined chain from generators and an optional partial base.
///
/// Identity generators are dropped. The base is extended until every remaining generator moves
/// some base point, and each level receives all generators fixing the preceding base points. A
/// trivial group gets a single level without generators.
pub fn create_raw_bsgs_candidate(
    base: &[El],
    generators: &[Perm],
    degree: usize,
) -> Result<Vec<BsgsCandidateElement>> {
    if degree == 0 {
        return Err(GroupError::EmptyBsgs);
    }
    check_points(base, degree)?;

    let mut kept: Vec<Perm> = vec![];
    for generator in generators {
        check_degree(degree, generator.degree())?;
        check_consistent(generator)?;
        if !generator.is_identity() && !kept.contains(generator) {
            kept.push(generator.clone());
        }
    }

    let mut base = base.to_vec();
    for generator in kept.iter() {
        if base.iter().all(|&point| !generator.moves(point)) {
            if let Some(point) = generator.first_moved_point() {
                base.push(point);
            }
        }
    }
    if base.is_empty() {
        base.push(0);
    }

    base.iter()
        .enumerate()
        .map(|(level, &base_point)| {
            let fixing = kept
                .iter()
                .filter(|generator| base[..level].iter().all(|&point| !generator.moves(point)))
                .cloned()
                .collect();
            BsgsCandidateElement::new(base_point, fixing, degree)
        })
        .collect()
}

fn transposition(degree: usize, a: El, b: El) -> Perm {
    let mut images: Vec<El> = (0..degree as El).collect();
    images.swap(a as usize, b as usize);
    Perm::from_vec(images).unwrap_or_else(|| Perm::identity(degree))
}

fn cycle(degree: usize, points: &[El]) -> Perm {
    Perm::from_cycles(degree, &[points]).unwrap_or_else(|| Perm::identity(degree))
}

fn build_symmetric(degree: usize) -> Result<Vec<BsgsElement>> {
    if degree < 2 {
        return Ok(vec![BsgsElement::new(0, vec![], degree)?]);
    }
    (0..degree - 1)
        .map(|level| {
            let start = level as El;
            let mut generators = vec![transposition(degree, start, start + 1)];
            if degree - level > 2 {
                let points: Vec<El> = (start..degree as El).collect();
                generators.push(cycle(degree, &points));
            }
            BsgsElement::new(start, generators, degree)
        })
        .collect()
}

fn build_alternating(degree: usize) -> Result<Vec<BsgsElement>> {
    if degree < 3 {
        return Ok(vec![BsgsElement::new(0, vec![], degree)?]);
    }
    (0..degree - 2)
        .map(|level| {
            let start = level as El;
            let generators = (start + 2..degree as El)
                .map(|last| cycle(degree, &[start, start + 1, last]))
                .collect();
            BsgsElement::new(start, generators, degree)
        })
        .collect()
}

type ChainCache = OnceLock<Mutex<HashMap<usize, Arc<[BsgsElement]>>>>;

static SYMMETRIC_CHAINS: ChainCache = OnceLock::new();
static ALTERNATING_CHAINS: ChainCache = OnceLock::new();

fn cached_chain(
    cache: &ChainCache,
    degree: usize,
    build: fn(usize) -> Result<Vec<BsgsElement>>,
) -> Result<Arc<[BsgsElement]>> {
    if degree == 0 {
        return Err(GroupError::EmptyBsgs);
    }
    let mut chains = cache
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(chain) = chains.get(&degree) {
        return Ok(chain.clone());
    }
    let chain: Arc<[BsgsElement]> = build(degree)?.into();
    chains.insert(degree, chain.clone());
    Ok(chain)
}

/// Complete chain of the symmetric group on `degree` points, base `[0, ..., n-2]`.
///
/// Chains are built once per degree and shared afterwards.
pub fn symmetric_bsgs(degree: usize) -> Result<Arc<[BsgsElement]>> {
    cached_chain(&SYMMETRIC_CHAINS, degree, build_symmetric)
}

/// Complete chain of the alternating group on `degree` points, base `[0, ..., n-3]`.
pub fn alternating_bsgs(degree: usize) -> Result<Arc<[BsgsElement]>> {
    cached_chain(&ALTERNATING_CHAINS, degree, build_alternating)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::perm::Perm;

    fn perm(images: &[El]) -> Perm {
        Perm::from_vec(images.to_vec()).unwrap()
    }

    #[test]
    fn raw_candidate_distributes_generators() {
        let generators = [perm(&[1, 0, 2, 3]), perm(&[0, 1, 3, 2])];
        let chain = create_raw_bsgs_candidate(&[], &generators, 4).unwrap();
        assert_eq!(base_of(&chain), vec![0, 2]);
        assert_eq!(chain[0].stabilizer_generators().len(), 2);
        assert_eq!(chain[1].stabilizer_generators(), &[perm(&[0, 1, 3, 2])]);
        assert_eq!(order(&chain), BigUint::from(4u32));
    }

    #[test]
    fn raw_candidate_rejects_bad_input() {
        assert_eq!(
            create_raw_bsgs_candidate(&[], &[perm(&[1, 0])], 3).unwrap_err(),
            GroupError::DegreeMismatch {
                expected: 3,
                found: 2
            }
        );
        assert_eq!(
            create_raw_bsgs_candidate(&[4], &[], 3).unwrap_err(),
            GroupError::PointOutOfRange {
                point: 4,
                degree: 3
            }
        );
        assert_eq!(
            create_raw_bsgs_candidate(&[1, 1], &[], 3).unwrap_err(),
            GroupError::DuplicatePoint(1)
        );
    }

    #[test]
    fn trivial_group_has_one_level() {
        let chain = create_raw_bsgs_candidate(&[], &[Perm::identity(3)], 3).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(order(&chain), BigUint::one());
        assert!(is_bsgs(&chain).unwrap());
    }

    #[test]
    fn symmetric_and_alternating_orders() {
        let factorials = [1u32, 1, 2, 6, 24, 120, 720, 5040];
        for degree in 1..8 {
            let symmetric = symmetric_bsgs(degree).unwrap();
            assert_eq!(order(&symmetric), BigUint::from(factorials[degree]));
            assert!(is_bsgs(&symmetric).unwrap());

            let alternating = alternating_bsgs(degree).unwrap();
            let expected = if degree < 2 { 1 } else { factorials[degree] / 2 };
            assert_eq!(order(&alternating), BigUint::from(expected));
            assert!(is_bsgs(&alternating).unwrap());
        }
    }

    #[test]
    fn cached_chains_are_shared() {
        let a = symmetric_bsgs(6).unwrap();
        let b = symmetric_bsgs(6).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(symmetric_bsgs(0).unwrap_err(), GroupError::EmptyBsgs);
    }

    #[test]
    fn strip_members_and_non_members() {
        let chain = alternating_bsgs(5).unwrap();
        let even = perm(&[1, 2, 0, 4, 3]);
        let stripped = strip(&chain, &even).unwrap();
        assert!(stripped.is_trivial(&chain));
        assert!(is_member(&chain, &even).unwrap());

        let odd = perm(&[1, 0, 2, 3, 4]);
        assert!(!strip(&chain, &odd).unwrap().is_trivial(&chain));
        assert!(!is_member(&chain, &odd).unwrap());
    }

    #[test]
    fn sifting_checks_degree() {
        let chain = symmetric_bsgs(5).unwrap();
        let small = perm(&[1, 0, 2, 3]);
        let mismatch = GroupError::DegreeMismatch {
            expected: 5,
            found: 4,
        };
        assert_eq!(is_member(&chain, &small), Err(mismatch.clone()));
        assert_eq!(strip(&chain, &small), Err(mismatch.clone()));
        assert_eq!(strip_from(&chain, &small, 2), Err(mismatch));
    }

    #[test]
    fn levels_reject_bad_input() {
        assert_eq!(
            BsgsElement::new(5, vec![], 5).unwrap_err(),
            GroupError::PointOutOfRange {
                point: 5,
                degree: 5
            }
        );
        assert_eq!(
            BsgsCandidateElement::new(0, vec![perm(&[1, 0])], 3).unwrap_err(),
            GroupError::DegreeMismatch {
                expected: 3,
                found: 2
            }
        );

        let mut level = BsgsCandidateElement::new(0, vec![perm(&[1, 0, 2])], 3).unwrap();
        level.add_stabilizer(perm(&[0, 2, 1]));
        level.recalculate_orbit_and_schreier_vector().unwrap();
        assert_eq!(level.orbit_size(), 3);
        assert!(level.schreier_generator(1, &perm(&[1, 0])).is_err());
        level.add_stabilizer(perm(&[1, 0]));
        assert!(level.recalculate_orbit_and_schreier_vector().is_err());
    }

    #[test]
    fn incomplete_candidate_is_not_a_bsgs() {
        // S3 from a transposition and a 3-cycle, base [0] only covers part of the chain
        let generators = [perm(&[1, 0, 2]), perm(&[1, 2, 0])];
        let chain = create_raw_bsgs_candidate(&[], &generators, 3).unwrap();
        assert_eq!(base_of(&chain), vec![0]);
        assert!(!is_bsgs(&chain).unwrap());
    }

    #[test]
    fn antisymmetric_identity_is_inconsistent() {
        let bad = Perm::identity(2).with_antisymmetry(true);
        assert_eq!(bad.unwrap_err(), GroupError::InconsistentGenerators);
    }
}
