//! Completing stabilizer chains with the Schreier-Sims algorithm.
//!
//! All routines refine a candidate chain in place. On success the chain is a base and strong
//! generating set for the group generated by its top level. The deterministic variant checks every
//! Schreier generator; the randomized variant sifts random elements instead and either stops
//! after enough consecutive successes or once a known group order is reached.
use num_bigint::BigUint;
use rand::Rng;

use crate::bsgs::{
    base_of, check_consistent, create_raw_bsgs_candidate, order, strip, strip_from,
    BsgsCandidateElement,
};
use crate::error::{GroupError, Result};
use crate::perm::Perm;
use crate::random::ProductReplacement;
use crate::schreier::SchreierVector;
use crate::El;

/// Complete a candidate chain, checking all Schreier generators (Holt, SCHREIERSIMS).
///
/// Levels are processed from the deepest one up. Whenever a Schreier generator fails to sift, the
/// remainder is added to the levels it belongs to (appending a base point if it fixes the whole
/// base) and processing restarts at the deepest level that changed.
pub fn schreier_sims(chain: &mut Vec<BsgsCandidateElement>) -> Result<()> {
    if chain.is_empty() {
        return Err(GroupError::EmptyBsgs);
    }

    let mut level = chain.len();
    while level > 0 {
        let current = level - 1;
        match find_unsifted_schreier_generator(chain, current)? {
            None => level -= 1,
            Some((remainder, termination_level)) => {
                let target = add_remainder(chain, remainder, current + 1, termination_level)?;
                level = target + 1;
            }
        }
    }
    Ok(())
}

/// Look for a Schreier generator of `level` that does not sift through the deeper levels.
fn find_unsifted_schreier_generator(
    chain: &[BsgsCandidateElement],
    level: usize,
) -> Result<Option<(Perm, usize)>> {
    let element = &chain[level];
    for &point in element.orbit() {
        for generator in element.stabilizer_generators() {
            let schreier_generator = element.schreier_generator(point, generator)?;
            check_consistent(&schreier_generator)?;
            if schreier_generator.is_identity() {
                continue;
            }
            let stripped = strip_from(chain, &schreier_generator, level + 1)?;
            check_consistent(&stripped.remainder)?;
            if !stripped.is_trivial(chain) {
                return Ok(Some((stripped.remainder, stripped.termination_level)));
            }
        }
    }
    Ok(None)
}

/// Add a sift remainder to the levels `first..=termination_level`.
///
/// A remainder that sifted through the whole chain fixes every base point; a new base point moved
/// by it is appended first. Returns the deepest level that received the remainder.
fn add_remainder(
    chain: &mut Vec<BsgsCandidateElement>,
    remainder: Perm,
    first: usize,
    termination_level: usize,
) -> Result<usize> {
    let target = if termination_level == chain.len() {
        let degree = remainder.degree();
        let point = remainder.first_moved_point().unwrap_or(0);
        tracing::debug!(point, level = chain.len(), "extending base");
        chain.push(BsgsCandidateElement::new(point, vec![], degree)?);
        chain.len() - 1
    } else {
        termination_level
    };

    for element in chain[first.min(target)..=target].iter_mut() {
        element.add_stabilizer(remainder.clone());
        element.recalculate_orbit_and_schreier_vector()?;
    }
    Ok(target)
}

/// Sift one element and extend the chain if it does not sift. Returns whether it was extended.
fn sift_and_extend(chain: &mut Vec<BsgsCandidateElement>, element: &Perm) -> Result<bool> {
    let stripped = strip(chain, element)?;
    check_consistent(&stripped.remainder)?;
    if stripped.is_trivial(chain) {
        return Ok(false);
    }
    // the top level already generates the whole group, so new generators go one level deeper
    let first = if stripped.termination_level == 0 { 0 } else { 1 };
    add_remainder(chain, stripped.remainder, first, stripped.termination_level)?;
    Ok(true)
}

/// Number of consecutive successful sifts needed for a given confidence level.
pub fn sifts_for_confidence(confidence: f64) -> Result<usize> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(GroupError::ConfidenceOutOfRange(confidence));
    }
    if confidence >= 1.0 {
        return Ok(usize::max_value());
    }
    Ok((-(1.0 - confidence).log2()).ceil().max(0.0) as usize)
}

/// Complete a candidate chain with random elements (Holt, RANDOMSCHREIER).
///
/// Stops after `ceil(-log2(1 - confidence))` consecutive random elements sifted without extending
/// the chain. The result is a complete chain with probability at least `confidence`; it never
/// describes a group larger than the one generated by the top level. A confidence of exactly 1
/// runs one randomized pass at the default confidence followed by [`schreier_sims`].
pub fn random_schreier_sims<R: Rng + ?Sized>(
    chain: &mut Vec<BsgsCandidateElement>,
    confidence: f64,
    rng: &mut R,
) -> Result<()> {
    let mut required = sifts_for_confidence(confidence)?;
    if chain.is_empty() {
        return Err(GroupError::EmptyBsgs);
    }
    let exact = required == usize::max_value();
    if exact {
        required = sifts_for_confidence(crate::config::DEFAULT_CONFIDENCE)?;
    }

    let degree = chain[0].degree();
    let mut source = ProductReplacement::new(chain[0].stabilizer_generators(), degree, rng)?;

    let mut sifted = 0;
    while sifted < required {
        let element = source.next_element(rng);
        if sift_and_extend(chain, &element)? {
            sifted = 0;
        } else {
            sifted += 1;
        }
    }
    tracing::debug!(
        base = ?base_of(chain),
        order = %order(chain),
        "randomized Schreier-Sims finished"
    );

    if exact {
        schreier_sims(chain)?;
    }
    Ok(())
}

/// Complete a candidate chain with random elements until it reaches a known group order.
///
/// Every extension strictly increases the order of the chain, so this terminates whenever
/// `target` is the order of the group generated by the top level. Passing any other order loops
/// forever.
pub fn random_schreier_sims_with_order<R: Rng + ?Sized>(
    chain: &mut Vec<BsgsCandidateElement>,
    target: &BigUint,
    rng: &mut R,
) -> Result<()> {
    if chain.is_empty() {
        return Err(GroupError::EmptyBsgs);
    }
    let degree = chain[0].degree();
    let mut source = ProductReplacement::new(chain[0].stabilizer_generators(), degree, rng)?;
    while &order(chain) != target {
        let element = source.next_element(rng);
        sift_and_extend(chain, &element)?;
    }
    Ok(())
}

/// Drop generators that are not needed to generate their level's group.
///
/// The textbook version only compares orbits, which relies on every level's generators being a
/// literal subset of the level above. Chains refined by Schreier-Sims don't keep that property, so
/// a generator is only dropped after the remaining ones are shown to generate a group of the same
/// order, using a fresh deterministic Schreier-Sims run.
pub fn remove_redundant_generators(chain: &mut [BsgsCandidateElement]) -> Result<()> {
    for level in (0..chain.len()).rev() {
        let base = base_of(&chain[level..]);
        let level_order = order(&chain[level..]);
        let degree = chain[level].degree();

        let mut index = 0;
        while index < chain[level].stabilizer_generators().len() {
            let generators = chain[level].stabilizer_generators();
            let mut reduced = generators.to_vec();
            reduced.remove(index);

            let orbit_size = SchreierVector::compute(base[0], &reduced, degree)?.orbit_size();
            if orbit_size == chain[level].orbit_size()
                && generates_order(&base, &reduced, degree, &level_order)?
            {
                chain[level].set_stabilizers(reduced);
                chain[level].recalculate_orbit_and_schreier_vector()?;
            } else {
                index += 1;
            }
        }
    }
    Ok(())
}

fn generates_order(
    base: &[El],
    generators: &[Perm],
    degree: usize,
    expected: &BigUint,
) -> Result<bool> {
    let mut candidate = create_raw_bsgs_candidate(base, generators, degree)?;
    schreier_sims(&mut candidate)?;
    Ok(&order(&candidate) == expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::seq::SliceRandom;
    use rand::{rngs::SmallRng, SeedableRng};

    use crate::bsgs::{is_bsgs, is_member};

    fn perm(images: &[El]) -> Perm {
        Perm::from_vec(images.to_vec()).unwrap()
    }

    fn s5_generators() -> Vec<Perm> {
        vec![perm(&[1, 2, 3, 4, 0]), perm(&[1, 0, 2, 3, 4])]
    }

    fn brute_force_order(generators: &[Perm], degree: usize) -> usize {
        let mut elements = vec![Perm::identity(degree)];
        let mut seen: std::collections::HashSet<Perm> = elements.iter().cloned().collect();
        let mut pos = 0;
        while pos < elements.len() {
            for generator in generators {
                let next = elements[pos].compose(generator).unwrap();
                if seen.insert(next.clone()) {
                    elements.push(next);
                }
            }
            pos += 1;
        }
        elements.len()
    }

    #[test]
    fn deterministic_s5() {
        let mut chain = create_raw_bsgs_candidate(&[], &s5_generators(), 5).unwrap();
        schreier_sims(&mut chain).unwrap();
        assert_eq!(order(&chain), BigUint::from(120u32));
        assert!(is_bsgs(&chain).unwrap());
        for generator in s5_generators() {
            assert!(is_member(&chain, &generator).unwrap());
        }
    }

    #[test]
    fn deterministic_matches_brute_force() {
        let groups: Vec<(Vec<Perm>, usize)> = vec![
            // dihedral group of the square
            (vec![perm(&[1, 2, 3, 0]), perm(&[0, 3, 2, 1])], 4),
            // A4
            (vec![perm(&[1, 2, 0, 3]), perm(&[0, 2, 3, 1])], 4),
            // direct product of two S3 on disjoint points
            (
                vec![
                    perm(&[1, 0, 2, 3, 4, 5]),
                    perm(&[1, 2, 0, 3, 4, 5]),
                    perm(&[0, 1, 2, 4, 3, 5]),
                    perm(&[0, 1, 2, 4, 5, 3]),
                ],
                6,
            ),
            // cyclic group of order 6 on six points
            (vec![perm(&[1, 2, 0, 4, 3, 5])], 6),
            // PGL(2, 5) acting on the projective line
            (vec![perm(&[1, 2, 3, 4, 0, 5]), perm(&[5, 4, 2, 3, 1, 0])], 6),
        ];
        for (generators, degree) in groups {
            let mut chain = create_raw_bsgs_candidate(&[], &generators, degree).unwrap();
            schreier_sims(&mut chain).unwrap();
            assert!(is_bsgs(&chain).unwrap());
            assert_eq!(
                order(&chain),
                BigUint::from(brute_force_order(&generators, degree))
            );
        }
    }

    #[test]
    fn known_base_is_kept_as_prefix() {
        let mut chain = create_raw_bsgs_candidate(&[4, 2], &s5_generators(), 5).unwrap();
        schreier_sims(&mut chain).unwrap();
        assert_eq!(&base_of(&chain)[..2], &[4, 2]);
        assert_eq!(order(&chain), BigUint::from(120u32));
    }

    #[test]
    fn randomized_with_confidence() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..10 {
            let mut chain = create_raw_bsgs_candidate(&[], &s5_generators(), 5).unwrap();
            random_schreier_sims(&mut chain, 0.9999, &mut rng).unwrap();
            // never too large
            assert!(order(&chain) <= BigUint::from(120u32));
            schreier_sims(&mut chain).unwrap();
            assert_eq!(order(&chain), BigUint::from(120u32));
        }
    }

    #[test]
    fn randomized_runs_complete_at_confidence_rate() {
        let mut rng = SmallRng::seed_from_u64(17);
        let confidence = 0.9;
        let runs = 200;
        let mut complete = 0;
        for _ in 0..runs {
            let generators: Vec<Perm> = (0..2)
                .map(|_| {
                    let mut images: Vec<El> = (0..9).collect();
                    images.shuffle(&mut rng);
                    perm(&images)
                })
                .collect();
            let mut chain = create_raw_bsgs_candidate(&[], &generators, 9).unwrap();
            random_schreier_sims(&mut chain, confidence, &mut rng).unwrap();
            if is_bsgs(&chain).unwrap() {
                complete += 1;
            }
        }
        let rate = complete as f64 / runs as f64;
        assert!(rate >= confidence - 0.1, "only {complete} of {runs} chains complete");
    }

    #[test]
    fn randomized_with_full_confidence_is_exact() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut chain = create_raw_bsgs_candidate(&[], &s5_generators(), 5).unwrap();
        random_schreier_sims(&mut chain, 1.0, &mut rng).unwrap();
        assert!(is_bsgs(&chain).unwrap());
        assert_eq!(order(&chain), BigUint::from(120u32));
    }

    #[test]
    fn randomized_with_known_order() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut chain = create_raw_bsgs_candidate(&[], &s5_generators(), 5).unwrap();
        random_schreier_sims_with_order(&mut chain, &BigUint::from(120u32), &mut rng).unwrap();
        assert!(is_bsgs(&chain).unwrap());
    }

    #[test]
    fn confidence_is_validated() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut chain = create_raw_bsgs_candidate(&[], &s5_generators(), 5).unwrap();
        assert_eq!(
            random_schreier_sims(&mut chain, 1.5, &mut rng),
            Err(GroupError::ConfidenceOutOfRange(1.5))
        );
        assert_eq!(sifts_for_confidence(0.0), Ok(0));
        assert_eq!(sifts_for_confidence(0.75), Ok(2));
        assert_eq!(sifts_for_confidence(1.0 - 1e-6), Ok(20));
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert_eq!(schreier_sims(&mut vec![]), Err(GroupError::EmptyBsgs));
    }

    #[test]
    fn inconsistent_generators_propagate() {
        // the square of the flagged 4-cycle is the unflagged double transposition
        let cycle = Perm::antisymmetric(vec![1, 2, 3, 0]).unwrap();
        let double = Perm::antisymmetric(vec![2, 3, 0, 1]).unwrap();
        let mut chain = create_raw_bsgs_candidate(&[], &[cycle, double], 4).unwrap();
        assert_eq!(
            schreier_sims(&mut chain),
            Err(GroupError::InconsistentGenerators)
        );
    }

    #[test]
    fn redundant_generators_are_removed() {
        let mut generators = s5_generators();
        generators.push(perm(&[0, 2, 1, 3, 4]));
        generators.push(perm(&[2, 3, 4, 0, 1]));
        let mut chain = create_raw_bsgs_candidate(&[], &generators, 5).unwrap();
        schreier_sims(&mut chain).unwrap();
        remove_redundant_generators(&mut chain).unwrap();
        assert_eq!(order(&chain), BigUint::from(120u32));
        assert!(is_bsgs(&chain).unwrap());
        assert!(chain[0].stabilizer_generators().len() <= 3);
    }
}
