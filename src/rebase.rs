//! Changing the base of a complete stabilizer chain.
//!
//! Every strategy replaces the base by one starting with a requested sequence of points while
//! keeping the represented group. Leftover base points follow, and levels beyond the requested
//! prefix whose orbit is a single point are dropped.
use rand::Rng;

use crate::action::{LeftAction, RightAction};
use crate::assign::AssignValue;
use crate::bsgs::{create_raw_bsgs_candidate, order, BsgsCandidateElement};
use crate::error::{check_points, GroupError, Result};
use crate::perm::Perm;
use crate::schreier::SchreierVector;
use crate::schreier_sims::random_schreier_sims_with_order;
use crate::El;

/// How [`rebase`] restructures the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseStrategy {
    /// Move each new point into place by swapping adjacent base points.
    Transpositions,
    /// Conjugate whenever a new point lies in the current orbit, swap otherwise.
    Conjugation,
    /// Build a new chain for the requested base, using the known group order.
    FromScratch,
}

impl Default for RebaseStrategy {
    fn default() -> Self {
        RebaseStrategy::Conjugation
    }
}

/// Change the base of a complete chain to start with `new_base`.
pub fn rebase<R: Rng + ?Sized>(
    chain: &mut Vec<BsgsCandidateElement>,
    new_base: &[El],
    strategy: RebaseStrategy,
    rng: &mut R,
) -> Result<()> {
    match strategy {
        RebaseStrategy::Transpositions => rebase_with_transpositions(chain, new_base),
        RebaseStrategy::Conjugation => rebase_with_conjugation(chain, new_base),
        RebaseStrategy::FromScratch => rebase_from_scratch(chain, new_base, rng),
    }
}

fn check_rebase_input(chain: &[BsgsCandidateElement], new_base: &[El]) -> Result<usize> {
    let degree = chain.first().ok_or(GroupError::EmptyBsgs)?.degree();
    check_points(new_base, degree)?;
    Ok(degree)
}

/// Swap the base points of levels `level` and `level + 1` (Holt, BASESWAP).
///
/// The chain must be complete. The new level `level` keeps the old generators, the new level
/// `level + 1` gets generators of the two-point stabilizer, collected until its orbit has the size
/// predicted by the orbit-stabilizer theorem.
pub fn swap_adjacent_base_points(
    chain: &mut [BsgsCandidateElement],
    level: usize,
) -> Result<()> {
    if level + 1 >= chain.len() {
        return Err(GroupError::LevelOutOfRange {
            level,
            length: chain.len(),
        });
    }
    let degree = chain[level].degree();
    let point = chain[level].base_point();
    let next_point = chain[level + 1].base_point();

    let upper_generators = chain[level].stabilizer_generators().to_vec();
    let swapped_upper = SchreierVector::compute(next_point, &upper_generators, degree)?;
    let target_size =
        chain[level].orbit_size() * chain[level + 1].orbit_size() / swapped_upper.orbit_size();

    let mut generators = chain
        .get(level + 2)
        .map_or_else(Vec::new, |element| element.stabilizer_generators().to_vec());
    let mut lower = SchreierVector::compute(point, &generators, degree)?;
    let mut rejected = vec![false; degree];

    for &gamma in chain[level].orbit().iter() {
        if lower.orbit_size() >= target_size {
            break;
        }
        if gamma == point || lower.contains(gamma) || rejected[gamma as usize] {
            continue;
        }
        let transversal = chain[level].transversal(gamma)?;
        let preimage = transversal.inverse_image(next_point);
        if chain[level + 1].orbit_contains(preimage) {
            // fixes `point`, sends `next_point` to `preimage`; times the transversal it fixes
            // `next_point` and sends `point` to `gamma`
            let mut element = chain[level + 1].transversal(preimage)?;
            transversal.right_apply_to(&mut element);
            generators.push(element);
            lower = SchreierVector::compute(point, &generators, degree)?;
        } else {
            for &unreachable in SchreierVector::compute(gamma, &generators, degree)?.orbit() {
                rejected[unreachable as usize] = true;
            }
        }
    }

    chain[level] = BsgsCandidateElement::new(next_point, upper_generators, degree)?;
    chain[level + 1] = BsgsCandidateElement::new(point, generators, degree)?;
    Ok(())
}

/// Insert a level with base point `point` at the first position `>= from` whose group fixes it.
///
/// The new level has a one-point orbit and shares its generators with the level below it.
fn insert_redundant_level(
    chain: &mut Vec<BsgsCandidateElement>,
    point: El,
    from: usize,
) -> Result<usize> {
    let degree = chain[0].degree();
    let position = (from..chain.len())
        .find(|&level| {
            chain[level]
                .stabilizer_generators()
                .iter()
                .all(|generator| !generator.moves(point))
        })
        .unwrap_or(chain.len());
    let generators = chain
        .get(position)
        .map_or_else(Vec::new, |element| element.stabilizer_generators().to_vec());
    chain.insert(
        position,
        BsgsCandidateElement::new(point, generators, degree)?,
    );
    Ok(position)
}

/// Bring `point` to level `level`, inserting it first if it is not a base point.
fn move_point_to_level(
    chain: &mut Vec<BsgsCandidateElement>,
    point: El,
    level: usize,
) -> Result<()> {
    let position = match chain.iter().position(|element| element.base_point() == point) {
        Some(position) => position,
        None => insert_redundant_level(chain, point, level)?,
    };
    for swap_level in (level..position).rev() {
        swap_adjacent_base_points(chain, swap_level)?;
    }
    Ok(())
}

/// Drop levels at index `keep` or beyond whose orbit is a single point.
///
/// Such a level's group equals the next level's group. At least one level always remains.
pub fn remove_redundant_levels(chain: &mut Vec<BsgsCandidateElement>, keep: usize) {
    let mut level = keep;
    while level < chain.len() {
        if chain.len() > 1 && chain[level].orbit_size() == 1 {
            chain.remove(level);
        } else {
            level += 1;
        }
    }
}

/// Change the base using adjacent base point swaps only.
pub fn rebase_with_transpositions(
    chain: &mut Vec<BsgsCandidateElement>,
    new_base: &[El],
) -> Result<()> {
    check_rebase_input(chain, new_base)?;
    for (level, &point) in new_base.iter().enumerate() {
        if level < chain.len() && chain[level].base_point() == point {
            continue;
        }
        move_point_to_level(chain, point, level)?;
    }
    remove_redundant_levels(chain, new_base.len());
    tracing::debug!(base = ?new_base, "rebased with transpositions");
    Ok(())
}

/// Change the base, conjugating where possible and swapping otherwise.
///
/// While scanning the requested base, a running conjugating permutation `c` from the group is
/// kept, so that the chain conjugated by `c` has the requested prefix. A requested point whose
/// preimage under `c` already lies in the current level's orbit only updates `c`; all other
/// points are moved in by swaps. Finally every level from the first one touched by `c` is
/// conjugated.
pub fn rebase_with_conjugation(
    chain: &mut Vec<BsgsCandidateElement>,
    new_base: &[El],
) -> Result<()> {
    let degree = check_rebase_input(chain, new_base)?;

    let mut conjugator = Perm::identity(degree);
    let mut conjugator_inverse = Perm::identity(degree);
    let mut first_conjugated = None;
    let mut scratch = vec![];

    for (level, &point) in new_base.iter().enumerate() {
        let preimage = conjugator_inverse.right_apply(point);
        if level < chain.len() && chain[level].base_point() == preimage {
            continue;
        }
        if level < chain.len() && chain[level].orbit_contains(preimage) {
            let transversal = chain[level].transversal(preimage)?;
            transversal.left_apply_to_with_scratch(&mut conjugator, &mut scratch);
            conjugator_inverse = conjugator.inverse().get();
            first_conjugated.get_or_insert(level);
            continue;
        }
        move_point_to_level(chain, preimage, level)?;
    }

    if let Some(first) = first_conjugated {
        for element in chain[first..].iter_mut() {
            let base_point = conjugator.right_apply(element.base_point());
            let generators = element
                .stabilizer_generators()
                .iter()
                .map(|generator| generator.conjugate(&conjugator))
                .collect::<Result<_>>()?;
            *element = BsgsCandidateElement::new(base_point, generators, degree)?;
        }
    }

    remove_redundant_levels(chain, new_base.len());
    tracing::debug!(base = ?new_base, "rebased with conjugation");
    Ok(())
}

/// Rebuild the chain for the requested base from the top level generators.
///
/// The group order is already known, so the randomized Schreier-Sims run stops exactly when the
/// new chain is complete.
pub fn rebase_from_scratch<R: Rng + ?Sized>(
    chain: &mut Vec<BsgsCandidateElement>,
    new_base: &[El],
    rng: &mut R,
) -> Result<()> {
    let degree = check_rebase_input(chain, new_base)?;
    let known_order = order(chain);

    let mut base = new_base.to_vec();
    for element in chain.iter() {
        if !base.contains(&element.base_point()) {
            base.push(element.base_point());
        }
    }
    let mut fresh = create_raw_bsgs_candidate(&base, chain[0].stabilizer_generators(), degree)?;
    random_schreier_sims_with_order(&mut fresh, &known_order, rng)?;
    remove_redundant_levels(&mut fresh, new_base.len());
    *chain = fresh;
    tracing::debug!(base = ?new_base, "rebased from scratch");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use num_bigint::BigUint;
    use rand::{rngs::SmallRng, SeedableRng};

    use crate::bsgs::{base_of, is_bsgs, is_member, thaw};
    use crate::schreier_sims::schreier_sims;

    fn perm(images: &[El]) -> Perm {
        Perm::from_vec(images.to_vec()).unwrap()
    }

    fn complete(generators: &[Perm], degree: usize) -> Vec<BsgsCandidateElement> {
        let mut chain = create_raw_bsgs_candidate(&[], generators, degree).unwrap();
        schreier_sims(&mut chain).unwrap();
        chain
    }

    fn dihedral8() -> Vec<Perm> {
        vec![
            perm(&[1, 2, 3, 4, 5, 6, 7, 0]),
            perm(&[0, 7, 6, 5, 4, 3, 2, 1]),
        ]
    }

    fn mixed() -> Vec<Perm> {
        // S3 x C4 on disjoint points
        vec![
            perm(&[1, 0, 2, 3, 4, 5, 6]),
            perm(&[1, 2, 0, 3, 4, 5, 6]),
            perm(&[0, 1, 2, 4, 5, 6, 3]),
        ]
    }

    fn check_rebased(
        chain: &[BsgsCandidateElement],
        new_base: &[El],
        expected: &BigUint,
        generators: &[Perm],
    ) {
        assert_eq!(&base_of(chain)[..new_base.len()], new_base);
        assert_eq!(&order(chain), expected);
        assert!(is_bsgs(chain).unwrap());
        for generator in generators {
            assert!(is_member(chain, generator).unwrap());
        }
        for element in chain[new_base.len()..].iter() {
            assert!(element.orbit_size() > 1);
        }
    }

    #[test]
    fn swap_keeps_order() {
        let generators = [perm(&[1, 2, 3, 4, 0]), perm(&[1, 0, 2, 3, 4])];
        let mut chain = complete(&generators, 5);
        let before = base_of(&chain);
        swap_adjacent_base_points(&mut chain, 1).unwrap();
        let after = base_of(&chain);
        assert_eq!(after[1], before[2]);
        assert_eq!(after[2], before[1]);
        assert_eq!(order(&chain), BigUint::from(120u32));
        assert!(is_bsgs(&chain).unwrap());
        assert_eq!(
            swap_adjacent_base_points(&mut chain, 10),
            Err(GroupError::LevelOutOfRange {
                level: 10,
                length: chain.len()
            })
        );
    }

    #[test]
    fn all_strategies_agree() {
        let mut rng = SmallRng::seed_from_u64(17);
        for (generators, degree) in [(dihedral8(), 8), (mixed(), 7)] {
            let reference = complete(&generators, degree);
            let expected = order(&reference);
            for new_base in [vec![3, 5], vec![6, 2, 0], vec![4]] {
                for strategy in [
                    RebaseStrategy::Transpositions,
                    RebaseStrategy::Conjugation,
                    RebaseStrategy::FromScratch,
                ] {
                    let mut chain = reference.clone();
                    rebase(&mut chain, &new_base, strategy, &mut rng).unwrap();
                    check_rebased(&chain, &new_base, &expected, &generators);
                }
            }
        }
    }

    #[test]
    fn rebase_across_direct_factors() {
        let generators = mixed();
        let mut chain = complete(&generators, 7);
        // 3 lies outside the first level's orbit, so a level has to be inserted
        rebase_with_conjugation(&mut chain, &[3, 0, 1]).unwrap();
        check_rebased(&chain, &[3, 0, 1], &BigUint::from(24u32), &generators);
    }

    #[test]
    fn rebase_rejects_bad_points() {
        let mut chain = complete(&dihedral8(), 8);
        assert_eq!(
            rebase_with_transpositions(&mut chain, &[9]),
            Err(GroupError::PointOutOfRange {
                point: 9,
                degree: 8
            })
        );
        assert_eq!(
            rebase_with_conjugation(&mut chain, &[1, 1]),
            Err(GroupError::DuplicatePoint(1))
        );
    }

    #[test]
    fn rebase_frozen_symmetric_chain() {
        let frozen = crate::bsgs::symmetric_bsgs(6).unwrap();
        let mut chain = thaw(&frozen);
        rebase_with_conjugation(&mut chain, &[5, 4, 3]).unwrap();
        assert_eq!(&base_of(&chain)[..3], &[5, 4, 3]);
        assert_eq!(order(&chain), BigUint::from(720u32));
        assert!(is_bsgs(&chain).unwrap());
    }
}
