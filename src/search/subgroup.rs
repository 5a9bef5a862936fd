//! Searches for subgroups and coset representatives.
//!
//! All functions take complete chains. Chains of other groups are first rebased so they share
//! the base of the group being searched; their levels then line up with the search tree.
use std::sync::Arc;

use crate::action::RightAction;
use crate::bsgs::{base_of, freeze, is_member, thaw, BsgsCandidateElement, BsgsElement};
use crate::error::{check_degree, check_points, GroupError, Result};
use crate::ordering::InducedOrdering;
use crate::perm::Perm;
use crate::rebase::{rebase_with_conjugation, remove_redundant_levels};
use crate::search::{
    subgroup_search, subgroup_search_with_payload, AcceptAll, BacktrackSearch, SearchPayload,
    TestFn,
};
use crate::El;

fn degree_of(chain: &[BsgsElement]) -> Result<usize> {
    Ok(chain.first().ok_or(GroupError::EmptyBsgs)?.degree())
}

/// Copy of `chain` rebased to start with `base`.
fn rebased(chain: &[BsgsElement], base: &[El]) -> Result<Vec<BsgsCandidateElement>> {
    let mut chain = thaw(chain);
    rebase_with_conjugation(&mut chain, base)?;
    Ok(chain)
}

fn check_subgroup(group: &[BsgsElement], subgroup: &[BsgsElement]) -> Result<()> {
    check_degree(degree_of(group)?, degree_of(subgroup)?)?;
    for generator in subgroup[0].stabilizer_generators() {
        if !is_member(group, generator)? {
            return Err(GroupError::NotASubgroup);
        }
    }
    Ok(())
}

/// Least element of the coset `H g = { h.compose(g) : h ∈ H }`.
///
/// `subgroup` must start with the base inducing `ordering`. Level by level the orbit point whose
/// image under the current representative is least is moved onto the base point.
fn least_in_coset(
    subgroup: &[BsgsCandidateElement],
    ordering: &InducedOrdering,
    element: &Perm,
) -> Result<Perm> {
    let mut representative = element.clone();
    for level in subgroup {
        let least = level
            .orbit()
            .iter()
            .copied()
            .min_by_key(|&point| ordering.rank(representative.image(point)))
            .unwrap_or_else(|| level.base_point());
        if least != level.base_point() {
            let mut transversal = level.transversal(least)?;
            representative.right_apply_to(&mut transversal);
            representative = transversal;
        }
    }
    Ok(representative)
}

/// The least element of every coset `H g` of `subgroup` in `group`.
///
/// Representatives are listed in ascending order; there are `|group| / |subgroup|` of them.
pub fn left_coset_representatives(
    group: &Arc<[BsgsElement]>,
    subgroup: &[BsgsElement],
) -> Result<Vec<Perm>> {
    check_subgroup(group, subgroup)?;
    let base = base_of(group);
    let ordering = InducedOrdering::new(&base, degree_of(group)?)?;
    let subgroup = rebased(subgroup, &base)?;
    let bounds: Vec<usize> = subgroup.iter().map(|level| level.orbit_size()).collect();

    let search = BacktrackSearch::new(group.clone(), AcceptAll, |word: &Perm| {
        least_in_coset(&subgroup, &ordering, word).map_or(false, |least| &least == word)
    })?
    .with_orbit_bounds(&bounds);
    search.collect()
}

/// The representative of the coset of `subgroup` containing `element`, as listed by
/// [`left_coset_representatives`].
pub fn left_transversal_of(
    group: &[BsgsElement],
    subgroup: &[BsgsElement],
    element: &Perm,
) -> Result<Perm> {
    check_subgroup(group, subgroup)?;
    check_degree(degree_of(group)?, element.degree())?;
    if !is_member(group, element)? {
        return Err(GroupError::NotAMember);
    }
    let base = base_of(group);
    let ordering = InducedOrdering::new(&base, element.degree())?;
    least_in_coset(&rebased(subgroup, &base)?, &ordering, element)
}

/// Follows the search with the matching partial words of a second group.
///
/// The partial word of the second group maps the same base points to the same images, as long as
/// the images stay inside the second group's orbits.
struct IntersectionPayload<'a> {
    other: &'a [BsgsCandidateElement],
    base: Vec<El>,
    words: Vec<Perm>,
    valid: Vec<bool>,
}

impl<'a> SearchPayload for IntersectionPayload<'a> {
    fn after_level_increment(&mut self, level: usize, word: &Perm) -> Result<()> {
        let image = word.image(self.base[level]);
        let (before, rest) = self.words.split_at_mut(level);
        let previous = before.last();
        let preimage = previous.map_or(image, |previous| previous.inverse_image(image));
        let element = &self.other[level];

        self.valid[level] = element.orbit_contains(preimage);
        if self.valid[level] {
            rest[0] = element.transversal(preimage)?;
            if let Some(previous) = previous {
                previous.right_apply_to(&mut rest[0]);
            }
        }
        Ok(())
    }

    fn test(&mut self, _word: &Perm, level: usize) -> bool {
        self.valid[level]
    }
}

/// Chain of the intersection of two groups, searching the elements of `group`.
///
/// Searching the smaller group is faster.
pub fn intersection(group: &[BsgsElement], other: &[BsgsElement]) -> Result<Vec<BsgsElement>> {
    let degree = degree_of(group)?;
    check_degree(degree, degree_of(other)?)?;
    let base = base_of(group);
    let other = rebased(other, &base)?;

    let mut known: Vec<Perm> = vec![];
    for generator in group[0].stabilizer_generators() {
        if is_member(&other, generator)? {
            known.push(generator.clone());
        }
    }
    let mut payload = IntersectionPayload {
        other: &other,
        words: vec![Perm::identity(degree); base.len()],
        valid: vec![false; base.len()],
        base,
    };
    subgroup_search_with_payload(group, &known, &mut payload, |word: &Perm| {
        is_member(&other, word).unwrap_or(false)
    })
}

/// Chain of the elements of `group` commuting with every permutation in `elements`.
///
/// A partial word `w` is pruned when some `h` maps a base point `β_j` to a base point `β_m`,
/// both within the levels fixed so far, but `(β_j^w)^h` differs from `β_m^w`.
pub fn centralizer(group: &[BsgsElement], elements: &[Perm]) -> Result<Vec<BsgsElement>> {
    let degree = degree_of(group)?;
    for element in elements {
        check_degree(degree, element.degree())?;
    }
    let base = base_of(group);
    let mut base_level = vec![None; degree];
    for (level, &point) in base.iter().enumerate() {
        base_level[point as usize] = Some(level);
    }
    let commutes = |word: &Perm| {
        elements
            .iter()
            .all(|element| word.commutes_with(element).unwrap_or(false))
    };

    let known: Vec<Perm> = group[0]
        .stabilizer_generators()
        .iter()
        .filter(|generator| commutes(*generator))
        .cloned()
        .collect();
    let test = |word: &Perm, level: usize| {
        base[..=level].iter().all(|&point| {
            elements.iter().all(|element| {
                match base_level[element.image(point) as usize] {
                    Some(target) if target <= level => {
                        element.image(word.image(point)) == word.image(base[target])
                    }
                    _ => true,
                }
            })
        })
    };
    subgroup_search(group, &known, test, commutes)
}

/// Chain of the elements of `group` mapping `set` onto itself.
///
/// The group is rebased so the set comes first. An element of the stabilizer maps the first
/// `|set|` base points into the set and all later ones outside of it.
pub fn setwise_stabilizer(group: &[BsgsElement], set: &[El]) -> Result<Vec<BsgsElement>> {
    let degree = degree_of(group)?;
    check_points(set, degree)?;
    let chain = freeze(rebased(group, set)?);
    let base = base_of(&chain);
    let mut in_set = vec![false; degree];
    for &point in set {
        in_set[point as usize] = true;
    }
    let stabilizes =
        |word: &Perm| set.iter().all(|&point| in_set[word.image(point) as usize]);

    let known: Vec<Perm> = chain[0]
        .stabilizer_generators()
        .iter()
        .filter(|generator| stabilizes(*generator))
        .cloned()
        .collect();
    let test = |word: &Perm, level: usize| {
        in_set[word.image(base[level]) as usize] == (level < set.len())
    };
    subgroup_search(&chain, &known, test, stabilizes)
}

/// Chain of the elements of `group` fixing every point of `points`.
///
/// After rebasing, these are the levels below the given points; no search is needed.
pub fn pointwise_stabilizer(group: &[BsgsElement], points: &[El]) -> Result<Vec<BsgsElement>> {
    let degree = degree_of(group)?;
    check_points(points, degree)?;
    let mut chain = rebased(group, points)?;
    let mut stabilizer = chain.split_off(points.len().min(chain.len()));
    if stabilizer.is_empty() {
        stabilizer.push(BsgsCandidateElement::new(0, vec![], degree)?);
    }
    remove_redundant_levels(&mut stabilizer, 0);
    Ok(freeze(stabilizer))
}

/// All elements of `group` mapping `from[i]` to `to[i]` for every `i`, produced lazily.
pub fn mappings(
    group: &[BsgsElement],
    from: &[El],
    to: &[El],
) -> Result<impl Iterator<Item = Result<Perm>>> {
    if from.len() != to.len() {
        return Err(GroupError::LengthMismatch {
            from: from.len(),
            to: to.len(),
        });
    }
    let degree = degree_of(group)?;
    check_points(from, degree)?;
    if let Some(&point) = to.iter().find(|&&point| point as usize >= degree) {
        return Err(GroupError::PointOutOfRange { point, degree });
    }

    let chain: Arc<[BsgsElement]> = freeze(rebased(group, from)?).into();
    let from = from.to_vec();
    let to = to.to_vec();
    let test = move |word: &Perm, level: usize| {
        level >= from.len() || word.image(from[level]) == to[level]
    };
    BacktrackSearch::new(chain, TestFn(test), |_: &Perm| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cmp::Ordering;
    use std::collections::HashSet;

    use num_bigint::BigUint;
    use proptest::prelude::*;

    use crate::bsgs::{alternating_bsgs, create_raw_bsgs_candidate, order, symmetric_bsgs};
    use crate::schreier_sims::schreier_sims;

    fn perm(images: &[El]) -> Perm {
        Perm::from_vec(images.to_vec()).unwrap()
    }

    fn complete(generators: &[Perm], degree: usize) -> Arc<[BsgsElement]> {
        let mut chain = create_raw_bsgs_candidate(&[], generators, degree).unwrap();
        schreier_sims(&mut chain).unwrap();
        freeze(chain).into()
    }

    fn elements(chain: &Arc<[BsgsElement]>) -> Vec<Perm> {
        BacktrackSearch::new(chain.clone(), AcceptAll, |_: &Perm| true)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap()
    }

    fn closure(generators: &[Perm], degree: usize) -> HashSet<Perm> {
        let mut elements = vec![Perm::identity(degree)];
        let mut seen: HashSet<Perm> = elements.iter().cloned().collect();
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
        seen
    }

    fn random_perm(degree: usize) -> impl Strategy<Value = Perm> {
        Just((0..degree as El).collect::<Vec<_>>())
            .prop_shuffle()
            .prop_map(|images| perm(&images))
    }

    fn generator_pair() -> impl Strategy<Value = (usize, Vec<Perm>, Vec<Perm>)> {
        (3..=6usize).prop_flat_map(|degree| {
            (
                Just(degree),
                prop::collection::vec(random_perm(degree), 1..3),
                prop::collection::vec(random_perm(degree), 1..3),
            )
        })
    }

    fn dihedral4() -> Arc<[BsgsElement]> {
        complete(&[perm(&[1, 2, 3, 0]), perm(&[2, 1, 0, 3])], 4)
    }

    #[test]
    fn coset_representatives_partition_group() {
        let group = symmetric_bsgs(4).unwrap();
        let subgroup = dihedral4();
        let representatives = left_coset_representatives(&group, &subgroup).unwrap();
        assert_eq!(representatives.len(), 3);

        let base = base_of(&group);
        let ordering = InducedOrdering::new(&base, 4).unwrap();
        let images = |perm: &Perm| -> Vec<El> {
            let mut images = base.clone();
            perm.right_apply_to(&mut images[..]);
            images
        };
        let subgroup_elements = elements(&subgroup);

        for element in elements(&group) {
            let representative = left_transversal_of(&group, &subgroup, &element).unwrap();
            assert!(representatives.contains(&representative));
            let least = subgroup_elements
                .iter()
                .map(|h| h.compose(&element).unwrap())
                .min_by(|a, b| ordering.compare_sequences(&images(a), &images(b)))
                .unwrap();
            assert_eq!(representative, least);
        }
        for pair in representatives.windows(2) {
            assert_eq!(
                ordering.compare_sequences(&images(&pair[0]), &images(&pair[1])),
                Ordering::Less
            );
        }
    }

    #[test]
    fn cosets_of_alternating_group() {
        let group = symmetric_bsgs(5).unwrap();
        let subgroup = alternating_bsgs(5).unwrap();
        let representatives = left_coset_representatives(&group, &subgroup).unwrap();
        assert_eq!(representatives.len(), 2);
        assert!(representatives[0].is_identity());
        assert!(representatives[1].is_odd());
    }

    #[test]
    fn coset_input_checks() {
        let group = dihedral4();
        let not_contained = symmetric_bsgs(4).unwrap();
        assert_eq!(
            left_coset_representatives(&group, &not_contained),
            Err(GroupError::NotASubgroup)
        );
        let subgroup = complete(&[perm(&[2, 3, 0, 1])], 4);
        assert_eq!(
            left_transversal_of(&group, &subgroup, &perm(&[1, 0, 2, 3])),
            Err(GroupError::NotAMember)
        );
    }

    #[test]
    fn intersection_matches_membership() {
        let dihedral = complete(&[perm(&[1, 2, 3, 4, 5, 0]), perm(&[0, 5, 4, 3, 2, 1])], 6);
        let product = complete(
            &[
                perm(&[1, 2, 0, 3, 4, 5]),
                perm(&[1, 0, 2, 3, 4, 5]),
                perm(&[0, 1, 2, 4, 5, 3]),
                perm(&[0, 1, 2, 4, 3, 5]),
            ],
            6,
        );
        let both = intersection(&dihedral, &product).unwrap();
        let swapped = intersection(&product, &dihedral).unwrap();
        assert_eq!(order(&both), order(&swapped));

        let mut count = 0u32;
        for element in elements(&symmetric_bsgs(6).unwrap()) {
            let expected = is_member(&dihedral, &element).unwrap()
                && is_member(&product, &element).unwrap();
            assert_eq!(is_member(&both, &element).unwrap(), expected);
            assert_eq!(is_member(&swapped, &element).unwrap(), expected);
            count += expected as u32;
        }
        assert_eq!(order(&both), BigUint::from(count));
    }

    #[test]
    fn centralizer_of_involution() {
        let group = symmetric_bsgs(4).unwrap();
        let involution = perm(&[1, 0, 3, 2]);
        let found = centralizer(&group, &[involution.clone()]).unwrap();
        assert_eq!(order(&found), BigUint::from(8u32));
        for level in found.iter() {
            for generator in level.stabilizer_generators() {
                assert!(generator.commutes_with(&involution).unwrap());
            }
        }
    }

    #[test]
    fn centralizer_of_cycle_is_cyclic() {
        let group = symmetric_bsgs(5).unwrap();
        let cycle = perm(&[1, 2, 3, 4, 0]);
        let found = centralizer(&group, &[cycle.clone()]).unwrap();
        assert_eq!(order(&found), BigUint::from(5u32));
        assert!(is_member(&found, &cycle).unwrap());
    }

    #[test]
    fn center_of_dihedral_group() {
        let group = dihedral4();
        let generators = group[0].stabilizer_generators().to_vec();
        let center = centralizer(&group, &generators).unwrap();
        assert_eq!(order(&center), BigUint::from(2u32));
        assert!(is_member(&center, &perm(&[2, 3, 0, 1])).unwrap());
    }

    #[test]
    fn setwise_stabilizers() {
        let group = symmetric_bsgs(5).unwrap();
        let found = setwise_stabilizer(&group, &[1, 3]).unwrap();
        assert_eq!(order(&found), BigUint::from(12u32));
        assert!(is_member(&found, &perm(&[0, 3, 2, 1, 4])).unwrap());
        assert!(!is_member(&found, &perm(&[1, 0, 2, 3, 4])).unwrap());

        let dihedral = dihedral4();
        let found = setwise_stabilizer(&dihedral, &[0, 2]).unwrap();
        assert_eq!(order(&found), BigUint::from(4u32));
        let found = setwise_stabilizer(&dihedral, &[0, 1]).unwrap();
        assert_eq!(order(&found), BigUint::from(2u32));
    }

    #[test]
    fn pointwise_stabilizers() {
        let group = complete(&[perm(&[1, 2, 3, 4, 0]), perm(&[1, 0, 2, 3, 4])], 5);
        assert_eq!(
            order(&pointwise_stabilizer(&group, &[0]).unwrap()),
            BigUint::from(24u32)
        );
        assert_eq!(
            order(&pointwise_stabilizer(&group, &[4, 2]).unwrap()),
            BigUint::from(6u32)
        );
        let trivial = pointwise_stabilizer(&group, &[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(trivial.len(), 1);
        assert_eq!(order(&trivial), BigUint::from(1u32));
    }

    #[test]
    fn mappings_between_points() {
        let group = symmetric_bsgs(4).unwrap();
        let found: Vec<Perm> = mappings(&group, &[0, 1], &[2, 3])
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(found.len(), 2);
        for element in found {
            assert_eq!(element.image(0), 2);
            assert_eq!(element.image(1), 3);
        }
        assert_eq!(mappings(&group, &[0, 1], &[2, 2]).unwrap().count(), 0);

        let alternating = alternating_bsgs(4).unwrap();
        assert_eq!(mappings(&alternating, &[0], &[1]).unwrap().count(), 3);
        assert_eq!(
            mappings(&alternating, &[0, 1], &[1]).err(),
            Some(GroupError::LengthMismatch { from: 2, to: 1 })
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn intersection_of_random_groups(
            (degree, generators_a, generators_b) in generator_pair()
        ) {
            let group_a = complete(&generators_a, degree);
            let group_b = complete(&generators_b, degree);
            let expected: HashSet<Perm> = closure(&generators_a, degree)
                .intersection(&closure(&generators_b, degree))
                .cloned()
                .collect();

            for (first, second) in [(&group_a, &group_b), (&group_b, &group_a)] {
                let found: Arc<[BsgsElement]> = intersection(first, second).unwrap().into();
                prop_assert_eq!(order(&found), BigUint::from(expected.len()));
                let members: HashSet<Perm> = elements(&found).into_iter().collect();
                prop_assert_eq!(&members, &expected);
            }
        }
    }
}
