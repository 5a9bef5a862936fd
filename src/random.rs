//! Random group elements by product replacement.
use rand::Rng;

use crate::action::{LeftAction, RightAction};
use crate::assign::AssignValue;
use crate::error::{check_degree, Result};
use crate::perm::Perm;
use crate::El;

/// Minimum number of slots, independent of the number of generators.
const MIN_SLOTS: usize = 10;
/// Steps performed before the first element is handed out.
const WARM_UP: usize = 50;

/// Source of (nearly) uniformly distributed random elements of a group.
///
/// The state is a list of slots filled with copies of the generators. Each step multiplies one
/// slot by another one (or its inverse) on a random side and folds the result into an
/// accumulator, which is the element returned. The group generated by the slots never changes.
#[derive(Clone, Debug)]
pub struct ProductReplacement {
    slots: Vec<Perm>,
    accumulator: Perm,
    scratch: Vec<El>,
}

impl ProductReplacement {
    /// Initialize from generators of the group.
    ///
    /// An empty generator list yields the trivial group on `degree` points. Fails when a
    /// generator has a different degree.
    pub fn new<R: Rng + ?Sized>(generators: &[Perm], degree: usize, rng: &mut R) -> Result<Self> {
        for generator in generators {
            check_degree(degree, generator.degree())?;
        }
        let slot_count = MIN_SLOTS.max(generators.len());
        let slots = if generators.is_empty() {
            vec![Perm::identity(degree); slot_count]
        } else {
            generators.iter().cycle().take(slot_count).cloned().collect()
        };

        let mut source = ProductReplacement {
            slots,
            accumulator: Perm::identity(degree),
            scratch: vec![],
        };
        for _ in 0..WARM_UP {
            source.step(rng);
        }
        Ok(source)
    }

    fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let len = self.slots.len();
        let s = rng.gen_range(0..len);
        let t = (s + rng.gen_range(1..len)) % len;

        let factor = if rng.gen::<bool>() {
            self.slots[t].inverse().get()
        } else {
            self.slots[t].clone()
        };
        if rng.gen::<bool>() {
            factor.right_apply_to(&mut self.slots[s]);
        } else {
            factor.left_apply_to_with_scratch(&mut self.slots[s], &mut self.scratch);
        }
        self.slots[s].right_apply_to(&mut self.accumulator);
    }

    /// Produce the next random element.
    pub fn next_element<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Perm {
        self.step(rng);
        self.accumulator.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{rngs::SmallRng, SeedableRng};

    use crate::bsgs::{is_member, symmetric_bsgs};
    use crate::error::GroupError;

    #[test]
    fn elements_stay_in_group() {
        let mut rng = SmallRng::seed_from_u64(7);
        // even permutations only
        let generators = [
            Perm::from_vec(vec![1, 2, 0, 3, 4]).unwrap(),
            Perm::from_vec(vec![0, 1, 3, 4, 2]).unwrap(),
        ];
        let mut source = ProductReplacement::new(&generators, 5, &mut rng).unwrap();
        for _ in 0..100 {
            assert!(!source.next_element(&mut rng).is_odd());
        }
    }

    #[test]
    fn elements_cover_small_group() {
        let mut rng = SmallRng::seed_from_u64(11);
        let generators = [
            Perm::from_vec(vec![1, 0, 2]).unwrap(),
            Perm::from_vec(vec![1, 2, 0]).unwrap(),
        ];
        let chain = symmetric_bsgs(3).unwrap();
        let mut source = ProductReplacement::new(&generators, 3, &mut rng).unwrap();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let element = source.next_element(&mut rng);
            assert!(is_member(&chain, &element).unwrap());
            seen.insert(element);
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn trivial_source() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut source = ProductReplacement::new(&[], 4, &mut rng).unwrap();
        assert!(source.next_element(&mut rng).is_identity());
    }

    #[test]
    fn mismatched_generators_are_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let generators = [Perm::from_vec(vec![1, 0, 2]).unwrap()];
        assert_eq!(
            ProductReplacement::new(&generators, 4, &mut rng).unwrap_err(),
            GroupError::DegreeMismatch {
                expected: 4,
                found: 3
            }
        );
    }
}
