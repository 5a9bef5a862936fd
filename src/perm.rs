//! Permutations of finite sets.
use std::fmt;
use std::mem::replace;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive};

use crate::action::{LeftAction, RightAction};
use crate::assign::{Assign, AssignFn, AssignValue};
use crate::error::{check_degree, GroupError, Result};
use crate::El;

/// A permutation of a finite set, optionally carrying an antisymmetry flag.
///
/// A permutation rearranges the elements of {0, ..., n-1}, where n is the permutation's degree.
/// Points at or above the degree are treated as fixed points, so applying a permutation to any
/// [`El`] is well defined.
///
/// The antisymmetry flag marks a symmetry that flips the sign of the object it acts on (think
/// of swapping two indices of an antisymmetric tensor). Flags compose like signs: a product is
/// antisymmetric iff exactly one factor is. An antisymmetric permutation whose order is odd would
/// make the identity antisymmetric, such permutations are rejected by [`Perm::antisymmetric`].
///
/// Products use right actions: `g.compose(&h)` first applies `g`, then `h`.
#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Perm {
    images: Box<[El]>,
    antisymmetry: bool,
}

impl Perm {
    /// The identity permutation of a given degree.
    pub fn identity(degree: usize) -> Perm {
        Perm {
            images: (0..degree as El).collect(),
            antisymmetry: false,
        }
    }

    /// Create a permutation from a vector containing the images of 0..n.
    ///
    /// Returns None if the vector does not correspond to a permutation.
    pub fn from_vec(images: Vec<El>) -> Option<Perm> {
        Self::from_vec_with_scratch(images, &mut vec![])
    }

    /// Create a permutation from a vector containing the images of 0..n.
    ///
    /// Returns None if the vector does not correspond to a permutation.
    /// The last parameter is used as scratch space and will be overwritten.
    pub fn from_vec_with_scratch(images: Vec<El>, scratch: &mut Vec<bool>) -> Option<Perm> {
        // Having the degree be a valid El itself keeps `identity` and the sentinels of the
        // induced ordering representable
        assert!(images.len() < El::max_value() as usize - 1);
        let seen = scratch;
        seen.clear();
        seen.resize(images.len(), false);

        for &image in images.iter() {
            let image = image as usize;
            if image >= images.len() || seen[image] {
                return None;
            }
            seen[image] = true;
        }

        Some(Perm {
            images: images.into_boxed_slice(),
            antisymmetry: false,
        })
    }

    /// Create an antisymmetric permutation from the images of 0..n.
    ///
    /// Fails when the images don't form a permutation or when the permutation has odd order.
    pub fn antisymmetric(images: Vec<El>) -> Result<Perm> {
        Perm::from_vec(images)
            .ok_or(GroupError::NotAPermutation)?
            .with_antisymmetry(true)
    }

    /// Create a permutation of the given degree from a list of disjoint cycles.
    ///
    /// Returns None if a point is out of range or occurs in more than one cycle.
    pub fn from_cycles(degree: usize, cycles: &[&[El]]) -> Option<Perm> {
        let mut images: Vec<El> = (0..degree as El).collect();
        let mut seen = vec![false; degree];
        for cycle in cycles {
            for (i, &el) in cycle.iter().enumerate() {
                if el as usize >= degree || replace(&mut seen[el as usize], true) {
                    return None;
                }
                images[el as usize] = cycle[(i + 1) % cycle.len()];
            }
        }
        Some(Perm {
            images: images.into_boxed_slice(),
            antisymmetry: false,
        })
    }

    /// Set the antisymmetry flag.
    ///
    /// Fails with [`GroupError::InconsistentGenerators`] if the flag is set on a permutation of odd
    /// order.
    pub fn with_antisymmetry(mut self, antisymmetry: bool) -> Result<Perm> {
        if antisymmetry && self.order().is_odd() {
            return Err(GroupError::InconsistentGenerators);
        }
        self.antisymmetry = antisymmetry;
        Ok(self)
    }

    /// Number of points this permutation acts on.
    pub fn degree(&self) -> usize {
        self.images.len()
    }

    pub fn is_antisymmetric(&self) -> bool {
        self.antisymmetry
    }

    /// The images of 0..n.
    pub fn images(&self) -> &[El] {
        &self.images
    }

    /// Image of a point.
    pub fn image(&self, el: El) -> El {
        self.images.get(el as usize).cloned().unwrap_or(el)
    }

    /// Preimage of a point.
    ///
    /// This is a linear scan, prefer keeping the inverse around when doing this repeatedly.
    pub fn inverse_image(&self, el: El) -> El {
        self.images
            .iter()
            .position(|&image| image == el)
            .map_or(el, |pos| pos as El)
    }

    /// Whether the permutation fixes every point. The antisymmetry flag is ignored.
    pub fn is_identity(&self) -> bool {
        self.images
            .iter()
            .enumerate()
            .all(|(i, &image)| i as El == image)
    }

    pub fn moves(&self, el: El) -> bool {
        self.image(el) != el
    }

    /// The smallest point not fixed by this permutation.
    pub fn first_moved_point(&self) -> Option<El> {
        (0..self.degree() as El).find(|&el| self.moves(el))
    }

    /// The inverse of this permutation.
    pub fn inverse<'a>(&'a self) -> impl AssignValue<Perm, Scratch = ()> + 'a {
        AssignFn(move |target: &mut Perm| {
            if target.images.len() != self.images.len() {
                target.images = vec![0; self.images.len()].into_boxed_slice();
            }
            for (i, &image) in self.images.iter().enumerate() {
                target.images[image as usize] = i as El;
            }
            target.antisymmetry = self.antisymmetry;
        })
    }

    /// The square of this permutation.
    pub fn square<'a>(&'a self) -> impl AssignValue<Perm, Scratch = ()> + 'a {
        AssignFn(move |target: &mut Perm| {
            target.clone_from(self);
            self.right_apply_to(target);
        })
    }

    /// A power of this permutation.
    ///
    /// This implementation performs efficient exponentiation by squaring.
    pub fn pow<E>(&self, exponent: E) -> Power<'_, E> {
        Power {
            base: self,
            exponent,
        }
    }

    /// The product `self * other`, applying `self` first.
    ///
    /// Fails with [`GroupError::DegreeMismatch`] when the degrees differ.
    pub fn compose(&self, other: &Perm) -> Result<Perm> {
        check_degree(self.degree(), other.degree())?;
        Ok(other.right_apply(self.clone()))
    }

    /// The conjugate `by^-1 * self * by`.
    ///
    /// Conjugating moves the cycle structure along `by`: if `self` sends `i` to `j`, the conjugate
    /// sends `i^by` to `j^by`.
    pub fn conjugate(&self, by: &Perm) -> Result<Perm> {
        check_degree(self.degree(), by.degree())?;
        let mut result = by.inverse().get();
        self.right_apply_to(&mut result);
        by.right_apply_to(&mut result);
        Ok(result)
    }

    /// The commutator `self^-1 * other^-1 * self * other`.
    pub fn commutator(&self, other: &Perm) -> Result<Perm> {
        check_degree(self.degree(), other.degree())?;
        let mut result = self.inverse().get();
        let other_inverse = other.inverse().get();
        other_inverse.right_apply_to(&mut result);
        self.right_apply_to(&mut result);
        other.right_apply_to(&mut result);
        Ok(result)
    }

    pub fn commutes_with(&self, other: &Perm) -> Result<bool> {
        Ok(self.compose(other)? == other.compose(self)?)
    }

    /// The order of this permutation, the least common multiple of its cycle lengths.
    ///
    /// The antisymmetry flag does not affect the order; consistent permutations have even order
    /// whenever they are antisymmetric.
    pub fn order(&self) -> BigUint {
        self.cycles().fold(BigUint::one(), |order, cycle| {
            order.lcm(&BigUint::from(cycle.count()))
        })
    }

    /// Whether this is an odd permutation, i.e. a product of an odd number of transpositions.
    pub fn is_odd(&self) -> bool {
        self.cycles().map(|cycle| cycle.count() - 1).sum::<usize>() % 2 == 1
    }

    /// Return the cycle starting at an element.
    ///
    /// Returns a 1-cycle when the element is not in the support of this permutation.
    pub fn cycle_at(&self, el: El) -> Cycle<'_> {
        Cycle {
            perm: self,
            pos: Some(el),
            start: el,
        }
    }

    /// Returns an iterator over all proper cycles of a permutation.
    ///
    /// The returned iterator does not produce any 1-cycles.
    pub fn cycles(&self) -> Cycles<'_> {
        self.cycles_with_scratch(Default::default())
    }

    /// Return an iterator over all proper cycles of a permutation. Use existing scratch space.
    ///
    /// The ownership of the scratch space is passed to the returned iterator and can be recovered
    /// by [`Cycles::into_scratch`].
    pub fn cycles_with_scratch(&self, mut scratch: Vec<bool>) -> Cycles<'_> {
        scratch.clear();
        scratch.resize(self.images.len(), false);
        Cycles {
            perm: self,
            seen: scratch,
            pos: 0,
        }
    }

    /// Emit this permutation to a [`Formatter`][fmt::Formatter]. Use existing scratch space.
    ///
    /// Antisymmetric permutations are prefixed with a minus sign.
    pub fn format_with_scratch(
        &self,
        f: &mut fmt::Formatter,
        scratch: &mut Vec<bool>,
    ) -> fmt::Result {
        if self.antisymmetry {
            f.write_str("-")?;
        }

        let mut cycles = self.cycles_with_scratch(replace(scratch, Default::default()));

        let mut empty = true;

        for cycle in cycles.by_ref() {
            empty = false;
            fmt::Display::fmt(&cycle, f)?;
        }

        *scratch = cycles.into_scratch();

        if empty {
            f.write_str("()")?;
        }

        Ok(())
    }
}

impl Clone for Perm {
    fn clone(&self) -> Perm {
        Perm {
            images: self.images.clone(),
            antisymmetry: self.antisymmetry,
        }
    }

    fn clone_from(&mut self, other: &Perm) {
        if self.images.len() == other.images.len() {
            self.images.copy_from_slice(&other.images);
        } else {
            self.images = other.images.clone();
        }
        self.antisymmetry = other.antisymmetry;
    }
}

impl From<Perm> for Vec<El> {
    fn from(perm: Perm) -> Vec<El> {
        perm.images.into_vec()
    }
}

/// Image of a point.
impl RightAction<El> for Perm {
    type Scratch = ();

    fn right_apply_to_with_scratch(&self, el: &mut El, _: &mut ()) {
        *el = self.image(*el);
    }
}

/// Multiplication by a permutation on the right.
///
/// Unlike multiplication on the left, this requires no scratch space. Panics when the degrees
/// differ, use [`Perm::compose`] for a checked product.
impl RightAction<Perm> for Perm {
    type Scratch = ();

    fn right_apply_to_with_scratch(&self, perm: &mut Perm, _: &mut ()) {
        assert_eq!(perm.degree(), self.degree(), "degree mismatch");
        for el in perm.images.iter_mut() {
            *el = self.images[*el as usize];
        }
        perm.antisymmetry ^= self.antisymmetry;
    }
}

/// Multiplication by a permutation on the left.
///
/// The scratch space holds a copy of the images of the permutation being multiplied. Panics when
/// the degrees differ.
impl LeftAction<Perm> for Perm {
    type Scratch = Vec<El>;

    fn left_apply_to_with_scratch(&self, perm: &mut Perm, scratch: &mut Vec<El>) {
        assert_eq!(perm.degree(), self.degree(), "degree mismatch");
        scratch.clear();
        scratch.extend_from_slice(&perm.images);
        for (el, &image) in perm.images.iter_mut().zip(self.images.iter()) {
            *el = scratch[image as usize];
        }
        perm.antisymmetry ^= self.antisymmetry;
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.format_with_scratch(f, &mut Default::default())
    }
}

impl fmt::Debug for Perm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.format_with_scratch(f, &mut Default::default())
    }
}

/// Iterator over the elements of a permutation's cycle.
#[derive(Clone)]
pub struct Cycle<'a> {
    perm: &'a Perm,
    pos: Option<El>,
    start: El,
}

impl<'a> Iterator for Cycle<'a> {
    type Item = El;

    fn next(&mut self) -> Option<El> {
        self.pos.map(|pos| {
            let next = self.perm.image(pos);
            self.pos = if next == self.start { None } else { Some(next) };

            pos
        })
    }
}

impl<'a> fmt::Display for Cycle<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for el in self.clone() {
            f.write_str(if first { "(" } else { " " })?;
            first = false;
            fmt::Display::fmt(&el, f)?;
        }
        f.write_str(if first { "()" } else { ")" })
    }
}

impl<'a> fmt::Debug for Cycle<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Iterator over the cycles of a permutation.
#[derive(Clone)]
pub struct Cycles<'a> {
    perm: &'a Perm,
    seen: Vec<bool>,
    pos: El,
}

impl<'a> Cycles<'a> {
    /// Recover the scratch space needed for efficient iteration over the cycles of a permutation.
    pub fn into_scratch(self) -> Vec<bool> {
        self.seen
    }
}

impl<'a> Iterator for Cycles<'a> {
    type Item = Cycle<'a>;

    fn next(&mut self) -> Option<Cycle<'a>> {
        loop {
            if self.pos as usize >= self.perm.degree() {
                return None;
            } else if self.seen[self.pos as usize] || !self.perm.moves(self.pos) {
                self.pos += 1;
            } else {
                let cycle = self.perm.cycle_at(self.pos);
                for el in cycle.clone() {
                    self.seen[el as usize] = true;
                }
                return Some(cycle);
            }
        }
    }
}

pub struct Power<'a, E> {
    pub base: &'a Perm,
    pub exponent: E,
}

impl<'a, E> AssignValue<Perm> for Power<'a, E>
where
    E: Integer + ToPrimitive + Clone,
{
    type Scratch = Perm;

    fn assign_to_with_scratch(self, target: &mut Perm, scratch: &mut Perm) {
        let Power {
            base: perm,
            exponent: mut exp,
        } = self;

        let neg = exp < E::zero();

        let (target, scratch) = if neg {
            // We swap the roles of target and scratch so we don't need to swap when doing the final
            // inversion
            exp = E::zero() - exp;
            (scratch, target)
        } else {
            (target, scratch)
        };

        match exp.to_usize() {
            Some(0) => target.clone_from(&Perm::identity(perm.degree())),
            Some(1) => target.clone_from(perm),
            Some(2) => target.assign(perm.square()),
            Some(3) => {
                target.assign(perm.square());
                perm.right_apply_to(target);
            }
            _ => {
                let odd = exp.is_odd();
                let half_exp = exp / (E::one() + E::one());

                scratch.assign_with_scratch(perm.pow(half_exp), target);
                target.assign(scratch.square());

                if odd {
                    perm.right_apply_to(target);
                }
            }
        }

        if neg {
            // scratch and target are swapped here
            scratch.assign(target.inverse());
        }
    }
}
