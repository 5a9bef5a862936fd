//! Group actions.
//!
//! Permafrost uses right actions throughout: a permutation `g` sends a point `i` to `i^g`, and a
//! product `gh` acts as `i^(gh) = (i^g)^h`. Left actions only show up when multiplying a
//! permutation from the left.
use crate::El;

/// Right action on `T`.
///
/// Elements of implementing types act on `T` values on the right.
pub trait RightAction<T>
where
    T: ?Sized,
{
    /// Type of scratch space needed to perform group action.
    type Scratch: Default;

    /// Act on a value, in place, on the right. Use existing scratch space.
    fn right_apply_to_with_scratch(&self, value: &mut T, scratch: &mut Self::Scratch);

    /// Act on a value, in place, on the right.
    fn right_apply_to(&self, value: &mut T) {
        self.right_apply_to_with_scratch(value, &mut Self::Scratch::default())
    }

    /// Act on a value on the right.
    fn right_apply(&self, mut value: T) -> T
    where
        T: Sized,
    {
        self.right_apply_to(&mut value);
        value
    }
}

/// Left action on `T`.
///
/// Elements of implementing types act on `T` values on the left.
pub trait LeftAction<T>
where
    T: ?Sized,
{
    /// Type of scratch space needed to perform group action.
    type Scratch: Default;

    /// Act on a value, in place, on the left. Use existing scratch space.
    fn left_apply_to_with_scratch(&self, value: &mut T, scratch: &mut Self::Scratch);

    /// Act on a value, in place, on the left.
    fn left_apply_to(&self, value: &mut T) {
        self.left_apply_to_with_scratch(value, &mut Self::Scratch::default())
    }

    /// Act on a value on the left.
    fn left_apply(&self, mut value: T) -> T
    where
        T: Sized,
    {
        self.left_apply_to(&mut value);
        value
    }
}

/// Pointwise action on a sequence of points.
///
/// Every point of the slice is replaced by its image. This is how base images, point tuples and
/// point sets are moved around.
impl<A> RightAction<[El]> for A
where
    A: RightAction<El, Scratch = ()>,
{
    type Scratch = ();

    fn right_apply_to_with_scratch(&self, points: &mut [El], _: &mut ()) {
        for point in points.iter_mut() {
            self.right_apply_to(point);
        }
    }
}
