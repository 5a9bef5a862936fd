//! Overwriting assignments that reuse the target's allocation.
//!
//! Stabilizer chain algorithms produce a lot of short-lived permutations (inverses of
//! transversals, powers, products). Assigning those into existing values avoids reallocating
//! the image buffers each time.

/// A computation whose result can be assigned to a value of type `T`.
pub trait AssignValue<T>: Sized
where
    T: ?Sized,
{
    /// Type of scratch space needed to perform assignment.
    type Scratch: Default;

    /// Assign the result to a target. Use existing scratch space.
    fn assign_to_with_scratch(self, target: &mut T, scratch: &mut Self::Scratch);

    /// Assign the result to a target.
    fn assign_to(self, target: &mut T) {
        self.assign_to_with_scratch(target, &mut Self::Scratch::default());
    }

    /// Return the result as a new value. Use existing scratch space.
    fn get_with_scratch(self, scratch: &mut Self::Scratch) -> T
    where
        T: Sized + Default,
    {
        let mut result = T::default();
        self.assign_to_with_scratch(&mut result, scratch);
        result
    }

    /// Return the result as a new value.
    fn get(self) -> T
    where
        T: Sized + Default,
    {
        self.get_with_scratch(&mut Self::Scratch::default())
    }
}

/// Assignable computation given by a closure writing into the target.
pub struct AssignFn<F>(pub F);

impl<T, F> AssignValue<T> for AssignFn<F>
where
    F: FnOnce(&mut T),
{
    type Scratch = ();

    fn assign_to_with_scratch(self, target: &mut T, _scratch: &mut ()) {
        self.0(target);
    }
}

/// Provide `assign` methods on targets of [`AssignValue`].
///
/// This keeps the source order of a plain assignment: `target.assign(perm.inverse())`.
pub trait Assign {
    fn assign<T>(&mut self, value: T)
    where
        T: AssignValue<Self>,
    {
        value.assign_to(self);
    }

    fn assign_with_scratch<T>(&mut self, value: T, scratch: &mut T::Scratch)
    where
        T: AssignValue<Self>,
    {
        value.assign_to_with_scratch(self, scratch);
    }
}

impl<T> Assign for T {}
