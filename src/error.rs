//! Error type shared by all group algorithms.
use thiserror::Error;

use crate::El;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroupError {
    /// The generators produce an element that fixes every point but flips the sign.
    #[error("Inconsistent generators: the group contains an antisymmetric identity")]
    InconsistentGenerators,
    #[error("Images do not form a permutation")]
    NotAPermutation,
    #[error("At least one generator is required")]
    EmptyGroup,
    #[error("Stabilizer chain has no levels")]
    EmptyBsgs,
    #[error("Point {point} is not in the orbit of base point {base_point}")]
    PointNotInOrbit { point: El, base_point: El },
    #[error("Degree mismatch: expected {expected}, found {found}")]
    DegreeMismatch { expected: usize, found: usize },
    #[error("Confidence level {0} is outside of [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("Point {point} is out of range for degree {degree}")]
    PointOutOfRange { point: El, degree: usize },
    #[error("Point {0} occurs more than once")]
    DuplicatePoint(El),
    #[error("Level {level} has no successor in a chain of length {length}")]
    LevelOutOfRange { level: usize, length: usize },
    #[error("Permutation is not a member of the group")]
    NotAMember,
    #[error("Not a subgroup of the group")]
    NotASubgroup,
    #[error("Length mismatch: {from} source points but {to} target points")]
    LengthMismatch { from: usize, to: usize },
}

pub type Result<T, E = GroupError> = std::result::Result<T, E>;

/// Check that every point is below `degree` and occurs only once.
pub(crate) fn check_points(points: &[El], degree: usize) -> Result<()> {
    let mut seen = vec![false; degree];
    for &point in points {
        if point as usize >= degree {
            return Err(GroupError::PointOutOfRange { point, degree });
        }
        if seen[point as usize] {
            return Err(GroupError::DuplicatePoint(point));
        }
        seen[point as usize] = true;
    }
    Ok(())
}

pub(crate) fn check_degree(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(GroupError::DegreeMismatch { expected, found });
    }
    Ok(())
}
