//! Total order on points induced by a base.
use std::cmp::Ordering;

use crate::error::{check_points, Result};
use crate::El;

/// The ordering `≺` induced by a base `[β₀, ..., β_{k-1}]`.
///
/// Base points come first, in base order. All other points follow in their natural order. Two
/// synthetic points, [`InducedOrdering::min_element`] and [`InducedOrdering::max_element`],
/// compare below respectively above every real point; they serve as open bounds in pruning
/// tests.
#[derive(Clone, Debug)]
pub struct InducedOrdering {
    ranks: Vec<usize>,
}

impl InducedOrdering {
    /// Fails when a base point is out of range or repeated.
    pub fn new(base: &[El], degree: usize) -> Result<InducedOrdering> {
        check_points(base, degree)?;
        // rank 0 is reserved for the min sentinel
        let mut ranks = vec![0; degree];
        for (position, &point) in base.iter().enumerate() {
            ranks[point as usize] = position + 1;
        }
        for (point, rank) in ranks.iter_mut().enumerate() {
            if *rank == 0 {
                *rank = base.len() + point + 1;
            }
        }
        Ok(InducedOrdering { ranks })
    }

    /// A point below every real point.
    pub fn min_element(&self) -> El {
        El::max_value()
    }

    /// A point above every real point.
    pub fn max_element(&self) -> El {
        El::max_value() - 1
    }

    /// Position of a point in the ordering.
    ///
    /// Points at or above the degree rank after every point below it, in natural order.
    pub fn rank(&self, point: El) -> usize {
        if point == self.min_element() {
            0
        } else if point == self.max_element() {
            usize::max_value()
        } else {
            self.ranks
                .get(point as usize)
                .copied()
                .unwrap_or(2 * self.ranks.len() + point as usize)
        }
    }

    pub fn compare(&self, a: El, b: El) -> Ordering {
        self.rank(a).cmp(&self.rank(b))
    }

    pub fn less(&self, a: El, b: El) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    pub fn min(&self, a: El, b: El) -> El {
        if self.less(b, a) {
            b
        } else {
            a
        }
    }

    pub fn max(&self, a: El, b: El) -> El {
        if self.less(a, b) {
            b
        } else {
            a
        }
    }

    /// Sort points ascending under this ordering.
    pub fn sort(&self, points: &mut [El]) {
        points.sort_unstable_by_key(|&point| self.rank(point));
    }

    /// Compare two point sequences lexicographically.
    pub fn compare_sequences(&self, a: &[El], b: &[El]) -> Ordering {
        for (&x, &y) in a.iter().zip(b.iter()) {
            match self.compare(x, y) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        a.len().cmp(&b.len())
    }
}
