//! Orbits with Schreier vectors.
//!
//! A Schreier vector stores, for every point of an orbit, which generator first reached it. That
//! spanning tree is enough to rebuild a transversal element for any orbit point without storing
//! one permutation per point.
use crate::action::RightAction;
use crate::error::{check_degree, check_points, GroupError, Result};
use crate::perm::Perm;
use crate::El;

/// Entry of a Schreier vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchreierLink {
    /// The base point itself.
    Root,
    /// Not in the orbit.
    Unreached,
    /// Reached from `parent` by applying the generator with index `generator`.
    Generator { generator: u32, parent: El },
}

/// Orbit of a base point together with a Schreier vector spanning it.
#[derive(Clone, Debug)]
pub struct SchreierVector {
    base_point: El,
    orbit: Vec<El>,
    links: Vec<SchreierLink>,
}

impl SchreierVector {
    /// Compute the orbit of `base_point` under `generators` and a spanning tree for it.
    ///
    /// Points are appended to the orbit in the order they are discovered, so the base point is
    /// always first. This is a full recomputation, costing O(|orbit| · |generators|).
    ///
    /// Fails when the base point is out of range or a generator has a different degree.
    pub fn compute(base_point: El, generators: &[Perm], degree: usize) -> Result<SchreierVector> {
        check_points(&[base_point], degree)?;
        for generator in generators {
            check_degree(degree, generator.degree())?;
        }
        let mut links = vec![SchreierLink::Unreached; degree];
        links[base_point as usize] = SchreierLink::Root;
        let mut orbit = vec![base_point];

        let mut pos = 0;
        while pos < orbit.len() {
            let point = orbit[pos];
            for (index, generator) in generators.iter().enumerate() {
                let image = generator.right_apply(point);
                if links[image as usize] == SchreierLink::Unreached {
                    links[image as usize] = SchreierLink::Generator {
                        generator: index as u32,
                        parent: point,
                    };
                    orbit.push(image);
                }
            }
            pos += 1;
        }

        Ok(SchreierVector {
            base_point,
            orbit,
            links,
        })
    }

    pub fn base_point(&self) -> El {
        self.base_point
    }

    /// Orbit points in discovery order.
    pub fn orbit(&self) -> &[El] {
        &self.orbit
    }

    /// Number of points of the underlying domain.
    pub fn degree(&self) -> usize {
        self.links.len()
    }

    pub fn orbit_size(&self) -> usize {
        self.orbit.len()
    }

    pub fn contains(&self, point: El) -> bool {
        self.link(point) != SchreierLink::Unreached
    }

    pub fn link(&self, point: El) -> SchreierLink {
        self.links
            .get(point as usize)
            .cloned()
            .unwrap_or(SchreierLink::Unreached)
    }

    /// Indices of the generators leading from the base point to `point`, in application order.
    fn path(&self, point: El) -> Result<Vec<u32>> {
        let mut path = vec![];
        let mut current = point;
        loop {
            match self.link(current) {
                SchreierLink::Root => break,
                SchreierLink::Unreached => {
                    return Err(GroupError::PointNotInOrbit {
                        point,
                        base_point: self.base_point,
                    })
                }
                SchreierLink::Generator { generator, parent } => {
                    path.push(generator);
                    current = parent;
                }
            }
        }
        path.reverse();
        Ok(path)
    }

    /// A permutation sending the base point to `point`.
    ///
    /// `generators` must be the generators this Schreier vector was computed from.
    pub fn transversal(&self, point: El, generators: &[Perm]) -> Result<Perm> {
        let mut result = Perm::identity(self.links.len());
        for index in self.path(point)? {
            generators[index as usize].right_apply_to(&mut result);
        }
        Ok(result)
    }

    /// Number of generators multiplied together by [`SchreierVector::transversal`].
    pub fn word_length(&self, point: El) -> Result<usize> {
        Ok(self.path(point)?.len())
    }
}
