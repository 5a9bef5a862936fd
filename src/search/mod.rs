//! Backtrack search over the elements of a group.
//!
//! Elements of a group with a complete chain correspond to sequences of base images. The search
//! walks the tree of partial base image sequences depth first. At every level the candidate
//! images are visited in ascending order under the ordering induced by the base, so complete
//! elements come out in lexicographic order of their base images. A pruning test cuts off
//! subtrees; a property decides which leaves are reported.
//!
//! The pruning test must be monotone: when it rejects a node, it has to reject every node below
//! it. The search does not check this.
use std::sync::Arc;

use crate::action::RightAction;
use crate::bsgs::{
    base_of, create_raw_bsgs_candidate, freeze, is_member, BsgsCandidateElement, BsgsElement,
};
use crate::error::{GroupError, Result};
use crate::ordering::InducedOrdering;
use crate::perm::Perm;
use crate::rebase::remove_redundant_levels;
use crate::schreier_sims::{remove_redundant_generators, schreier_sims};
use crate::El;

pub mod subgroup;

/// Per-level state that follows the search cursor.
///
/// The hooks run around every change of the partial word at a level: when a level is entered and
/// whenever the cursor moves on to the next image at that level.
pub trait SearchPayload {
    /// The partial word at `level` is about to change.
    fn before_level_increment(&mut self, _level: usize) -> Result<()> {
        Ok(())
    }

    /// `word` is the new partial word at `level`.
    fn after_level_increment(&mut self, _level: usize, _word: &Perm) -> Result<()> {
        Ok(())
    }

    /// Pruning test for the partial word at `level`.
    fn test(&mut self, word: &Perm, level: usize) -> bool;
}

/// Wraps a closure `(word, level) -> bool` as a [`SearchPayload`] without hooks.
pub struct TestFn<F>(pub F);

impl<F> SearchPayload for TestFn<F>
where
    F: FnMut(&Perm, usize) -> bool,
{
    fn test(&mut self, word: &Perm, level: usize) -> bool {
        (self.0)(word, level)
    }
}

/// Payload accepting every node.
pub struct AcceptAll;

impl SearchPayload for AcceptAll {
    fn test(&mut self, _word: &Perm, _level: usize) -> bool {
        true
    }
}

/// Position of a backtrack search in the search tree.
///
/// For every level the candidate images are kept as `(image, orbit point)` pairs, sorted by
/// image. The partial word at level `l` is `u_l · word[l - 1]`, where `u_l` is the transversal
/// for the chosen orbit point, so it maps the base points up to level `l` to the chosen images.
#[derive(Clone, Debug)]
pub(crate) struct SearchCursor {
    ordering: InducedOrdering,
    base: Vec<El>,
    images: Vec<Vec<(El, El)>>,
    tuple: Vec<usize>,
    words: Vec<Perm>,
    bounds: Vec<usize>,
}

impl SearchCursor {
    pub(crate) fn new(chain: &[BsgsElement]) -> Result<SearchCursor> {
        let degree = chain.first().ok_or(GroupError::EmptyBsgs)?.degree();
        let base = base_of(chain);
        let depth = chain.len();
        Ok(SearchCursor {
            ordering: InducedOrdering::new(&base, degree)?,
            base,
            images: vec![vec![]; depth],
            tuple: vec![0; depth],
            words: vec![Perm::identity(degree); depth],
            bounds: vec![1; depth],
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.base.len()
    }

    pub(crate) fn ordering(&self) -> &InducedOrdering {
        &self.ordering
    }

    pub(crate) fn base(&self) -> &[El] {
        &self.base
    }

    pub(crate) fn word(&self, level: usize) -> &Perm {
        &self.words[level]
    }

    /// Image of the base point of `level` under the current partial word.
    pub(crate) fn image(&self, level: usize) -> El {
        self.images[level][self.tuple[level]].0
    }

    /// Skip the last `bound - 1` images at `level`.
    ///
    /// An element that is least in its coset `K g` cannot map the base point of `level` to one of
    /// the largest `|orbit of K^(level)| - 1` images.
    pub(crate) fn set_bound(&mut self, level: usize, bound: usize) {
        self.bounds[level] = bound.max(1);
    }

    pub(crate) fn is_last(&self, level: usize) -> bool {
        let limit = (self.images[level].len() + 1).saturating_sub(self.bounds[level]);
        self.tuple[level] + 1 >= limit
    }

    /// Compute the sorted images of `level` under the word of the previous level and pick the
    /// least one.
    pub(crate) fn enter(&mut self, chain: &[BsgsElement], level: usize) -> Result<()> {
        let images = {
            let previous = level.checked_sub(1).map(|previous| &self.words[previous]);
            let mut images: Vec<(El, El)> = chain[level]
                .orbit()
                .iter()
                .map(|&point| (previous.map_or(point, |word| word.image(point)), point))
                .collect();
            let ordering = &self.ordering;
            images.sort_unstable_by_key(|&(image, _)| ordering.rank(image));
            images
        };
        self.images[level] = images;
        self.tuple[level] = 0;
        self.update_word(chain, level)
    }

    /// Move on to the next image at `level`.
    pub(crate) fn advance(&mut self, chain: &[BsgsElement], level: usize) -> Result<()> {
        self.tuple[level] += 1;
        self.update_word(chain, level)
    }

    fn update_word(&mut self, chain: &[BsgsElement], level: usize) -> Result<()> {
        let point = self.images[level][self.tuple[level]].1;
        let (before, rest) = self.words.split_at_mut(level);
        let word = &mut rest[0];
        *word = chain[level].transversal(point)?;
        if let Some(previous) = before.last() {
            previous.right_apply_to(word);
        }
        Ok(())
    }
}

/// Lazy depth-first enumeration of the elements of a group passing a test and a property.
///
/// Elements are produced in ascending lexicographic order of their base images. After an error
/// the search is exhausted.
pub struct BacktrackSearch<P, Q> {
    chain: Arc<[BsgsElement]>,
    cursor: SearchCursor,
    level: usize,
    started: bool,
    exhausted: bool,
    payload: P,
    property: Q,
}

impl<P, Q> BacktrackSearch<P, Q>
where
    P: SearchPayload,
    Q: FnMut(&Perm) -> bool,
{
    /// Search the group described by a complete chain.
    pub fn new(chain: Arc<[BsgsElement]>, payload: P, property: Q) -> Result<Self> {
        let cursor = SearchCursor::new(&chain)?;
        Ok(BacktrackSearch {
            chain,
            cursor,
            level: 0,
            started: false,
            exhausted: false,
            payload,
            property,
        })
    }

    /// Limit the images at each level as for elements that are least in their coset `K g`, where
    /// `bounds[level]` is the size of the orbit of the level's base point under `K^(level)`.
    pub fn with_orbit_bounds(mut self, bounds: &[usize]) -> Self {
        for (level, &bound) in bounds.iter().enumerate().take(self.cursor.depth()) {
            self.cursor.set_bound(level, bound);
        }
        self
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    fn enter(&mut self, level: usize) -> Result<()> {
        self.payload.before_level_increment(level)?;
        self.cursor.enter(&self.chain, level)?;
        self.level = level;
        self.payload
            .after_level_increment(level, self.cursor.word(level))
    }

    /// Ascend past all levels at their last image, then move to the next image.
    fn backtrack(&mut self) -> Result<()> {
        loop {
            if !self.cursor.is_last(self.level) {
                self.payload.before_level_increment(self.level)?;
                self.cursor.advance(&self.chain, self.level)?;
                return self
                    .payload
                    .after_level_increment(self.level, self.cursor.word(self.level));
            }
            if self.level == 0 {
                self.exhausted = true;
                return Ok(());
            }
            self.level -= 1;
        }
    }

    fn step(&mut self) -> Result<Option<Perm>> {
        if !self.started {
            self.started = true;
            self.enter(0)?;
        }
        let last = self.cursor.depth() - 1;
        while !self.exhausted {
            let word = self.cursor.word(self.level);
            if !self.payload.test(word, self.level) {
                self.backtrack()?;
                continue;
            }
            if self.level < last {
                self.enter(self.level + 1)?;
                continue;
            }
            let found = if (self.property)(word) {
                Some(word.clone())
            } else {
                None
            };
            self.backtrack()?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }
}

impl<P, Q> Iterator for BacktrackSearch<P, Q>
where
    P: SearchPayload,
    Q: FnMut(&Perm) -> bool,
{
    type Item = Result<Perm>;

    fn next(&mut self) -> Option<Result<Perm>> {
        if self.exhausted {
            return None;
        }
        match self.step() {
            Ok(found) => found.map(Ok),
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

/// For each point, the least point of its orbit under `generators`.
pub(crate) fn orbit_minima(
    generators: &[Perm],
    ordering: &InducedOrdering,
    degree: usize,
) -> Vec<El> {
    let mut minima = vec![El::max_value(); degree];
    let mut orbit = vec![];
    for start in 0..degree as El {
        if minima[start as usize] != El::max_value() {
            continue;
        }
        orbit.clear();
        orbit.push(start);
        minima[start as usize] = start;
        let mut pos = 0;
        while pos < orbit.len() {
            let point = orbit[pos];
            for generator in generators {
                let image = generator.image(point);
                if minima[image as usize] == El::max_value() {
                    minima[image as usize] = start;
                    orbit.push(image);
                }
            }
            pos += 1;
        }
        let least = orbit
            .iter()
            .copied()
            .min_by_key(|&point| ordering.rank(point))
            .unwrap_or(start);
        for &point in orbit.iter() {
            minima[point as usize] = least;
        }
    }
    minima
}

fn orbit_bounds(cursor: &mut SearchCursor, found: &[BsgsCandidateElement]) {
    for level in 0..cursor.depth() {
        let bound = found.get(level).map_or(1, |element| element.orbit_size());
        cursor.set_bound(level, bound);
    }
}

/// Find the subgroup of all elements with a property (Holt, SUBGROUPSEARCH).
///
/// `chain` must be complete, `property` must define a subgroup, and the payload's test must be
/// monotone and accept every element of that subgroup. `known` lists elements already known to
/// have the property.
///
/// The subgroup `K` found so far is kept as a chain on the same base. Levels are handled from
/// the deepest one up; at level `l` only elements fixing the first `l` base points are searched.
/// Such an element is only a candidate if its image of `β_l` is least in its `K^(l)`-orbit and if
/// at every level its image is not among the last ones excluded by the `K` orbit sizes. Every new
/// element is added to `K`, after which the search resumes at level `l`.
pub fn subgroup_search_with_payload<P, Q>(
    chain: &[BsgsElement],
    known: &[Perm],
    payload: &mut P,
    mut property: Q,
) -> Result<Vec<BsgsElement>>
where
    P: SearchPayload,
    Q: FnMut(&Perm) -> bool,
{
    let mut cursor = SearchCursor::new(chain)?;
    let degree = chain[0].degree();
    let depth = cursor.depth();
    let mut found = create_raw_bsgs_candidate(cursor.base(), known, degree)?;
    schreier_sims(&mut found)?;
    orbit_bounds(&mut cursor, &found);

    for target in (0..depth).rev() {
        for level in 0..=target {
            payload.before_level_increment(level)?;
            cursor.enter(chain, level)?;
            payload.after_level_increment(level, cursor.word(level))?;
        }
        if cursor.is_last(target) {
            continue;
        }
        let mut minima = orbit_minima(
            found[target].stabilizer_generators(),
            cursor.ordering(),
            degree,
        );

        // the least image is the base point itself, whose subtree lies in K
        payload.before_level_increment(target)?;
        cursor.advance(chain, target)?;
        payload.after_level_increment(target, cursor.word(target))?;
        let mut level = target;

        'search: loop {
            let admissible = (level != target || {
                let image = cursor.image(target);
                minima[image as usize] == image
            }) && payload.test(cursor.word(level), level);

            if admissible && level + 1 < depth {
                level += 1;
                payload.before_level_increment(level)?;
                cursor.enter(chain, level)?;
                payload.after_level_increment(level, cursor.word(level))?;
                continue;
            }

            if admissible {
                let word = cursor.word(level);
                if property(word) && !is_member(&found, word)? {
                    tracing::debug!(level = target, element = %word, "found subgroup element");
                    for element in found[..=target].iter_mut() {
                        element.add_stabilizer(word.clone());
                        element.recalculate_orbit_and_schreier_vector()?;
                    }
                    schreier_sims(&mut found)?;
                    orbit_bounds(&mut cursor, &found);
                    minima = orbit_minima(
                        found[target].stabilizer_generators(),
                        cursor.ordering(),
                        degree,
                    );
                    level = target;
                }
            }

            loop {
                if !cursor.is_last(level) {
                    payload.before_level_increment(level)?;
                    cursor.advance(chain, level)?;
                    payload.after_level_increment(level, cursor.word(level))?;
                    continue 'search;
                }
                if level == target {
                    break 'search;
                }
                level -= 1;
            }
        }
    }

    remove_redundant_generators(&mut found)?;
    remove_redundant_levels(&mut found, 0);
    Ok(freeze(found))
}

/// [`subgroup_search_with_payload`] with a plain pruning test.
pub fn subgroup_search<T, Q>(
    chain: &[BsgsElement],
    known: &[Perm],
    test: T,
    property: Q,
) -> Result<Vec<BsgsElement>>
where
    T: FnMut(&Perm, usize) -> bool,
    Q: FnMut(&Perm) -> bool,
{
    subgroup_search_with_payload(chain, known, &mut TestFn(test), property)
}
