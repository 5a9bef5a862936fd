//! A permutation group library
//!
//! This crate provides data structures and algorithms for working with permutations and permutation
//! groups: stabilizer chains built by the Schreier-Sims algorithm, base changes, and backtrack
//! searches for subgroups, cosets, intersections and centralizers.
//!
//! Permutations act on points from the right, so `i^(gh) = (i^g)^h`.
//!
pub mod action;
pub mod assign;
pub mod bsgs;
pub mod config;
pub mod error;
pub mod group;
pub mod ordering;
pub mod perm;
pub mod random;
pub mod rebase;
pub mod schreier;
pub mod schreier_sims;
pub mod search;

pub use config::GroupConfig;
pub use error::{GroupError, Result};
pub use group::PermGroup;
pub use perm::Perm;

/// Set element.
///
/// Set elements are represented by non-negative integers (`u32`).
pub type El = u32;
