//! Balancing strategies.
//!
//! A strategy decides what each node's [`Links`] carry besides the structural pointers, and how
//! that metadata is repaired after the tree core has linked in or spliced out a node. Every repair
//! walks from the affected position toward the root using the rotations of [`Tree`].

use core::{fmt, ptr::NonNull};

use crate::{Dir, Link, Links, Tree, TreeNode};

mod avl;
mod rank;
mod red_black;
mod splay;

pub use avl::Avl;
pub use rank::{Ravl, Wavl};
pub use red_black::{Color, RedBlack};
pub use splay::Splay;

pub(crate) mod sealed {
    pub trait Sealed {}

    /// Strategies that store an `i8` rank per node and share the promote/rotate insertion walk.
    pub trait RankBalanced: super::Balance<Meta = i8> {}
}

/// A balancing strategy for a [`Tree`].
///
/// This trait is sealed; the strategies are [`Avl`], [`RedBlack`], [`Splay`], [`Wavl`] and
/// [`Ravl`].
pub trait Balance: sealed::Sealed + Sized + 'static {
    /// Per-node balancing metadata.
    type Meta: Copy + fmt::Debug;

    /// The metadata of a node that has just been linked in as a leaf.
    const LEAF: Self::Meta;

    /// Restores the strategy's invariant after `node` was linked into the tree as a leaf.
    #[doc(hidden)]
    unsafe fn inserted<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized;

    /// Restores the strategy's invariant after a node was spliced out of the tree.
    #[doc(hidden)]
    unsafe fn removed<T>(tree: &mut Tree<T, Self>, splice: Splice<T, Self::Meta>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized;

    /// Reacts to a successful self-adjusting lookup of `node`.
    #[doc(hidden)]
    unsafe fn accessed<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        let _ = (tree, node);
    }

    /// Checks the strategy's invariant at `node`, given the measures returned for its left and
    /// right subtrees (`None` for a missing child), and returns the measure of `node`'s subtree.
    #[doc(hidden)]
    unsafe fn verify<T>(
        tree: &Tree<T, Self>,
        node: NonNull<T>,
        left: Option<i32>,
        right: Option<i32>,
    ) -> i32
    where
        T: TreeNode<Links<T, Self>> + ?Sized;

    /// Checks conditions that apply only to the root.
    #[doc(hidden)]
    unsafe fn verify_root<T>(tree: &Tree<T, Self>, root: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        let _ = (tree, root);
    }
}

/// The position vacated by a structural removal.
///
/// Exactly one node with at most one child leaves the structure on every removal; its only child
/// (if any) takes its place.
pub struct Splice<T: ?Sized, M> {
    /// The parent of the vacated position, or `None` if it was the root.
    pub(crate) parent: Link<T>,
    /// Which child of `parent` the vacated position is.
    pub(crate) dir: Dir,
    /// The node now occupying the vacated position.
    pub(crate) child: Link<T>,
    /// The metadata held by the node that left the position.
    pub(crate) lost: M,
}
