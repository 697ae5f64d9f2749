//! Rank-balanced strategies.
//!
//! Every node stores an integer rank. Conventions follow Haeupler, Sen and Tarjan:
//! - The rank of a node `x` is `r(x)`; a missing node has rank -1.
//! - The rank difference of a node `x` is `r(p(x)) - r(x)`.
//! - A node `x` is an `i`-child if its rank difference is `i`.
//! - A node is `i,j` if one of its children is an `i`-child and the other is a `j`-child.
//!
//! Insertion is shared: a new leaf has rank 0, and the only possible violation is a 0-child, which
//! is pushed up by promotions and settled by at most one single or double rotation.

use core::ptr::NonNull;

use crate::{
    balance::{sealed, Balance, Splice},
    Dir, Link, Links, Tree, TreeNode,
};

/// Weak AVL strategy (WAVL tree).
///
/// The invariants of a WAVL tree are:
/// 1. All rank differences are either 1 or 2.
/// 2. All leaves have rank 0.
///
/// Built only by insertions, a WAVL tree is an AVL tree; deletions may introduce 2,2 nodes, but
/// the height stays within `2 * log2(n)`.
#[derive(Debug)]
pub enum Wavl {}

/// Relaxed AVL strategy.
///
/// Insertion rebalances exactly like [`Wavl`]. Deletion only unlinks the node and never
/// rebalances, so ranks are bounded by the number of insertions rather than the current size.
///
/// The invariants are:
/// 1. All rank differences are at least 1.
/// 2. The height of every node is at most its rank.
#[derive(Debug)]
pub enum Ravl {}

impl sealed::Sealed for Wavl {}
impl sealed::RankBalanced for Wavl {}

impl sealed::Sealed for Ravl {}
impl sealed::RankBalanced for Ravl {}

impl Balance for Wavl {
    /// The node's rank.
    type Meta = i8;

    const LEAF: i8 = 0;

    unsafe fn inserted<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe { tree.rebalance_inserted(node) }
    }

    unsafe fn removed<T>(tree: &mut Tree<T, Self>, splice: Splice<T, i8>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        if let Some(parent) = splice.parent {
            unsafe { tree.rebalance_removed(parent, splice.dir) }
        }
    }

    unsafe fn verify<T>(
        tree: &Tree<T, Self>,
        node: NonNull<T>,
        left: Option<i32>,
        right: Option<i32>,
    ) -> i32
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe {
            let links = tree.links(node);
            let rank = links.meta();

            if links.is_leaf() {
                assert_eq!(rank, 0, "leaf has nonzero rank");
            }

            for child in [links.left(), links.right()] {
                let diff = rank - tree.link_rank(child);
                assert!(
                    diff == 1 || diff == 2,
                    "rank difference is {diff}, must be 1 or 2"
                );
            }
        }

        1 + left.unwrap_or(-1).max(right.unwrap_or(-1))
    }
}

impl Balance for Ravl {
    /// The node's rank.
    type Meta = i8;

    const LEAF: i8 = 0;

    unsafe fn inserted<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe { tree.rebalance_inserted(node) }
    }

    unsafe fn removed<T>(_tree: &mut Tree<T, Self>, _splice: Splice<T, i8>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
    }

    unsafe fn verify<T>(
        tree: &Tree<T, Self>,
        node: NonNull<T>,
        left: Option<i32>,
        right: Option<i32>,
    ) -> i32
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        let height = 1 + left.unwrap_or(-1).max(right.unwrap_or(-1));

        unsafe {
            let links = tree.links(node);
            let rank = links.meta();

            for child in [links.left(), links.right()] {
                let diff = rank - tree.link_rank(child);
                assert!(diff >= 1, "rank difference is {diff}, must be at least 1");
            }

            assert!(
                height <= i32::from(rank),
                "height {height} exceeds rank {rank}"
            );
        }

        height
    }
}

impl<T, B> Tree<T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: sealed::RankBalanced,
{
    // Performs a bottom-up rebalance of the tree after the insertion of the leaf `node`.
    //
    // The only possible violation is a 0-child `x`. While `p(x)` is 0,1, promoting `p(x)` moves
    // the violation up one level. Otherwise `p(x)` is 0,i for some i >= 2 and one rotation ends
    // the walk.
    unsafe fn rebalance_inserted(&mut self, node: NonNull<T>) {
        let mut x = node;

        unsafe {
            loop {
                let Some(parent) = self.links(x).parent() else {
                    return;
                };

                let x_rank = self.meta(x);
                if x_rank != self.meta(parent) {
                    return;
                }

                if x_rank - self.link_rank(self.sibling(x)) == 1 {
                    self.promote(parent);
                    x = parent;
                    continue;
                }

                // `x` was promoted on the previous step, so it is 1,2. Rotate toward its 1-child.
                let z = parent;
                let rotate_dir = !self.which_child(z, x);
                let y = self
                    .links(x)
                    .child(rotate_dir)
                    .filter(|&y| self.meta(y) == x_rank - 1);

                match y {
                    Some(y) => {
                        self.rotate_twice_at(z, x, y);
                        self.promote(y);
                        self.demote(x);
                    }

                    None => self.rotate_at(z, x),
                }

                // z is demoted in all cases.
                self.demote(z);
                return;
            }
        }
    }

    #[inline]
    unsafe fn promote(&mut self, node: NonNull<T>) {
        unsafe {
            let rank = self.meta(node).checked_add(1).expect("rank overflow");
            self.set_meta(node, rank);
        }
    }

    #[inline]
    unsafe fn promote_twice(&mut self, node: NonNull<T>) {
        unsafe {
            let rank = self.meta(node).checked_add(2).expect("rank overflow");
            self.set_meta(node, rank);
        }
    }

    #[inline]
    unsafe fn demote(&mut self, node: NonNull<T>) {
        unsafe {
            let rank = self.meta(node).checked_sub(1).expect("rank underflow");
            self.set_meta(node, rank);
        }
    }

    #[inline]
    unsafe fn demote_twice(&mut self, node: NonNull<T>) {
        unsafe {
            let rank = self.meta(node).checked_sub(2).expect("rank underflow");
            self.set_meta(node, rank);
        }
    }

    /// Returns the rank of the pointed-to node.
    #[inline]
    unsafe fn link_rank(&self, node: Link<T>) -> i8 {
        node.map(|n| unsafe { self.meta(n) }).unwrap_or(-1)
    }
}

macro_rules! impl_root_rank {
    ($($balance:ty),*) => {
        $(
            impl<T> Tree<T, $balance>
            where
                T: TreeNode<Links<T, $balance>> + ?Sized,
            {
                /// Returns the rank of the root, or `None` if the tree is empty.
                ///
                /// The rank is an upper bound on [`Tree::height`].
                pub fn rank(&self) -> Option<i8> {
                    self.root.map(|root| unsafe { self.meta(root) })
                }
            }
        )*
    };
}

impl_root_rank!(Wavl, Ravl);

impl<T> Tree<T, Wavl>
where
    T: TreeNode<Links<T, Wavl>> + ?Sized,
{
    // Performs a bottom-up rebalance of the tree after the `dir` child of `parent` was spliced
    // out.
    //
    // The removed node had at most one child, so before rebalancing exactly one of the following
    // is true:
    //
    // 1. The rank rule holds.
    // 2. `parent` is a 2,2 leaf: it was unary, and its only child was removed.
    // 3. The `dir` child of `parent` is a 3-child.
    //
    // Demoting a 2,2 leaf may turn it into a 3-child, which is then handled as case 3.
    unsafe fn rebalance_removed(&mut self, mut parent: NonNull<T>, mut dir: Dir) {
        unsafe {
            if self.links(parent).is_leaf() && self.meta(parent) != 0 {
                self.demote(parent);

                let Some(grandparent) = self.links(parent).parent() else {
                    return;
                };

                dir = self.which_child(grandparent, parent);
                parent = grandparent;
            }

            // While the `dir` child of `parent` is a 3-child and its sibling `y` is a 2-child or
            // 2,2, demote and ascend.
            loop {
                if !self.is_3_child(parent, dir) {
                    return;
                }

                let y = self
                    .links(parent)
                    .child(!dir)
                    .expect("the sibling of a 3-child must exist");

                if self.is_2_child(parent, y) {
                    self.demote(parent);
                } else if self.is_2_2(y) {
                    self.demote(y);
                    self.demote(parent);
                } else {
                    break;
                }

                let Some(grandparent) = self.links(parent).parent() else {
                    return;
                };

                dir = self.which_child(grandparent, parent);
                parent = grandparent;
            }

            // Here we give up on descriptive names entirely and just use the names from the paper.
            let z = parent;
            let y = self
                .links(z)
                .child(!dir)
                .expect("the sibling of a 3-child must exist");
            let w = self.links(y).child(!dir);

            if self.link_rank(w) == self.meta(y) - 2 {
                // `w` is a 2-child, so `v` is a 1-child.
                let v = self
                    .links(y)
                    .child(dir)
                    .expect("y must have a 1-child");

                self.rotate_twice_at(z, y, v);
                self.promote_twice(v);
                self.demote(y);
                self.demote_twice(z);
            } else {
                self.rotate_at(z, y);
                self.promote(y);

                // A leaf must have rank 0.
                if self.links(z).is_leaf() {
                    self.demote_twice(z);
                } else {
                    self.demote(z);
                }
            }
        }
    }

    unsafe fn is_2_2(&self, node: NonNull<T>) -> bool {
        unsafe {
            let links = self.links(node);
            let rank = links.meta();

            self.link_rank(links.left()) == rank - 2 && self.link_rank(links.right()) == rank - 2
        }
    }

    #[inline]
    unsafe fn is_2_child(&self, parent: NonNull<T>, child: NonNull<T>) -> bool {
        unsafe { self.meta(parent) == self.meta(child) + 2 }
    }

    #[inline]
    unsafe fn is_3_child(&self, parent: NonNull<T>, dir: Dir) -> bool {
        unsafe { self.meta(parent) == self.link_rank(self.links(parent).child(dir)) + 3 }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::prelude::v1::*;

    use crate::{model::TestNode, Ravl, Tree, Wavl};

    fn rank_of(tree: &Tree<TestNode<Wavl>, Wavl>, key: u32) -> i8 {
        let node = tree.get_raw(&key).expect("key is present");
        unsafe { tree.meta(node) }
    }

    #[test]
    fn scenario_insert_then_remove_leaf() {
        let mut tree: Tree<TestNode<Wavl>, Wavl> = Tree::new();
        for key in [10, 20, 30, 40, 50] {
            tree.insert(TestNode::new(key));
            tree.assert_invariants();
        }

        assert_eq!(tree.remove(&20u32).map(|node| node.key), Some(20));
        tree.assert_invariants();
        assert_eq!(
            tree.iter().map(|node| node.key).collect::<Vec<_>>(),
            vec![10, 30, 40, 50]
        );
    }

    #[test]
    fn insertion_only_tree_is_avl() {
        let mut tree: Tree<TestNode<Wavl>, Wavl> = Tree::new();
        for key in 0..7 {
            tree.insert(TestNode::new(key));
        }
        tree.assert_invariants();

        // Seven ascending keys build a perfect tree rooted at 3.
        assert_eq!(tree.root().map(|node| node.key), Some(3));
        assert_eq!(rank_of(&tree, 3), 2);
        assert_eq!(rank_of(&tree, 1), 1);
        assert_eq!(rank_of(&tree, 5), 1);
        assert_eq!(tree.rank(), Some(2));
        assert_eq!(tree.height(), Some(2));
    }

    #[test]
    fn deleting_a_leaf_demotes_its_unary_parent() {
        let mut tree: Tree<TestNode<Wavl>, Wavl> = Tree::new();
        for key in [2, 1, 3, 4] {
            tree.insert(TestNode::new(key));
        }
        assert_eq!(rank_of(&tree, 3), 1);

        tree.remove(&4u32);
        tree.assert_invariants();
        assert_eq!(rank_of(&tree, 3), 0);
    }

    #[test]
    fn relaxed_deletion_does_not_rebalance() {
        let mut tree: Tree<TestNode<Ravl>, Ravl> = Tree::new();
        for key in 0..7 {
            tree.insert(TestNode::new(key));
        }
        tree.assert_invariants();

        let rank_of = |tree: &Tree<TestNode<Ravl>, Ravl>, key: u32| {
            let node = tree.get_raw(&key).expect("key is present");
            unsafe { tree.meta(node) }
        };

        for key in [0u32, 2, 4, 6] {
            assert!(tree.remove(&key).is_some());
            tree.assert_invariants();
        }

        // 1 and 5 are leaves now, but they keep the ranks they had as parents.
        assert_eq!(rank_of(&tree, 1), 1);
        assert_eq!(rank_of(&tree, 5), 1);

        for key in [1u32, 5] {
            assert!(tree.remove(&key).is_some());
            tree.assert_invariants();
        }

        assert_eq!(tree.len(), 1);
        assert_eq!(rank_of(&tree, 3), 2);
        assert_eq!(tree.rank(), Some(2));
        assert_eq!(tree.height(), Some(0));
    }

    #[test]
    fn rank_of_empty_tree() {
        let mut tree: Tree<TestNode<Wavl>, Wavl> = Tree::new();
        assert_eq!(tree.rank(), None);
        assert_eq!(tree.height(), None);

        tree.insert(TestNode::new(1));
        assert_eq!(tree.rank(), Some(0));
        assert_eq!(tree.height(), Some(0));

        tree.remove(&1u32);
        assert_eq!(tree.rank(), None);
    }

    #[test]
    fn wavl_rank_bounds_height_after_deletions() {
        let mut tree: Tree<TestNode<Wavl>, Wavl> = Tree::new();
        for key in 0..64 {
            tree.insert(TestNode::new(key));
        }
        assert_eq!(tree.rank(), Some(6));
        assert_eq!(tree.height(), Some(6));

        for key in (0..64u32).filter(|k| k % 4 != 0) {
            tree.remove(&key);
            tree.assert_invariants();

            let rank = tree.rank().expect("tree is not empty");
            let height = tree.height().expect("tree is not empty");
            assert!(height <= rank as usize, "height {height} exceeds rank {rank}");
        }
    }
}
