use core::ptr::NonNull;

use crate::{
    balance::{sealed, Balance, Splice},
    Dir, Link, Links, Tree, TreeNode,
};

/// Height-balanced strategy (AVL tree).
///
/// Every node stores the height of its subtree, and the heights of sibling subtrees differ by at
/// most one.
#[derive(Debug)]
pub enum Avl {}

impl sealed::Sealed for Avl {}

impl Balance for Avl {
    /// Height of the node's subtree. A leaf has height 0.
    type Meta = i8;

    const LEAF: i8 = 0;

    unsafe fn inserted<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe { tree.retrace_inserted(node) }
    }

    unsafe fn removed<T>(tree: &mut Tree<T, Self>, splice: Splice<T, i8>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe { tree.retrace_removed(splice.parent) }
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
        let left = left.unwrap_or(-1);
        let right = right.unwrap_or(-1);

        assert!((left - right).abs() <= 1, "subtree heights differ by more than one");

        let height = 1 + left.max(right);
        assert_eq!(
            i32::from(unsafe { tree.meta(node) }),
            height,
            "stored height is stale"
        );

        height
    }
}

impl<T> Tree<T, Avl>
where
    T: TreeNode<Links<T, Avl>> + ?Sized,
{
    // Walks from the parent of the new leaf `node` toward the root, updating heights.
    //
    // Stops at the first ancestor whose height is unchanged, or after the first rotation: an
    // insertion rotation returns the subtree to the height it had before the insertion.
    unsafe fn retrace_inserted(&mut self, node: NonNull<T>) {
        let mut opt_cur = unsafe { self.links(node).parent() };

        while let Some(cur) = opt_cur {
            unsafe {
                let old_height = self.meta(cur);
                self.update_height(cur);

                if self.balance_factor(cur).abs() > 1 {
                    self.rebalance_at(cur);
                    return;
                }

                if self.meta(cur) == old_height {
                    return;
                }

                opt_cur = self.links(cur).parent();
            }
        }
    }

    // Walks from the parent of a vacated position toward the root, updating heights and rotating
    // wherever the balance reaches 2. Unlike insertion, a rotation can leave the subtree shorter,
    // so the walk only stops once a subtree's height is unchanged.
    unsafe fn retrace_removed(&mut self, mut opt_cur: Link<T>) {
        while let Some(cur) = opt_cur {
            unsafe {
                let old_height = self.meta(cur);
                self.update_height(cur);

                let top = self.rebalance_at(cur);
                if self.meta(top) == old_height {
                    return;
                }

                opt_cur = self.links(top).parent();
            }
        }
    }

    // Rotates at `node` if its balance factor is 2 or -2, returning the root of the subtree.
    unsafe fn rebalance_at(&mut self, node: NonNull<T>) -> NonNull<T> {
        unsafe {
            let factor = self.balance_factor(node);
            if factor.abs() < 2 {
                return node;
            }

            let heavy = if factor > 0 { Dir::Right } else { Dir::Left };
            let child = self
                .links(node)
                .child(heavy)
                .expect("heavy side must have a child");

            // The child leans toward `node`: the zig-zag case.
            let child_factor = self.balance_factor(child);
            let inward = match heavy {
                Dir::Left => child_factor > 0,
                Dir::Right => child_factor < 0,
            };

            if inward {
                let grandchild = self
                    .links(child)
                    .child(!heavy)
                    .expect("inward-leaning child must have an inner child");

                self.rotate_twice_at(node, child, grandchild);
                self.update_height(node);
                self.update_height(child);
                self.update_height(grandchild);

                grandchild
            } else {
                self.rotate_at(node, child);
                self.update_height(node);
                self.update_height(child);

                child
            }
        }
    }

    #[inline]
    unsafe fn node_height(&self, node: Link<T>) -> i8 {
        node.map(|n| unsafe { self.meta(n) }).unwrap_or(-1)
    }

    #[inline]
    unsafe fn update_height(&mut self, node: NonNull<T>) {
        unsafe {
            let links = self.links(node);
            let height = 1 + self.node_height(links.left()).max(self.node_height(links.right()));
            self.set_meta(node, height);
        }
    }

    // `h(right) - h(left)`.
    #[inline]
    unsafe fn balance_factor(&self, node: NonNull<T>) -> i8 {
        unsafe {
            let links = self.links(node);
            self.node_height(links.right()) - self.node_height(links.left())
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::prelude::v1::*;

    use crate::{model::TestNode, Avl, Tree};

    #[test]
    fn ascending_inserts_stay_shallow() {
        let mut tree: Tree<TestNode<Avl>, Avl> = Tree::new();

        for key in 0..1024 {
            tree.insert(TestNode::new(key));
        }
        tree.assert_invariants();

        // An AVL tree with n nodes is at most about 1.44 * log2(n) high.
        let height = tree.height().expect("tree is not empty");
        assert!(height <= 14, "height was {height}");

        // Ascending inserts into an AVL tree fill it level by level.
        assert_eq!(height, 10);

        let root = tree.root.expect("tree is not empty");
        assert_eq!(unsafe { tree.meta(root) }, height as i8);
    }

    #[test]
    fn stored_height_tracks_removals() {
        let mut tree: Tree<TestNode<Avl>, Avl> = Tree::new();
        assert_eq!(tree.height(), None);

        for key in 0..15 {
            tree.insert(TestNode::new(key));
        }
        assert_eq!(tree.height(), Some(3));

        for key in 0..15u32 {
            tree.remove(&key);
            tree.assert_invariants();

            let expected = tree.root.map(|root| unsafe { tree.meta(root) as usize });
            assert_eq!(tree.height(), expected);
        }

        assert_eq!(tree.height(), None);
    }

    #[test]
    fn removal_rebalances_above_a_rotation() {
        // Removing 12 unbalances 11; rotating there shortens that subtree, which in turn
        // unbalances the root.
        let mut tree: Tree<TestNode<Avl>, Avl> = Tree::new();
        for key in [8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1] {
            tree.insert(TestNode::new(key));
            tree.assert_invariants();
        }

        assert_eq!(tree.remove(&12u32).map(|node| node.key), Some(12));
        tree.assert_invariants();
        assert_eq!(
            tree.iter().map(|node| node.key).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]
        );
    }
}
