use core::ptr::NonNull;

use crate::{
    balance::{sealed, Balance, Splice},
    Links, Tree, TreeNode,
};

/// Access-balanced strategy (splay tree).
///
/// Nodes carry no metadata. Inserting or [searching] for a node moves it to the root, and removal
/// moves the parent of the vacated position to the root. Operations take _O(log(n))_ amortized
/// time.
///
/// [searching]: Tree::search
#[derive(Debug)]
pub enum Splay {}

impl sealed::Sealed for Splay {}

impl Balance for Splay {
    type Meta = ();

    const LEAF: () = ();

    unsafe fn inserted<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe { tree.splay(node) }
    }

    unsafe fn removed<T>(tree: &mut Tree<T, Self>, splice: Splice<T, ()>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        if let Some(parent) = splice.parent {
            unsafe { tree.splay(parent) }
        }
    }

    unsafe fn accessed<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe { tree.splay(node) }
    }

    unsafe fn verify<T>(
        _tree: &Tree<T, Self>,
        _node: NonNull<T>,
        _left: Option<i32>,
        _right: Option<i32>,
    ) -> i32
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        0
    }
}

impl<T> Tree<T, Splay>
where
    T: TreeNode<Links<T, Splay>> + ?Sized,
{
    // Moves `x` to the root.
    unsafe fn splay(&mut self, x: NonNull<T>) {
        unsafe {
            while let Some(parent) = self.links(x).parent() {
                let Some(grandparent) = self.links(parent).parent() else {
                    // zig
                    self.rotate_at(parent, x);
                    return;
                };

                if self.which_child(parent, x) == self.which_child(grandparent, parent) {
                    self.zig_zig(grandparent, parent, x);
                } else {
                    // zig-zag
                    self.rotate_twice_at(grandparent, parent, x);
                }
            }
        }
    }

    // Moves `x` above its parent `p` and grandparent `g`, where `x` and `p` are children on the
    // same side. Equivalent to rotating `p` over `g` and then `x` over `p`.
    //
    //         g               x
    //        / \             / \
    //       p   d           a   p
    //      / \       =>        / \
    //     x   c               b   g
    //    / \                     / \
    //   a   b                   c   d
    unsafe fn zig_zig(&mut self, g: NonNull<T>, p: NonNull<T>, x: NonNull<T>) {
        unsafe {
            let dir = self.which_child(p, x);
            let top = self.links(g).parent();

            let p_across = self.links(p).child(!dir);
            let x_across = self.links(x).child(!dir);

            self.replace_child_or_set_root(top, g, Some(x));
            self.links_mut(x).set_parent(top);

            self.links_mut(g).set_child(dir, p_across);
            self.maybe_set_parent(p_across, Some(g));

            self.links_mut(p).set_child(dir, x_across);
            self.maybe_set_parent(x_across, Some(p));

            self.links_mut(p).set_child(!dir, Some(g));
            self.links_mut(g).set_parent(Some(p));

            self.links_mut(x).set_child(!dir, Some(p));
            self.links_mut(p).set_parent(Some(x));
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::prelude::v1::*;

    use crate::{model::TestNode, Splay, Tree};

    fn root_key(tree: &Tree<TestNode<Splay>, Splay>) -> Option<u32> {
        tree.root().map(|node| node.key)
    }

    fn tree_of(keys: &[u32]) -> Tree<TestNode<Splay>, Splay> {
        let mut tree = Tree::new();

        for &key in keys {
            tree.insert(TestNode::new(key));
            tree.assert_invariants();
            assert_eq!(root_key(&tree), Some(key));
        }

        tree
    }

    #[test]
    fn search_moves_key_to_root() {
        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);

        for key in [1u32, 7, 3, 5, 4] {
            assert_eq!(tree.search(&key).map(|node| node.key), Some(key));
            assert_eq!(root_key(&tree), Some(key));
            tree.assert_invariants();
        }
    }

    #[test]
    fn missed_search_leaves_tree_alone() {
        let mut tree = tree_of(&[4, 2, 6]);

        assert!(tree.search(&5u32).is_none());
        assert_eq!(root_key(&tree), Some(6));
    }

    #[test]
    fn get_does_not_restructure() {
        let tree = tree_of(&[1, 2, 3, 4, 5]);

        assert_eq!(tree.get(&1u32).map(|node| node.key), Some(1));
        assert_eq!(root_key(&tree), Some(5));
    }

    #[test]
    fn zig_zig_halves_a_spine() {
        // Ascending inserts build a left spine: 6 -> 5 -> 4 -> 3 -> 2 -> 1.
        let mut tree = tree_of(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(tree.height(), Some(5));

        assert_eq!(tree.search(&1u32).map(|node| node.key), Some(1));
        tree.assert_invariants();
        assert_eq!(root_key(&tree), Some(1));

        // Two zig-zig steps and a final zig leave 6 as the root's right child, holding 2..=5 in its
        // left subtree.
        let root = tree.root.expect("tree is not empty");
        unsafe {
            assert_eq!(tree.links(root).left(), None);
            let right = tree.links(root).right().expect("root has a right child");
            assert_eq!(right.as_ref().key, 6);
        }
        assert_eq!(
            tree.iter().map(|node| node.key).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );

        // 1 -> 6 -> 4 -> 2 -> 3
        assert_eq!(tree.height(), Some(4));
    }

    #[test]
    fn height_of_a_long_spine() {
        let mut tree: Tree<TestNode<Splay>, Splay> = Tree::new();
        for key in 0..2_000 {
            tree.insert(TestNode::new(key));
        }

        // Measuring does not splay anything.
        assert_eq!(tree.height(), Some(1_999));
        assert_eq!(root_key(&tree), Some(1_999));
        tree.assert_invariants();
    }

    #[test]
    fn removal_splays_parent() {
        // Ascending inserts build a left spine: 4 -> 3 -> 2 -> 1.
        let mut tree = tree_of(&[1, 2, 3, 4]);

        assert_eq!(tree.remove(&2u32).map(|node| node.key), Some(2));
        tree.assert_invariants();
        assert_eq!(root_key(&tree), Some(3));
        assert_eq!(
            tree.iter().map(|node| node.key).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
    }
}
