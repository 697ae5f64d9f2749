use core::ptr::NonNull;

use crate::{
    balance::{sealed, Balance, Splice},
    Dir, Link, Links, Tree, TreeNode,
};

/// Color-balanced strategy (red-black tree).
///
/// The root is black, no red node has a red child, and every path from a node down to a missing
/// child passes the same number of black nodes.
#[derive(Debug)]
pub enum RedBlack {}

/// The color of a red-black tree node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

impl sealed::Sealed for RedBlack {}

impl Balance for RedBlack {
    type Meta = Color;

    const LEAF: Color = Color::Red;

    unsafe fn inserted<T>(tree: &mut Tree<T, Self>, node: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        unsafe { tree.fix_red_red(node) }
    }

    unsafe fn removed<T>(tree: &mut Tree<T, Self>, splice: Splice<T, Color>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        // Removing a red node never changes a black-height.
        if splice.lost == Color::Black {
            unsafe { tree.fix_double_black(splice.parent, splice.dir, splice.child) }
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
        // Missing children count as black.
        let left = left.unwrap_or(1);
        let right = right.unwrap_or(1);
        assert_eq!(left, right, "black-heights of sibling subtrees differ");

        unsafe {
            let links = tree.links(node);
            match links.meta() {
                Color::Red => {
                    assert!(
                        !tree.is_red(links.left()) && !tree.is_red(links.right()),
                        "red node has a red child"
                    );
                    left
                }
                Color::Black => left + 1,
            }
        }
    }

    unsafe fn verify_root<T>(tree: &Tree<T, Self>, root: NonNull<T>)
    where
        T: TreeNode<Links<T, Self>> + ?Sized,
    {
        assert_eq!(unsafe { tree.meta(root) }, Color::Black, "root is red");
    }
}

impl<T> Tree<T, RedBlack>
where
    T: TreeNode<Links<T, RedBlack>> + ?Sized,
{
    // Repairs a red `node` whose parent may also be red.
    unsafe fn fix_red_red(&mut self, node: NonNull<T>) {
        let mut x = node;

        unsafe {
            loop {
                let Some(parent) = self.links(x).parent() else {
                    // `x` is the root.
                    self.set_meta(x, Color::Black);
                    return;
                };

                if !self.is_red(Some(parent)) {
                    return;
                }

                let Some(grandparent) = self.links(parent).parent() else {
                    // A red root. Painting it black adds one to every black-height.
                    self.set_meta(parent, Color::Black);
                    return;
                };

                let parent_dir = self.which_child(grandparent, parent);
                let uncle = self.links(grandparent).child(!parent_dir);

                if let Some(uncle) = uncle.filter(|&u| self.is_red(Some(u))) {
                    // Push the grandparent's blackness down one level and retry from there.
                    self.set_meta(parent, Color::Black);
                    self.set_meta(uncle, Color::Black);
                    self.set_meta(grandparent, Color::Red);
                    x = grandparent;
                    continue;
                }

                // Black uncle: rotate so that a black node sits above `x` and the old
                // grandparent, which both become red.
                let top = if self.which_child(parent, x) == parent_dir {
                    self.rotate_at(grandparent, parent);
                    parent
                } else {
                    self.rotate_twice_at(grandparent, parent, x);
                    x
                };

                self.set_meta(top, Color::Black);
                self.set_meta(grandparent, Color::Red);
                return;
            }
        }
    }

    // Repairs the black-height deficit of the subtree at the `dir` side of `opt_parent`, whose
    // root is `x`.
    unsafe fn fix_double_black(&mut self, mut opt_parent: Link<T>, mut dir: Dir, mut x: Link<T>) {
        unsafe {
            while let Some(parent) = opt_parent {
                if self.is_red(x) {
                    break;
                }

                let mut sibling = self
                    .links(parent)
                    .child(!dir)
                    .expect("doubly black node must have a sibling");

                if self.is_red(Some(sibling)) {
                    // Rotate the red sibling above the parent. `x` gets a black sibling and a red
                    // parent.
                    self.set_meta(sibling, Color::Black);
                    self.set_meta(parent, Color::Red);
                    self.rotate_at(parent, sibling);

                    sibling = self
                        .links(parent)
                        .child(!dir)
                        .expect("red sibling must have black children");
                }

                let near = self.links(sibling).child(dir);
                let far = self.links(sibling).child(!dir);

                if !self.is_red(near) && !self.is_red(far) {
                    // Take one black from both sides and move the deficit up.
                    self.set_meta(sibling, Color::Red);

                    x = Some(parent);
                    opt_parent = self.links(parent).parent();
                    if let Some(grandparent) = opt_parent {
                        dir = self.which_child(grandparent, parent);
                    }
                    continue;
                }

                if !self.is_red(far) {
                    // Red near nephew: turn it into a red far nephew.
                    let near = near.expect("red nephew must exist");
                    self.set_meta(near, Color::Black);
                    self.set_meta(sibling, Color::Red);
                    self.rotate_at(sibling, near);
                    sibling = near;
                }

                // Red far nephew: the sibling takes the parent's place and color, and both of its
                // new children are black. This absorbs the deficit.
                let far = self
                    .links(sibling)
                    .child(!dir)
                    .expect("red nephew must exist");

                self.set_meta(sibling, self.meta(parent));
                self.set_meta(parent, Color::Black);
                self.set_meta(far, Color::Black);
                self.rotate_at(parent, sibling);
                return;
            }

            // Either `x` is red, or it is the root. Painting it black settles the deficit.
            if let Some(x) = x {
                self.set_meta(x, Color::Black);
            }
        }
    }

    #[inline]
    unsafe fn is_red(&self, node: Link<T>) -> bool {
        node.is_some_and(|n| unsafe { self.meta(n) } == Color::Red)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::prelude::v1::*;

    use super::*;
    use crate::model::TestNode;

    fn tree_of(keys: &[u32]) -> Tree<TestNode<RedBlack>, RedBlack> {
        let mut tree = Tree::new();

        for &key in keys {
            tree.insert(TestNode::new(key));
            tree.assert_invariants();
        }

        tree
    }

    #[test]
    fn scenario_root_black_no_red_red() {
        let tree = tree_of(&[5, 1, 9, 3, 7]);

        let root = tree.root.expect("tree is not empty");
        assert_eq!(unsafe { tree.meta(root) }, Color::Black);
        assert_eq!(
            tree.iter().map(|node| node.key).collect::<Vec<_>>(),
            vec![1, 3, 5, 7, 9]
        );
    }

    #[test]
    fn red_uncle_recolors() {
        // 1 and 9 are red children of a black 5; inserting 3 recolors them black.
        let tree = tree_of(&[5, 1, 9, 3]);

        let root = tree.root.expect("tree is not empty");
        unsafe {
            let left = tree.links(root).left().expect("root has a left child");
            let right = tree.links(root).right().expect("root has a right child");
            assert_eq!(tree.meta(left), Color::Black);
            assert_eq!(tree.meta(right), Color::Black);
        }
    }

    #[test]
    fn remove_leaves_and_inner_nodes() {
        let mut tree = tree_of(&[5, 1, 9, 3, 7, 11, 13]);

        for key in [1u32, 3, 5, 7] {
            assert!(tree.remove(&key).is_some());
            tree.assert_invariants();
        }

        assert_eq!(
            tree.iter().map(|node| node.key).collect::<Vec<_>>(),
            vec![9, 11, 13]
        );
    }

    #[test]
    fn drain_in_every_direction() {
        let keys: Vec<u32> = (0..64).map(|i| (i * 37) % 64).collect();

        let mut tree = tree_of(&keys);
        while tree.pop_first().is_some() {
            tree.assert_invariants();
        }

        let mut tree = tree_of(&keys);
        while tree.pop_last().is_some() {
            tree.assert_invariants();
        }

        let mut tree = tree_of(&keys);
        for key in keys.iter().rev() {
            assert!(tree.remove(key).is_some());
            tree.assert_invariants();
        }
        assert!(tree.is_empty());
    }
}
