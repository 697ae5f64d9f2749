use core::iter::FusedIterator;

use crate::{Balance, Dir, Link, Links, Tree, TreeNode};

#[derive(Copy, Clone)]
enum CameFrom {
    Parent,
    LeftChild,
    Here,
    RightChild,
}

/// An iterator over the elements of a [`Tree`], in ascending key order.
///
/// Created by [`Tree::iter`].
pub struct Iter<'tree, T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    tree: &'tree Tree<T, B>,

    front_cur: Link<T>,
    front_from: CameFrom,

    len: usize,
}

impl<'tree, T, B> Iter<'tree, T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    pub(crate) fn new(tree: &'tree Tree<T, B>) -> Self {
        Iter {
            tree,

            front_cur: tree.root,
            front_from: CameFrom::Parent,
            len: tree.len(),
        }
    }
}

impl<'tree, T, B> Iterator for Iter<'tree, T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let mut cur = self.front_cur?;

        loop {
            match self.front_from {
                CameFrom::Parent => {
                    // Upon entering a new subtree, find the minimum element.
                    while let Some(left) = unsafe { self.tree.links(cur).left() } {
                        cur = left;
                    }

                    // Once the minimum is found, its (empty) left subtree has been exhausted.
                    self.front_from = CameFrom::LeftChild;
                }

                CameFrom::LeftChild => {
                    // The left subtree has been exhausted, so this node is up next. Save off the
                    // iterator state and return it.
                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::Here;
                    self.len -= 1;

                    return Some(unsafe { cur.as_ref() });
                }

                CameFrom::Here => {
                    // The current node was just yielded.
                    if let Some(right) = unsafe { self.tree.links(cur).right() } {
                        // If the right subtree is not empty, go there.
                        self.front_from = CameFrom::Parent;

                        cur = right;
                    } else if let Some(parent) = unsafe { self.tree.links(cur).parent() } {
                        // Otherwise, ascend one level.
                        self.front_from = match unsafe { self.tree.which_child(parent, cur) } {
                            Dir::Left => CameFrom::LeftChild,
                            Dir::Right => CameFrom::RightChild,
                        };

                        cur = parent;
                    } else {
                        // The root was yielded and has no right subtree.
                        debug_assert_eq!(self.len, 0);
                        self.front_cur = None;
                        return None;
                    }
                }

                CameFrom::RightChild => {
                    // Ascend until we find the successor element.
                    while let Some(parent) = unsafe { self.tree.links(cur).parent() } {
                        let dir = unsafe { self.tree.which_child(parent, cur) };
                        cur = parent;

                        if dir == Dir::Left {
                            break;
                        }
                    }

                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::LeftChild;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T, B> ExactSizeIterator for Iter<'_, T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
}

impl<T, B> FusedIterator for Iter<'_, T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
}

impl<T, B> Clone for Iter<'_, T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front_cur: self.front_cur,
            front_from: self.front_from,
            len: self.len,
        }
    }
}
