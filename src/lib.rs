//! Intrusive binary search trees with interchangeable balancing strategies.
//!
//! A [`Tree`] links together nodes that embed their own [`Links`]. How the tree keeps itself
//! shallow is chosen by a type parameter implementing [`Balance`]:
//!
//! - [`Avl`]: height-balanced; sibling subtree heights differ by at most one.
//! - [`RedBlack`]: color-balanced; equal black-height on every path, no red-red edges.
//! - [`Splay`]: access-balanced; every access moves the touched node to the root.
//! - [`Wavl`]: rank-balanced weak AVL tree; all rank differences are 1 or 2.
//! - [`Ravl`]: relaxed AVL tree; ranks are maintained on insertion only, deletion never
//!   rebalances.
//!
//! [`TreeMap`] and [`TreeSet`] wrap a tree of boxed nodes behind an ordered-container API.

// Conventions used in comments:
// - The parent of a node `x` is denoted `p(x)`; its height `h(x)` and its rank `r(x)`.
// - A missing child has height -1 and rank -1.
// - Directions are symmetric. Code is written for one side and mirrored with `!dir`.
//
// Equal keys:
// Insertion descends left past every node whose key is not less than the new key, so duplicates
// collect in left subtrees. Rotations can later move an equal key to either side of its twin, so
// the ordering invariant is "in-order keys are non-decreasing", and lookups return the first equal
// key found on the search path.

extern crate alloc;

use alloc::vec::Vec;
use core::{
    borrow::Borrow,
    cell::UnsafeCell,
    cmp::Ordering,
    fmt,
    marker::{PhantomData, PhantomPinned},
    mem,
    ops::Not,
    pin::Pin,
    ptr::NonNull,
};

use cordyceps::Linked;

pub mod balance;
mod error;
mod iter;
pub mod map;
pub mod set;

#[cfg(any(test, feature = "model"))]
pub mod model;


use balance::Splice;

pub use balance::{Avl, Balance, Color, Ravl, RedBlack, Splay, Wavl};
pub use error::Error;
pub use iter::Iter;
pub use map::{AvlMap, RavlMap, RbMap, SplayMap, TreeMap, WavlMap};
pub use set::{AvlSet, RavlSet, RbSet, SplaySet, TreeSet, WavlSet};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
}

/// An intrusive binary search tree, balanced by the strategy `B`.
pub struct Tree<T, B = Wavl>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    root: Link<T>,
    len: usize,
    _balance: PhantomData<B>,
}

/// The intrusive links of a tree node, including the balancing metadata of strategy `B`.
pub struct Links<T: ?Sized, B: Balance> {
    inner: UnsafeCell<LinksInner<T, B::Meta>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized, M> {
    parent: Link<T>,
    children: [Link<T>; 2],
    meta: M,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T, B> Tree<T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    /// Returns a new empty tree.
    pub const fn new() -> Tree<T, B> {
        Tree {
            root: None,
            len: 0,
            _balance: PhantomData,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Panics if any structural or balancing invariant of the tree does not hold.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree has a nonzero length");
            return;
        };

        unsafe {
            assert_eq!(self.links(root).parent(), None, "root has a parent");
            B::verify_root(self, root);
        }

        // Breadth-first listing of every node with the positions of its children. Children always
        // come after their parent, so walking the list backwards visits subtrees bottom-up.
        let mut nodes: Vec<(NonNull<T>, [Option<usize>; 2])> = Vec::with_capacity(self.len);
        nodes.push((root, [None; 2]));

        let mut idx = 0;
        while idx < nodes.len() {
            let node = nodes[idx].0;

            for dir in [Dir::Left, Dir::Right] {
                let Some(child) = (unsafe { self.links(node).child(dir) }) else {
                    continue;
                };

                unsafe {
                    // Ensure child's parent link points to this node.
                    assert_eq!(
                        self.links(child).parent(),
                        Some(node),
                        "child's parent pointer does not point at its parent"
                    );

                    let order = child.as_ref().key().cmp(node.as_ref().key());
                    match dir {
                        Dir::Left => assert_ne!(order, Ordering::Greater, "left child is greater"),
                        Dir::Right => assert_ne!(order, Ordering::Less, "right child is less"),
                    }
                }

                nodes.push((child, [None; 2]));
                nodes[idx].1[dir as usize] = Some(nodes.len() - 1);
            }

            idx += 1;
        }

        assert_eq!(nodes.len(), self.len, "length does not match the number of nodes");

        let mut measures = alloc::vec![0; nodes.len()];
        for idx in (0..nodes.len()).rev() {
            let (node, [left, right]) = nodes[idx];
            measures[idx] = unsafe {
                B::verify(
                    self,
                    node,
                    left.map(|l| measures[l]),
                    right.map(|r| measures[r]),
                )
            };
        }

        let mut keys = self.iter().map(|node| node.key());
        if let Some(mut prev) = keys.next() {
            for key in keys {
                assert!(prev <= key, "in-order keys are not sorted");
                prev = key;
            }
        }
    }

    /// Returns a reference to an element matching `key`.
    ///
    /// This never restructures the tree, whatever the balancing strategy. See [`Tree::search`].
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to an element matching `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    /// Returns `true` if the tree contains an element matching `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Looks up an element matching `key`, letting the balancing strategy react to the access.
    ///
    /// For [`Splay`] trees a hit moves the element to the root. Other strategies behave exactly
    /// like [`Tree::get`].
    pub fn search<Q>(&mut self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;

        unsafe {
            B::accessed(self, ptr);
            Some(Pin::new_unchecked(ptr.as_ref()))
        }
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }
    }

    /// Returns the element at the root of the tree.
    pub fn root(&self) -> Option<Pin<&T>> {
        self.root
            .map(|root| unsafe { Pin::new_unchecked(root.as_ref()) })
    }

    /// Returns the number of edges on the longest path from the root to a leaf, or `None` if the
    /// tree is empty.
    ///
    /// This walks every node, level by level, and does not restructure the tree.
    pub fn height(&self) -> Option<usize> {
        let mut level: Vec<NonNull<T>> = self.root.into_iter().collect();
        let mut height = None;

        while !level.is_empty() {
            height = Some(height.map_or(0, |h| h + 1));

            let mut next = Vec::with_capacity(level.len() * 2);
            for node in level {
                let links = unsafe { self.links(node) };
                next.extend(links.left());
                next.extend(links.right());
            }
            level = next;
        }

        height
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first_raw()
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last_raw()
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.first_raw()?;
        Some(unsafe { self.remove_at(first) })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.last_raw()?;
        Some(unsafe { self.remove_at(last) })
    }

    fn first_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.min_in_subtree(root).0 })
    }

    fn last_raw(&self) -> Link<T> {
        let mut cur = self.root?;

        while let Some(right) = unsafe { self.links(cur).right() } {
            cur = right;
        }

        Some(cur)
    }

    /// Returns an iterator over the elements of the tree, in ascending key order.
    pub fn iter(&self) -> Iter<'_, T, B> {
        Iter::new(self)
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { self.links_mut(node).set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            if cfg!(debug_assertions) {
                assert_eq!(
                    self.links(parent).child(dir),
                    Some(old_child),
                    "`old_child` must be a child of `parent`"
                );

                if new_child.is_some() {
                    assert_ne!(
                        self.links(parent).child(!dir),
                        new_child,
                        "`new_child` must not be a child of `parent`"
                    );
                }
            }

            self.links_mut(parent).set_child(dir, new_child);
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // Balancing metadata of the affected nodes is not updated.
    pub(crate) unsafe fn rotate_at(&mut self, down: NonNull<T>, up: NonNull<T>) {
        unsafe {
            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let dir = if self.links(down).right() == Some(up) {
                Dir::Left
            } else {
                Dir::Right
            };

            debug_assert_ne!(self.root, Some(up), "cannot rotate the root upward");

            let across = self.links(up).child(dir);
            self.links_mut(down).set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            self.links_mut(up).set_child(dir, Some(down));
            let parent = self.links_mut(down).set_parent(Some(up));
            self.links_mut(up).set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));
        }
    }

    // Performs a double rotation, moving the zig-zag grandchild `up` above both its parent
    // `down_first` and its grandparent `down_second`.
    //
    // Balancing metadata of the affected nodes is not updated.
    pub(crate) unsafe fn rotate_twice_at(
        &mut self,
        down_second: NonNull<T>,
        down_first: NonNull<T>,
        up: NonNull<T>,
    ) {
        unsafe {
            let dir = if self.links(down_first).right() == Some(up) {
                Dir::Right
            } else {
                Dir::Left
            };

            debug_assert_eq!(self.links(down_second).child(!dir), Some(down_first));

            let across_first = self.links(up).child(!dir);
            let across_second = self.links(up).child(dir);

            self.maybe_set_parent(across_first, Some(down_first));

            self.links_mut(down_first).set_child(dir, across_first);
            self.links_mut(down_first).set_parent(Some(up));

            self.maybe_set_parent(across_second, Some(down_second));

            self.links_mut(down_second).set_child(!dir, across_second);
            let parent = self.links_mut(down_second).set_parent(Some(up));

            self.links_mut(up).set_parent(parent);
            self.links_mut(up).set_child(!dir, Some(down_first));
            self.links_mut(up).set_child(dir, Some(down_second));

            self.replace_child_or_set_root(parent, down_second, Some(up));
        }
    }

    pub(crate) unsafe fn sibling(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            let parent = self.links(node).parent()?;
            let dir = self.which_child(parent, node);
            self.links(parent).child(!dir)
        }
    }

    /// Inserts an item into the tree.
    ///
    /// Items whose keys compare equal to existing keys are kept alongside them.
    ///
    /// This operation completes in _O(log(n))_ time, amortized for [`Splay`] trees.
    pub fn insert(&mut self, item: T::Handle) {
        let ptr = T::into_ptr(item);

        unsafe { self.links_mut(ptr).clear() };

        let Some(mut parent) = self.root else {
            // Tree is empty. Set `item` as the root.
            self.root = Some(ptr);
            self.len += 1;
            unsafe { B::inserted(self, ptr) };
            return;
        };

        // Descend the tree, looking for a free child slot.
        loop {
            let dir = match unsafe { parent.as_ref().key().cmp(ptr.as_ref().key()) } {
                Ordering::Less => Dir::Right,
                Ordering::Equal | Ordering::Greater => Dir::Left,
            };

            unsafe {
                match self.links(parent).child(dir) {
                    // Descend.
                    Some(child) => parent = child,

                    // Set `item` as child.
                    None => {
                        self.links_mut(parent).set_child(dir, Some(ptr));
                        self.links_mut(ptr).set_parent(Some(parent));
                        break;
                    }
                }
            }
        }

        self.len += 1;
        unsafe { B::inserted(self, ptr) };
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> (NonNull<T>, Option<NonNull<T>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { self.links(cur).left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    /// Removes an element matching `key` from the tree and returns it.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        // There are three possible cases:
        //
        // 1. `node` has two children.
        //
        //    In this case `node`'s successor[^1] is removed from its position and assumes `node`'s
        //    place and metadata. The successor's right child is elevated to replace it.
        //
        //    The successor by definition has no left child, so the position it vacates is handled
        //    exactly like case 2 or 3.
        //
        // 2. `node` has one child, which is elevated into `node`'s place.
        //
        // 3. `node` is a leaf, and its parent loses a child.
        //
        // In every case exactly one position in the tree loses a node that had at most one child.
        // That position is reported to the balancing strategy as a `Splice`, along with the
        // metadata of the node that left it.
        //
        // [^1]: The successor of a node `a` is the least node in `a`'s right subtree.

        let splice = unsafe {
            let parent = self.links(node).parent();
            let left = self.links(node).left();
            let right = self.links(node).right();
            let meta = self.links(node).meta();

            match (left, right) {
                (Some(left), Some(right)) => {
                    let (successor, successor_parent) = self.min_in_subtree(right);
                    let successor_right = self.links(successor).right();
                    let lost = self.links(successor).meta();

                    let (splice_parent, dir) = match successor_parent {
                        Some(successor_parent) => {
                            // Elevate the successor's right child to replace it.
                            self.replace_child(successor_parent, successor, successor_right);
                            self.maybe_set_parent(successor_right, Some(successor_parent));
                            self.links_mut(successor).set_right(Some(right));
                            self.links_mut(right).set_parent(Some(successor));

                            (successor_parent, Dir::Left)
                        }

                        // The successor is `right` itself and keeps its right subtree.
                        None => (successor, Dir::Right),
                    };

                    self.replace_child_or_set_root(parent, node, Some(successor));

                    // Transfer the position and metadata of `node` to `successor`.
                    self.links_mut(successor).set_parent(parent);
                    self.links_mut(successor).set_meta(meta);
                    self.links_mut(successor).set_left(Some(left));
                    self.links_mut(left).set_parent(Some(successor));

                    Splice {
                        parent: Some(splice_parent),
                        dir,
                        child: successor_right,
                        lost,
                    }
                }

                (Some(child), None) | (None, Some(child)) => {
                    let dir = parent.map_or(Dir::Left, |p| self.which_child(p, node));

                    self.replace_child_or_set_root(parent, node, Some(child));
                    self.links_mut(child).set_parent(parent);

                    Splice {
                        parent,
                        dir,
                        child: Some(child),
                        lost: meta,
                    }
                }

                (None, None) => {
                    let dir = parent.map_or(Dir::Left, |p| self.which_child(p, node));

                    self.replace_child_or_set_root(parent, node, None);

                    Splice {
                        parent,
                        dir,
                        child: None,
                        lost: meta,
                    }
                }
            }
        };

        unsafe {
            self.links_mut(node).clear();
            self.len -= 1;

            B::removed(self, splice);

            T::from_ptr(node)
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| self.links(cur).parent());

                let right = self.links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                self.links_mut(cur).clear();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    #[inline]
    pub(crate) unsafe fn links<'a>(&self, node: NonNull<T>) -> &'a Links<T, B> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    pub(crate) unsafe fn links_mut<'a>(&mut self, node: NonNull<T>) -> &'a mut Links<T, B> {
        unsafe { T::links(node).as_mut() }
    }

    #[inline]
    pub(crate) unsafe fn meta(&self, node: NonNull<T>) -> B::Meta {
        unsafe { self.links(node).meta() }
    }

    #[inline]
    pub(crate) unsafe fn set_meta(&mut self, node: NonNull<T>, meta: B::Meta) {
        unsafe { self.links_mut(node).set_meta(meta) }
    }

    pub(crate) unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { self.links(parent).left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl<T, B> Default for Tree<T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, B> fmt::Debug for Tree<T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    T::Key: fmt::Debug,
    B: Balance,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|node| node.key())).finish()
    }
}

impl<T, B> Drop for Tree<T, B>
where
    T: TreeNode<Links<T, B>> + ?Sized,
    B: Balance,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized, B: Balance> Links<T, B> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                meta: B::LEAF,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn meta(&self) -> B::Meta {
        unsafe { (*self.inner.get()).meta }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_meta(&mut self, meta: B::Meta) {
        self.inner.get_mut().meta = meta;
    }

    // Resets the links to those of a detached leaf.
    #[inline]
    fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.meta = B::LEAF;
    }
}

impl<T: ?Sized, B: Balance> Default for Links<T, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized, B: Balance> fmt::Debug for Links<T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("meta", &self.meta())
            .finish()
    }
}
