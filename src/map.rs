//! An ordered map over a [`Tree`] of boxed nodes.

use alloc::boxed::Box;
use core::{
    borrow::Borrow,
    fmt,
    iter::FusedIterator,
    marker::PhantomPinned,
    pin::Pin,
    ptr::{self, NonNull},
};

use cordyceps::Linked;

use crate::{Avl, Balance, Error, Links, Ravl, RedBlack, Splay, Tree, TreeNode, Wavl};

/// An ordered map based on a binary search tree balanced by the strategy `B`.
///
/// Keys that compare equal are all kept: inserting a key that is already present adds another
/// entry rather than replacing the value, and each removal takes out one matching entry.
pub struct TreeMap<K: Ord, V, B: Balance = Wavl> {
    tree: Tree<MapNode<K, V, B>, B>,
}

/// A [`TreeMap`] balanced as an AVL tree.
pub type AvlMap<K, V> = TreeMap<K, V, Avl>;

/// A [`TreeMap`] balanced as a red-black tree.
pub type RbMap<K, V> = TreeMap<K, V, RedBlack>;

/// A [`TreeMap`] balanced as a splay tree.
pub type SplayMap<K, V> = TreeMap<K, V, Splay>;

/// A [`TreeMap`] balanced as a WAVL tree.
pub type WavlMap<K, V> = TreeMap<K, V, Wavl>;

/// A [`TreeMap`] balanced as a relaxed AVL tree.
pub type RavlMap<K, V> = TreeMap<K, V, Ravl>;

struct MapNode<K, V, B: Balance> {
    links: Links<MapNode<K, V, B>, B>,
    key: K,
    value: V,
    _unpin: PhantomPinned,
}

unsafe impl<K, V, B: Balance> Linked<Links<MapNode<K, V, B>, B>> for MapNode<K, V, B> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V, B>, B>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord, V, B: Balance> TreeNode<Links<MapNode<K, V, B>, B>> for MapNode<K, V, B> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl<K, V, B: Balance> MapNode<K, V, B> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        })
    }

    #[inline]
    fn key_value(node: Pin<&Self>) -> (&K, &V) {
        let node = Pin::get_ref(node);
        (&node.key, &node.value)
    }

    #[inline]
    #[allow(clippy::boxed_local)]
    fn into_parts(node: Box<Self>) -> (K, V) {
        let MapNode { key, value, .. } = *node;
        (key, value)
    }
}

impl<K: Ord, V, B: Balance> TreeMap<K, V, B> {
    /// Creates a new, empty `TreeMap`.
    pub const fn new() -> Self {
        Self { tree: Tree::new() }
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// Existing entries with an equal key are kept.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.tree.insert(MapNode::new(key, value));
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    ///
    /// This never restructures the map. See [`TreeMap::search`].
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and the value associated with `key`.
    #[inline]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(MapNode::key_value)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get_mut(key)
            // SAFETY: Pinning is not structural for `node.value`.
            .map(|node| unsafe { &mut node.get_unchecked_mut().value })
    }

    /// Looks up `key`, letting the balancing strategy react to the access.
    ///
    /// For [`SplayMap`] a hit moves the entry to the root of the tree.
    #[inline]
    pub fn search<Q>(&mut self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.search(key).map(MapNode::key_value)
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(MapNode::key_value)
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(MapNode::key_value)
    }

    /// Returns the minimum key in the map, or [`Error::Empty`] if the map is empty.
    #[inline]
    pub fn minimum(&self) -> Result<&K, Error> {
        self.first_key_value().map(|(k, _)| k).ok_or(Error::Empty)
    }

    /// Returns the maximum key in the map, or [`Error::Empty`] if the map is empty.
    #[inline]
    pub fn maximum(&self) -> Result<&K, Error> {
        self.last_key_value().map(|(k, _)| k).ok_or(Error::Empty)
    }

    /// Removes and returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(MapNode::into_parts)
    }

    /// Removes and returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(MapNode::into_parts)
    }

    /// Removes one entry matching `key` from the map and returns its value.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes one entry matching `key` from the map and returns the stored key and value.
    #[inline]
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(MapNode::into_parts)
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns an iterator over the entries of the map, sorted by key.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, V, B> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Returns an iterator over the keys of the map, in sorted order.
    #[inline]
    pub fn keys(&self) -> Keys<'_, K, V, B> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map, in order by key.
    #[inline]
    pub fn values(&self) -> Values<'_, K, V, B> {
        Values { inner: self.iter() }
    }

    /// Returns the number of edges on the longest path from the root to a leaf of the underlying
    /// tree, or `None` if the map is empty.
    #[inline]
    pub fn height(&self) -> Option<usize> {
        self.tree.height()
    }

    /// Panics if any structural or balancing invariant of the underlying tree does not hold.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

macro_rules! impl_root_rank {
    ($($balance:ty),*) => {
        $(
            impl<K: Ord, V> TreeMap<K, V, $balance> {
                /// Returns the rank of the root of the underlying tree, or `None` if the map is
                /// empty.
                #[inline]
                pub fn rank(&self) -> Option<i8> {
                    self.tree.rank()
                }
            }
        )*
    };
}

impl_root_rank!(Wavl, Ravl);

impl<K: Ord, V, B: Balance> Default for TreeMap<K, V, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, B> fmt::Debug for TreeMap<K, V, B>
where
    K: Ord + fmt::Debug,
    V: fmt::Debug,
    B: Balance,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V, B: Balance> FromIterator<(K, V)> for TreeMap<K, V, B> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TreeMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V, B: Balance> Extend<(K, V)> for TreeMap<K, V, B> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K: Ord, V, B: Balance> IntoIterator for &'a TreeMap<K, V, B> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`TreeMap`], sorted by key.
pub struct Iter<'a, K: Ord, V, B: Balance> {
    inner: crate::Iter<'a, MapNode<K, V, B>, B>,
}

impl<'a, K: Ord, V, B: Balance> Iterator for Iter<'a, K, V, B> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V, B: Balance> ExactSizeIterator for Iter<'_, K, V, B> {}

impl<K: Ord, V, B: Balance> FusedIterator for Iter<'_, K, V, B> {}

impl<K: Ord, V, B: Balance> Clone for Iter<'_, K, V, B> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

/// An iterator over the keys of a [`TreeMap`], in sorted order.
pub struct Keys<'a, K: Ord, V, B: Balance> {
    inner: Iter<'a, K, V, B>,
}

impl<'a, K: Ord, V, B: Balance> Iterator for Keys<'a, K, V, B> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V, B: Balance> ExactSizeIterator for Keys<'_, K, V, B> {}

impl<K: Ord, V, B: Balance> FusedIterator for Keys<'_, K, V, B> {}

impl<K: Ord, V, B: Balance> Clone for Keys<'_, K, V, B> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

/// An iterator over the values of a [`TreeMap`], in order by key.
pub struct Values<'a, K: Ord, V, B: Balance> {
    inner: Iter<'a, K, V, B>,
}

impl<'a, K: Ord, V, B: Balance> Iterator for Values<'a, K, V, B> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V, B: Balance> ExactSizeIterator for Values<'_, K, V, B> {}

impl<K: Ord, V, B: Balance> FusedIterator for Values<'_, K, V, B> {}

impl<K: Ord, V, B: Balance> Clone for Values<'_, K, V, B> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{format, prelude::v1::*};

    use super::*;

    fn sample<B: Balance>() -> TreeMap<u32, &'static str, B> {
        [(3, "c"), (1, "a"), (4, "d"), (2, "b")].into_iter().collect()
    }

    fn lookups<B: Balance>() {
        let mut map = sample::<B>();
        map.assert_invariants();

        assert_eq!(map.len(), 4);
        assert_eq!(map.get(&2), Some(&"b"));
        assert_eq!(map.get(&5), None);
        assert_eq!(map.get_key_value(&4), Some((&4, &"d")));
        assert!(map.contains_key(&1));
        assert_eq!(map.search(&3), Some((&3, &"c")));
        assert_eq!(map.search(&0), None);
        map.assert_invariants();

        assert_eq!(map.first_key_value(), Some((&1, &"a")));
        assert_eq!(map.last_key_value(), Some((&4, &"d")));
        assert_eq!(map.minimum(), Ok(&1));
        assert_eq!(map.maximum(), Ok(&4));

        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        assert_eq!(map.iter().len(), 4);
    }

    fn mutations<B: Balance>() {
        let mut map = sample::<B>();

        *map.get_mut(&2).expect("key is present") = "B";
        assert_eq!(map.get(&2), Some(&"B"));

        assert_eq!(map.remove(&2), Some("B"));
        assert_eq!(map.remove(&2), None);
        assert_eq!(map.remove_entry(&3), Some((3, "c")));
        map.assert_invariants();

        assert_eq!(map.pop_first(), Some((1, "a")));
        assert_eq!(map.pop_last(), Some((4, "d")));
        assert!(map.is_empty());
        assert_eq!(map.pop_first(), None);
        assert_eq!(map.minimum(), Err(Error::Empty));
        assert_eq!(map.maximum(), Err(Error::Empty));

        map.extend([(7, "g"), (5, "e")]);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.iter().next(), None);
    }

    fn duplicate_keys<B: Balance>() {
        let mut map: TreeMap<u32, u32, B> = TreeMap::new();
        for value in 0..4 {
            map.insert(1, value);
            map.insert(0, value);
            map.insert(2, value);
        }
        map.assert_invariants();

        assert_eq!(map.len(), 12);
        assert_eq!(
            map.keys().copied().collect::<Vec<_>>(),
            vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]
        );

        let mut removed = Vec::new();
        while let Some(value) = map.remove(&1) {
            removed.push(value);
            map.assert_invariants();
        }
        removed.sort_unstable();
        assert_eq!(removed, vec![0, 1, 2, 3]);
        assert_eq!(map.len(), 8);
    }

    macro_rules! map_tests {
        ($($name:ident => $balance:ty),* $(,)?) => {
            $(
                mod $name {
                    use super::*;

                    #[test]
                    fn lookups() {
                        super::lookups::<$balance>();
                    }

                    #[test]
                    fn mutations() {
                        super::mutations::<$balance>();
                    }

                    #[test]
                    fn duplicate_keys() {
                        super::duplicate_keys::<$balance>();
                    }
                }
            )*
        };
    }

    map_tests! {
        avl => Avl,
        red_black => RedBlack,
        splay => Splay,
        wavl => Wavl,
        ravl => Ravl,
    }

    #[test]
    fn debug_lists_entries_in_order() {
        let map = sample::<Wavl>();
        assert_eq!(format!("{map:?}"), r#"{1: "a", 2: "b", 3: "c", 4: "d"}"#);
    }

    #[test]
    fn height_and_root_rank() {
        // 3 over 1 and 4, with 2 below 1.
        assert_eq!(sample::<Avl>().height(), Some(2));
        assert_eq!(sample::<RedBlack>().height(), Some(2));
        assert_eq!(sample::<Wavl>().rank(), Some(2));
        assert_eq!(sample::<Ravl>().rank(), Some(2));

        let mut map = sample::<Wavl>();
        assert_eq!(map.height(), Some(2));
        map.clear();
        assert_eq!(map.height(), None);
        assert_eq!(map.rank(), None);
    }

    #[test]
    fn borrowed_lookup() {
        let mut map: RbMap<String, usize> = RbMap::new();
        for word in ["pear", "apple", "fig"] {
            map.insert(word.to_string(), word.len());
        }

        assert_eq!(map.get("apple"), Some(&5));
        assert_eq!(map.remove("fig"), Some(3));
        assert_eq!((&map).into_iter().count(), 2);
    }
}
