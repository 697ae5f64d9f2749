//! An ordered set over a [`TreeMap`] with unit values.

use core::{borrow::Borrow, fmt, iter::FusedIterator};

use crate::{map, Avl, Balance, Error, Ravl, RedBlack, Splay, TreeMap, Wavl};

/// An ordered set based on a binary search tree balanced by the strategy `B`.
///
/// Equal keys are all kept, so the set behaves as a sorted multiset.
pub struct TreeSet<K: Ord, B: Balance = Wavl> {
    map: TreeMap<K, (), B>,
}

/// A [`TreeSet`] balanced as an AVL tree.
pub type AvlSet<K> = TreeSet<K, Avl>;

/// A [`TreeSet`] balanced as a red-black tree.
pub type RbSet<K> = TreeSet<K, RedBlack>;

/// A [`TreeSet`] balanced as a splay tree.
pub type SplaySet<K> = TreeSet<K, Splay>;

/// A [`TreeSet`] balanced as a WAVL tree.
pub type WavlSet<K> = TreeSet<K, Wavl>;

/// A [`TreeSet`] balanced as a relaxed AVL tree.
pub type RavlSet<K> = TreeSet<K, Ravl>;

impl<K: Ord, B: Balance> TreeSet<K, B> {
    /// Creates a new, empty `TreeSet`.
    pub const fn new() -> Self {
        Self {
            map: TreeMap::new(),
        }
    }

    /// Returns `true` if the set contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of elements in the set, counting duplicates.
    pub const fn len(&self) -> usize {
        self.map.len()
    }

    /// Adds a key to the set.
    #[inline]
    pub fn insert(&mut self, key: K) {
        self.map.insert(key, ());
    }

    /// Returns `true` if the set contains a key equal to `key`.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Returns a reference to a stored key equal to `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get_key_value(key).map(|(k, _)| k)
    }

    /// Looks up `key`, letting the balancing strategy react to the access.
    ///
    /// For [`SplaySet`] a hit moves the key to the root of the tree.
    #[inline]
    pub fn search<Q>(&mut self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.search(key).map(|(k, _)| k)
    }

    /// Removes one key equal to `key`. Returns whether a key was removed.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.take(key).is_some()
    }

    /// Removes and returns one stored key equal to `key`.
    #[inline]
    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove_entry(key).map(|(k, ())| k)
    }

    /// Returns the minimum key in the set.
    #[inline]
    pub fn first(&self) -> Option<&K> {
        self.map.first_key_value().map(|(k, _)| k)
    }

    /// Returns the maximum key in the set.
    #[inline]
    pub fn last(&self) -> Option<&K> {
        self.map.last_key_value().map(|(k, _)| k)
    }

    /// Returns the minimum key in the set, or [`Error::Empty`] if the set is empty.
    #[inline]
    pub fn minimum(&self) -> Result<&K, Error> {
        self.map.minimum()
    }

    /// Returns the maximum key in the set, or [`Error::Empty`] if the set is empty.
    #[inline]
    pub fn maximum(&self) -> Result<&K, Error> {
        self.map.maximum()
    }

    /// Removes and returns the minimum key in the set.
    #[inline]
    pub fn pop_first(&mut self) -> Option<K> {
        self.map.pop_first().map(|(k, ())| k)
    }

    /// Removes and returns the maximum key in the set.
    #[inline]
    pub fn pop_last(&mut self) -> Option<K> {
        self.map.pop_last().map(|(k, ())| k)
    }

    /// Clears the set, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns an iterator over the keys of the set, in ascending order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, K, B> {
        Iter {
            inner: self.map.keys(),
        }
    }

    /// Returns the number of edges on the longest path from the root to a leaf of the underlying
    /// tree, or `None` if the set is empty.
    #[inline]
    pub fn height(&self) -> Option<usize> {
        self.map.height()
    }

    /// Panics if any structural or balancing invariant of the underlying tree does not hold.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.map.assert_invariants();
    }
}

impl<K: Ord> TreeSet<K, Wavl> {
    /// Returns the rank of the root of the underlying tree, or `None` if the set is empty.
    #[inline]
    pub fn rank(&self) -> Option<i8> {
        self.map.rank()
    }
}

impl<K: Ord> TreeSet<K, Ravl> {
    /// Returns the rank of the root of the underlying tree, or `None` if the set is empty.
    #[inline]
    pub fn rank(&self) -> Option<i8> {
        self.map.rank()
    }
}

impl<K: Ord, B: Balance> Default for TreeSet<K, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, B: Balance> fmt::Debug for TreeSet<K, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord, B: Balance> FromIterator<K> for TreeSet<K, B> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = TreeSet::new();
        set.extend(iter);
        set
    }
}

impl<K: Ord, B: Balance> Extend<K> for TreeSet<K, B> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a, K: Ord, B: Balance> IntoIterator for &'a TreeSet<K, B> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K, B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the keys of a [`TreeSet`], in ascending order.
pub struct Iter<'a, K: Ord, B: Balance> {
    inner: map::Keys<'a, K, (), B>,
}

impl<'a, K: Ord, B: Balance> Iterator for Iter<'a, K, B> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, B: Balance> ExactSizeIterator for Iter<'_, K, B> {}

impl<K: Ord, B: Balance> FusedIterator for Iter<'_, K, B> {}

impl<K: Ord, B: Balance> Clone for Iter<'_, K, B> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{format, prelude::v1::*};

    use super::*;

    #[test]
    fn minimum_of_empty_set_is_an_error() {
        let set: AvlSet<u32> = AvlSet::new();

        assert_eq!(set.minimum(), Err(Error::Empty));
        assert_eq!(set.maximum(), Err(Error::Empty));
        assert_eq!(set.first(), None);
        assert_eq!(set.last(), None);
    }

    #[test]
    fn duplicates_are_adjacent_and_removed_one_at_a_time() {
        let mut set: RbSet<u32> = [5, 3, 5, 1, 5].into_iter().collect();
        set.assert_invariants();
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 5, 5]);

        assert!(set.remove(&5));
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5, 5]);
        assert_eq!(set.take(&5), Some(5));
        assert!(set.remove(&5));
        assert!(!set.remove(&5));
        assert_eq!(set.len(), 2);
        set.assert_invariants();
    }

    #[test]
    fn removing_absent_key_changes_nothing() {
        let mut set: WavlSet<u32> = (0..10).collect();

        assert!(!set.remove(&42));
        assert_eq!(set.len(), 10);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        set.assert_invariants();
    }

    #[test]
    fn splay_search_returns_key() {
        let mut set: SplaySet<&str> = ["b", "a", "c"].into_iter().collect();

        assert_eq!(set.search("a"), Some(&"a"));
        assert_eq!(set.search("z"), None);
        assert!(set.contains("c"));
        assert_eq!(set.get("b"), Some(&"b"));
    }

    #[test]
    fn relaxed_rank_survives_removals() {
        let mut set: RavlSet<u32> = (0..7).collect();
        assert_eq!(set.rank(), Some(2));
        assert_eq!(set.height(), Some(2));

        for key in [0u32, 1, 2, 4, 5, 6] {
            assert!(set.remove(&key));
            set.assert_invariants();
        }

        // Deletions never rebalance, so the lone survivor keeps the root's rank.
        assert_eq!(set.height(), Some(0));
        assert_eq!(set.rank(), Some(2));

        let wavl: WavlSet<u32> = (0..7).collect();
        assert_eq!(wavl.rank(), Some(2));
        assert_eq!(SplaySet::<u32>::new().height(), None);
    }

    #[test]
    fn debug_and_pops() {
        let mut set: RavlSet<i64> = [-1, 4, 2].into_iter().collect();
        assert_eq!(format!("{set:?}"), "{-1, 2, 4}");

        assert_eq!(set.pop_first(), Some(-1));
        assert_eq!(set.pop_last(), Some(4));
        assert_eq!((&set).into_iter().collect::<Vec<_>>(), vec![&2]);

        set.clear();
        assert!(set.is_empty());
    }
}
