//! A reference model for property tests and fuzzing.
//!
//! Random operation sequences are applied to a [`Tree`] and to a sorted `Vec` holding the same
//! keys, and the two are compared after every step.

extern crate std;

use std::{fmt, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{Avl, Balance, Links, Ravl, RedBlack, Splay, Tree, TreeNode, Wavl};

#[repr(C)]
pub struct TestNode<B: Balance> {
    pub links: Links<TestNode<B>, B>,
    pub key: u32,
}

impl<B: Balance> TestNode<B> {
    pub fn new(key: u32) -> Box<TestNode<B>> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

impl<B: Balance> fmt::Debug for TestNode<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestNode")
            .field("links", &self.links)
            .field("key", &self.key)
            .finish()
    }
}

unsafe impl<B: Balance> Linked<Links<TestNode<B>, B>> for TestNode<B> {
    type Handle = Box<TestNode<B>>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode<B>, B>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl<B: Balance> TreeNode<Links<TestNode<B>, B>> for TestNode<B> {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Get(ItemValue),
    Search(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Get(item) => FinalOp::Get(get_value(sorted, item)),
            Op::Search(item) => FinalOp::Search(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Get(u32),
    Search(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::Insert),
        value_strategy().prop_map(Op::Get),
        value_strategy().prop_map(Op::Search),
        value_strategy().prop_map(Op::Remove),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

/// The balancing strategy a fuzz input runs against.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Balancer {
    Avl,
    RedBlack,
    Splay,
    Wavl,
    Ravl,
}

pub fn run_equivalence_with(balancer: Balancer, ops: Vec<Op>) {
    match balancer {
        Balancer::Avl => run_equivalence::<Avl>(ops),
        Balancer::RedBlack => run_equivalence::<RedBlack>(ops),
        Balancer::Splay => run_equivalence::<Splay>(ops),
        Balancer::Wavl => run_equivalence::<Wavl>(ops),
        Balancer::Ravl => run_equivalence::<Ravl>(ops),
    }
}

/// Applies `ops` to a tree balanced by `B` and to a sorted `Vec`, panicking on any disagreement
/// or broken invariant.
pub fn run_equivalence<B: Balance>(ops: Vec<Op>) {
    // Duplicates are kept, so the model is a sorted multiset.
    let mut sorted: Vec<u32> = Vec::with_capacity(ops.len());
    let mut tree: Tree<TestNode<B>, B> = Tree::new();

    fn insert_sorted(v: &mut Vec<u32>, value: u32) {
        let idx = v.partition_point(|&x| x <= value);
        v.insert(idx, value);
    }

    fn remove_sorted(v: &mut Vec<u32>, value: u32) -> Option<u32> {
        let idx = v.binary_search(&value).ok()?;
        Some(v.remove(idx))
    }

    #[inline]
    #[allow(clippy::boxed_local)]
    fn node_key<B: Balance>(node: Box<TestNode<B>>) -> u32 {
        node.key
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted);

        match final_op {
            FinalOp::Insert(value) => {
                insert_sorted(&mut sorted, value);
                tree.insert(TestNode::new(value));
            }

            FinalOp::Get(value) => {
                let from_model = sorted.binary_search(&value).ok().map(|_| value);
                let from_tree = tree.get(&value).map(|node| node.key);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Search(value) => {
                let from_model = sorted.binary_search(&value).ok().map(|_| value);
                let from_tree = tree.search(&value).map(|node| node.key);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(value) => {
                let from_model = remove_sorted(&mut sorted, value);
                let from_tree = tree.remove(&value).map(node_key);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_model = sorted.first().copied();
                let from_tree = tree.first().map(|node| node.key);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_model = (!sorted.is_empty()).then(|| sorted.remove(0));
                let from_tree = tree.pop_first().map(node_key);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_model = sorted.last().copied();
                let from_tree = tree.last().map(|node| node.key);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_model = sorted.pop();
                let from_tree = tree.pop_last().map(node_key);

                assert_eq!(from_model, from_tree, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        tree.assert_invariants();
        assert_eq!(sorted.len(), tree.len());
        assert_eq!(sorted.is_empty(), tree.is_empty());
        assert!(sorted.iter().zip(tree.iter()).all(|(&a, b)| a == b.key));
    }
}
