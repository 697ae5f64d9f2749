#![no_main]

use cordyceps_bst::model::{run_equivalence_with, Balancer, Op};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (Balancer, Vec<Op>)| {
    let (balancer, ops) = input;
    run_equivalence_with(balancer, ops);
});
