//! End-to-end pipeline tests.
//!
//! Each test drives source text through parse → lower → build CFG → GC →
//! codegen → VM and checks the produced samples (and, where it matters,
//! the shape of the intermediate packages).

use thrum_tests::TestHarness;

#[test]
fn constant_function_fills_output() {
    // A scalar-returning entry broadcasts over the whole frame.
    let mut harness = TestHarness::from_source("main x = 1.0 ;");
    assert_eq!(harness.root().to_string(), "main_[vF32:F32]");
    assert_eq!(harness.call(&[2.0, 2.0, 2.0]), vec![1.0, 1.0, 1.0]);
}

#[test]
fn vector_vector_add() {
    let mut harness = TestHarness::from_source("main x = x + x ;");
    assert_eq!(harness.root().to_string(), "main_[vF32:vF32]");
    assert_eq!(harness.call(&[1.0, 2.0, 3.0]), vec![2.0, 4.0, 6.0]);
}

#[test]
fn scalar_broadcast_over_vector() {
    let mut harness = TestHarness::from_source("main x = 2.0 + x ;");
    assert_eq!(harness.call(&[1.0, 1.0, 1.0]), vec![3.0, 3.0, 3.0]);
}

#[test]
fn vector_scalar_multiply() {
    let mut harness = TestHarness::from_source("main x = x * 0.5 ;");
    assert_eq!(harness.call(&[2.0, 4.0, 8.0]), vec![1.0, 2.0, 4.0]);
}

#[test]
fn indirection_monomorphises_and_prunes() {
    let mut harness = TestHarness::from_source("id x = x ;\nmain x = id x ;");

    // Post-GC the package holds exactly main and the vector id instance.
    assert_eq!(harness.cfg().functions.len(), 2);
    let names: Vec<String> = harness
        .cfg()
        .functions
        .keys()
        .map(ToString::to_string)
        .collect();
    assert!(names.contains(&"id_[vF32:vF32]".to_string()));
    assert!(names.contains(&"main_[vF32:vF32]".to_string()));

    assert_eq!(harness.call(&[5.0, 5.0, 5.0]), vec![5.0, 5.0, 5.0]);
}

#[test]
fn implicit_nullary_call() {
    let mut harness = TestHarness::from_source("k = 4.0 ;\nmain x = k + x ;");

    let names: Vec<String> = harness
        .cfg()
        .functions
        .keys()
        .map(ToString::to_string)
        .collect();
    assert!(names.contains(&"k_[F32]".to_string()));

    assert_eq!(harness.call(&[0.0, 0.0, 0.0]), vec![4.0, 4.0, 4.0]);
}

#[test]
fn left_associative_operator_chain() {
    // a + b * c folds left: (a + b) * c.
    let mut harness = TestHarness::from_source("main x = x + x * x ;");
    assert_eq!(harness.call(&[2.0, 3.0, 4.0]), vec![8.0, 18.0, 32.0]);
}

#[test]
fn nested_call_argument() {
    // A call in argument position must leave the caller's parameter
    // offsets intact.
    let mut harness = TestHarness::from_source("dbl y = y + y ;\nmain x = x + dbl 2.0 ;");
    assert_eq!(harness.call(&[1.0, 2.0, 3.0]), vec![5.0, 6.0, 7.0]);
}

#[test]
fn shared_subexpression_through_declaration() {
    let mut harness =
        TestHarness::from_source("gain = 0.25 ;\nmain x = gain * x + gain * x ;");
    // (0.25 * x + 0.25) * x — left-associative fold.
    assert_eq!(harness.call(&[2.0, 2.0, 2.0]), vec![1.5, 1.5, 1.5]);
}

#[test]
fn frames_larger_than_one_slot() {
    // 20 samples spans two 16-sample vector slots.
    let mut harness = TestHarness::from_source("main x = x + x ;");
    let input: Vec<f32> = (0..20).map(|i| i as f32).collect();
    let expected: Vec<f32> = input.iter().map(|v| v * 2.0).collect();
    assert_eq!(harness.call(&input), expected);
}

#[test]
fn bytecode_labels_are_mangled_symbols() {
    let harness = TestHarness::from_source("id x = x ;\nmain x = id x ;");
    assert!(harness.bytecode().symbols.contains_key("id_[vF32:vF32]"));
    assert!(harness.bytecode().symbols.contains_key("main_[vF32:vF32]"));
}

#[test]
fn repeated_calls_reuse_rewritten_symbols() {
    // push_sym rewrites itself to a plain push on first execution; the
    // program must stay correct on subsequent calls.
    let mut harness = TestHarness::from_source("id x = x ;\nmain x = id x ;");
    assert_eq!(harness.call(&[1.0, 1.0, 1.0]), vec![1.0, 1.0, 1.0]);
    assert_eq!(harness.call(&[2.0, 2.0, 2.0]), vec![2.0, 2.0, 2.0]);
}
