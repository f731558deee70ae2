//! Assertion helpers for fan-out results.

use std::fmt::Debug;

/// Assert that every element of `results` equals the first one.
///
/// # Panics
///
/// Panics when `results` is empty or any element differs.
pub fn assert_all_equal<T: PartialEq + Debug>(results: &[T]) {
    let Some((first, rest)) = results.split_first() else {
        panic!("expected at least one result");
    };
    for (index, other) in rest.iter().enumerate() {
        assert_eq!(first, other, "result {} differs from result 0", index + 1);
    }
}
