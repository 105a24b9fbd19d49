//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use thermal::{Float, GpuContext};

/// Every scheme, without its backend suffix.
pub const SCHEMES: [&str; 8] = [
    "explicit_by_flow",
    "explicit_central",
    "explicit_counter_flow",
    "explicit_leapfrog",
    "implicit_by_flow",
    "implicit_central",
    "implicit_counter_flow",
    "simple_linear",
];

pub fn ramp(n: usize) -> Vec<Float> {
    (0..n).map(|i| i as Float).collect()
}

/// Reproducible values in `[0, 1)`.
pub fn random_field(n: usize, seed: u64) -> Vec<Float> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.random::<Float>()).collect()
}

/// `|a - b| <= atol + rtol * |b|` for every pair.
pub fn assert_close(actual: &[Float], expected: &[Float], atol: Float, rtol: Float, context: &str) {
    assert_eq!(actual.len(), expected.len(), "{context}: length mismatch");
    for (i, (a, b)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - b).abs() <= atol + rtol * b.abs(),
            "{context}: index {i}: {a} vs {b}"
        );
    }
}

/// Shared compute device, `None` when the machine has none.
pub fn gpu_context() -> Option<Arc<GpuContext>> {
    static CONTEXT: OnceLock<Option<Arc<GpuContext>>> = OnceLock::new();
    CONTEXT
        .get_or_init(|| match GpuContext::new() {
            Ok(context) => Some(Arc::new(context)),
            Err(err) => {
                eprintln!("no compute device, skipping device checks: {err}");
                None
            }
        })
        .clone()
}
