//! Initial temperature profiles.

use std::fmt;

// `count` evenly spaced values from `start` to `stop`, both ends included
fn linspace(start: f64, stop: f64, count: usize) -> impl Iterator<Item = f32> {
    let step = if count > 1 {
        (stop - start) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |k| {
        if count > 1 && k == count - 1 {
            stop as f32
        } else {
            (start + step * k as f64) as f32
        }
    })
}

/// `before_value` on `[0, i)` and `after_value` on `[i, n)`.
///
/// A pivot past the end yields a field made only of `before_value`.
pub fn step_function(n: usize, i: usize, before_value: f32, after_value: f32) -> Vec<f32> {
    (0..n)
        .map(|k| if k < i { before_value } else { after_value })
        .collect()
}

/// `others_value` everywhere except `peak_value` at `i`.
///
/// # Panics
///
/// Panics if `i >= n`.
pub fn peak_function(n: usize, i: usize, peak_value: f32, others_value: f32) -> Vec<f32> {
    assert!(i < n, "peak index {i} out of bounds for a field of {n} points");
    let mut xs = vec![others_value; n];
    xs[i] = peak_value;
    xs
}

/// Ramps linearly from `v_start` up to `vi` at index `i`, then linearly to `v_end`.
///
/// # Panics
///
/// Panics if `i >= n`.
pub fn linear_peak_function(n: usize, i: usize, v_start: f32, vi: f32, v_end: f32) -> Vec<f32> {
    assert!(i < n, "peak index {i} out of bounds for a field of {n} points");
    linspace(v_start as f64, vi as f64, i + 1)
        .take(i)
        .chain(linspace(vi as f64, v_end as f64, n - i))
        .collect()
}

/// Initial profiles addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitialFunction {
    LinearPeak,
    Peak,
    Step,
}

impl InitialFunction {
    pub const ALL: [InitialFunction; 3] = [
        InitialFunction::LinearPeak,
        InitialFunction::Peak,
        InitialFunction::Step,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InitialFunction::LinearPeak => "linear_peak_function",
            InitialFunction::Peak => "peak_function",
            InitialFunction::Step => "step_function",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Profile of `n` points pivoted at `n / 2` with unit amplitude.
    pub fn generate(self, n: usize) -> Vec<f32> {
        if n == 0 {
            return Vec::new();
        }
        let pivot = n / 2;
        match self {
            InitialFunction::LinearPeak => linear_peak_function(n, pivot, 0.0, 1.0, 0.0),
            InitialFunction::Peak => peak_function(n, pivot, 1.0, 0.0),
            InitialFunction::Step => step_function(n, pivot, 1.0, 0.0),
        }
    }
}

impl fmt::Display for InitialFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sorted names of every [`InitialFunction`].
pub fn list_functions() -> Vec<&'static str> {
    InitialFunction::ALL.iter().map(|f| f.name()).collect()
}
