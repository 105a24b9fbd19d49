//! Host implementations of every scheme.
//!
//! Each routine runs its own sub-loop of `iters` steps with the parameters of a
//! single sub-step, keeps both end points fixed, and mirrors the arithmetic of
//! the device kernel of the same scheme.
//!
//! All routines panic on fields shorter than 3 points.

use faer_core::{zipped, Mat, MatMut, MatRef};
use reborrow::*;

use crate::{
    faer_add::{column, column_to_vec},
    params::SchemeParams,
    Float,
};

/// `solve(field, params, iters) -> field`
pub type HostRoutine = fn(&[Float], &SchemeParams, usize) -> Vec<Float>;

pub(crate) const HOST_ROUTINES: &[(&str, HostRoutine)] = &[
    ("explicit_by_flow_cpu", explicit_by_flow),
    ("explicit_central_cpu", explicit_central),
    ("explicit_counter_flow_cpu", explicit_counter_flow),
    ("explicit_leapfrog_cpu", explicit_leapfrog),
    ("implicit_by_flow_cpu", implicit_by_flow),
    ("implicit_central_cpu", implicit_central),
    ("implicit_counter_flow_cpu", implicit_counter_flow),
    ("simple_linear_cpu", simple_linear),
];

fn copy_borders(src: MatRef<'_, Float>, mut dst: MatMut<'_, Float>) {
    let n = src.nrows();
    dst.write(0, 0, src.read(0, 0));
    dst.write(n - 1, 0, src.read(n - 1, 0));
}

// dst_i = schema(src_{i-1}, src_i, src_{i+1}) on the interior
fn three_point_sweep(
    src: MatRef<'_, Float>,
    mut dst: MatMut<'_, Float>,
    schema: &impl Fn(Float, Float, Float) -> Float,
) {
    let n = src.nrows();
    assert!(n >= 3, "a field needs at least 3 points, got {n}");

    let um = src.submatrix(0, 0, n - 2, 1);
    let u = src.submatrix(1, 0, n - 2, 1);
    let up = src.submatrix(2, 0, n - 2, 1);

    zipped!(dst.rb_mut().submatrix(1, 0, n - 2, 1), um, u, up)
        .for_each(|mut v, um, u, up| v.write(schema(um.read(), u.read(), up.read())));

    copy_borders(src, dst);
}

fn iterate_three_point(
    ts: &[Float],
    iters: usize,
    schema: impl Fn(Float, Float, Float) -> Float,
) -> Vec<Float> {
    let mut u = column(ts);
    let mut v = u.clone();

    for _ in 0..iters {
        three_point_sweep(u.as_ref(), v.as_mut(), &schema);
        std::mem::swap(&mut u, &mut v);
    }

    column_to_vec(u.as_ref())
}

#[inline]
fn diffusion(um: Float, u: Float, up: Float) -> Float {
    up - 2.0 * u + um
}

fn central_schema(p: &SchemeParams) -> impl Fn(Float, Float, Float) -> Float {
    let (s, r) = (p.s, p.r);
    move |um, u, up| u - s * (0.5 * (up - um)) + r * diffusion(um, u, up)
}

pub fn explicit_central(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    iterate_three_point(ts, iters, central_schema(p))
}

/// Upwind advection for `u > 0`: backward difference.
pub fn explicit_counter_flow(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    let (s, r) = (p.s, p.r);
    iterate_three_point(ts, iters, move |um, u, up| {
        u - s * (u - um) + r * diffusion(um, u, up)
    })
}

/// Downwind advection for `u > 0`: forward difference.
pub fn explicit_by_flow(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    let (s, r) = (p.s, p.r);
    iterate_three_point(ts, iters, move |um, u, up| {
        u - s * (up - u) + r * diffusion(um, u, up)
    })
}

/// Weighted neighbour average with the raw advection speed as weight.
pub fn simple_linear(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    let w = p.u;
    iterate_three_point(ts, iters, move |um, u, up| {
        (w * um + u + w * up) / (w + 1.0 + w)
    })
}

/// Leapfrog advection with DuFort-Frankel diffusion.
///
/// The first sub-step has no previous level and falls back to
/// [`explicit_central`].
pub fn explicit_leapfrog(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    let (s, r) = (p.s, p.r);
    let mut prev = column(ts);
    let mut cur = prev.clone();
    let mut next = prev.clone();

    for k in 0..iters {
        if k == 0 {
            three_point_sweep(cur.as_ref(), next.as_mut(), &central_schema(p));
        } else {
            leapfrog_sweep(prev.as_ref(), cur.as_ref(), next.as_mut(), s, r);
        }
        // (prev, cur, next) <- (cur, next, prev)
        std::mem::swap(&mut prev, &mut cur);
        std::mem::swap(&mut cur, &mut next);
    }

    column_to_vec(cur.as_ref())
}

fn leapfrog_sweep(
    prev: MatRef<'_, Float>,
    cur: MatRef<'_, Float>,
    mut next: MatMut<'_, Float>,
    s: Float,
    r: Float,
) {
    let n = cur.nrows();
    assert!(n >= 3, "a field needs at least 3 points, got {n}");

    let schema = |p: Float, um: Float, up: Float| {
        ((1.0 - 2.0 * r) * p + 2.0 * r * (up + um) - s * (up - um)) / (1.0 + 2.0 * r)
    };

    zipped!(
        next.rb_mut().submatrix(1, 0, n - 2, 1),
        prev.submatrix(1, 0, n - 2, 1),
        cur.submatrix(0, 0, n - 2, 1),
        cur.submatrix(2, 0, n - 2, 1)
    )
    .for_each(|mut v, p, um, up| v.write(schema(p.read(), um.read(), up.read())));

    copy_borders(cur, next);
}

/// Solves the banded system with constant `[lower, diag, upper]` interior rows
/// and identity rows at both ends. `c` is scratch space of the same length.
pub(crate) fn solve_tridiagonal(
    rhs: MatRef<'_, Float>,
    mut x: MatMut<'_, Float>,
    mut c: MatMut<'_, Float>,
    [lower, diag, upper]: [Float; 3],
) {
    let n = rhs.nrows();
    assert!(n >= 3, "a field needs at least 3 points, got {n}");

    // forward elimination
    c.write(0, 0, 0.0);
    x.write(0, 0, rhs.read(0, 0));
    for i in 1..n - 1 {
        let m = diag - lower * c.read(i - 1, 0);
        c.write(i, 0, upper / m);
        x.write(i, 0, (rhs.read(i, 0) - lower * x.read(i - 1, 0)) / m);
    }
    x.write(n - 1, 0, rhs.read(n - 1, 0));

    // back substitution
    for i in (1..n - 1).rev() {
        x.write(i, 0, x.read(i, 0) - c.read(i, 0) * x.read(i + 1, 0));
    }
}

fn iterate_implicit(ts: &[Float], iters: usize, coefficients: [Float; 3]) -> Vec<Float> {
    let mut u = column(ts);
    let mut v = u.clone();
    let mut c = Mat::<Float>::zeros(ts.len(), 1);

    for _ in 0..iters {
        solve_tridiagonal(u.as_ref(), v.as_mut(), c.as_mut(), coefficients);
        std::mem::swap(&mut u, &mut v);
    }

    column_to_vec(u.as_ref())
}

pub fn implicit_central(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    let (s, r) = (p.s, p.r);
    iterate_implicit(ts, iters, [-(0.5 * s + r), 1.0 + 2.0 * r, 0.5 * s - r])
}

/// Implicit upwind: sub-diagonal `-(s+r)`, diagonal `1+s+2r`, super-diagonal `-r`.
pub fn implicit_counter_flow(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    let (s, r) = (p.s, p.r);
    iterate_implicit(ts, iters, [-(s + r), 1.0 + s + 2.0 * r, -r])
}

pub fn implicit_by_flow(ts: &[Float], p: &SchemeParams, iters: usize) -> Vec<Float> {
    let (s, r) = (p.s, p.r);
    iterate_implicit(ts, iters, [-r, 1.0 - s + 2.0 * r, s - r])
}
