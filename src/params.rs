use bytemuck::{Pod, Zeroable};

/// Courant number `u·dt/dx`.
#[inline]
pub fn courant_number(u: f32, dt: f32, dx: f32) -> f32 {
    u * dt / dx
}

/// Diffusion number `chi·dt/dx²`.
#[inline]
pub fn diffusion_number(chi: f32, dt: f32, dx: f32) -> f32 {
    chi * dt / (dx * dx)
}

/// Returns `(s, r)`, taking the overrides as-is when given.
///
/// `dx` must be non-zero.
pub fn derive(
    dx: f32,
    dt: f32,
    u: f32,
    chi: f32,
    s: Option<f32>,
    r: Option<f32>,
) -> (f32, f32) {
    (
        s.unwrap_or_else(|| courant_number(u, dt, dx)),
        r.unwrap_or_else(|| diffusion_number(chi, dt, dx)),
    )
}

/// Physical inputs of one `process` call.
///
/// `dt` is the time covered by the whole call; it is split into equal sub-steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub dx: f32,
    pub dt: f32,
    pub u: f32,
    pub chi: f32,
    pub s: Option<f32>,
    pub r: Option<f32>,
}

impl StepParams {
    pub fn new(dx: f32, dt: f32, u: f32, chi: f32) -> Self {
        Self {
            dx,
            dt,
            u,
            chi,
            s: None,
            r: None,
        }
    }

    /// Overrides the per-sub-step Courant number.
    pub fn with_courant(mut self, s: f32) -> Self {
        self.s = Some(s);
        self
    }

    /// Overrides the per-sub-step diffusion number.
    pub fn with_diffusion_number(mut self, r: f32) -> Self {
        self.r = Some(r);
        self
    }

    pub(crate) fn per_sub_step(&self, n: usize, iters: usize) -> SchemeParams {
        let dt = self.dt / iters as f32;
        let (s, r) = derive(self.dx, dt, self.u, self.chi, self.s, self.r);
        SchemeParams {
            dx: self.dx,
            dt,
            u: self.u,
            chi: self.chi,
            s,
            r,
            n: n as u32,
            iteration: 0,
        }
    }
}

/// Everything a scheme sees for one sub-step.
///
/// Laid out to match the `Params` uniform of the device kernels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SchemeParams {
    pub dx: f32,
    /// Sub-step duration.
    pub dt: f32,
    pub u: f32,
    pub chi: f32,
    pub s: f32,
    pub r: f32,
    pub n: u32,
    pub iteration: u32,
}

impl SchemeParams {
    pub(crate) fn at_iteration(mut self, iteration: usize) -> Self {
        self.iteration = iteration as u32;
        self
    }
}
