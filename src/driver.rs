use std::{
    thread,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::{
    field::Field,
    gpu::GpuError,
    initial::InitialFunction,
    params::StepParams,
    processor::{ProcessError, SimulationProcessor},
    Float,
};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("unknown initial function `{0}`")]
    UnknownInitialFunction(String),
    #[error("invalid run parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    #[error("simulation step failed")]
    Process(#[from] ProcessError),
    #[error("failed to read a frame back from the device")]
    Device(#[from] GpuError),
}

/// Parameters of a simulation run, as entered on a control surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParameters {
    /// Number of field points.
    pub n: usize,
    /// Sub-steps per frame.
    pub iters: usize,
    pub dx: f32,
    /// Simulated time per frame.
    pub dt: f32,
    pub u: f32,
    pub chi: f32,
    /// Wall-clock seconds per frame when pacing is enabled.
    pub view_dt: f32,
    pub s: Option<f32>,
    pub r: Option<f32>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            n: 100,
            iters: 10,
            dx: 0.01,
            dt: 0.1,
            u: 0.0,
            chi: 0.0025,
            view_dt: 0.05,
            s: None,
            r: None,
        }
    }
}

impl RunParameters {
    pub fn with_points(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    pub fn with_iters(mut self, iters: usize) -> Self {
        self.iters = iters;
        self
    }

    pub fn with_advection(mut self, u: f32) -> Self {
        self.u = u;
        self
    }

    pub fn with_diffusivity(mut self, chi: f32) -> Self {
        self.chi = chi;
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |name, reason| Err(SimError::InvalidParameter { name, reason });

        if self.n < 3 {
            return invalid("n", "at least 3 points are required");
        }
        if self.iters == 0 {
            return invalid("iters", "must be at least 1");
        }
        if !(self.dx > 0.0 && self.dx.is_finite()) {
            return invalid("dx", "must be positive");
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return invalid("dt", "must be positive");
        }
        if !self.u.is_finite() {
            return invalid("u", "must be finite");
        }
        if !(self.chi >= 0.0 && self.chi.is_finite()) {
            return invalid("chi", "must be non-negative");
        }
        if !(self.view_dt > 0.0 && self.view_dt.is_finite()) {
            return invalid("view_dt", "must be positive");
        }
        Ok(())
    }

    pub fn step_params(&self) -> StepParams {
        StepParams {
            dx: self.dx,
            dt: self.dt,
            u: self.u,
            chi: self.chi,
            s: self.s,
            r: self.r,
        }
    }
}

pub struct ObsCtx<'ctx> {
    initial_function: InitialFunction,
    method: &'ctx str,
    params: &'ctx RunParameters,
    value_range: (Float, Float),

    frame: usize,
    time: f32,
    solution: &'ctx [Float],
}

impl<'ctx> ObsCtx<'ctx> {
    pub fn initial_function(&self) -> InitialFunction {
        self.initial_function
    }

    pub fn method(&self) -> &str {
        self.method
    }

    pub fn params(&self) -> &RunParameters {
        self.params
    }

    /// Value-axis range for plotting, taken from the initial field.
    pub fn value_range(&self) -> (Float, Float) {
        self.value_range
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn solution(&self) -> &[Float] {
        self.solution
    }
}

#[allow(unused_variables)]
pub trait Observer {
    fn at_startup(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        Ok(())
    }

    fn at_each_frame(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        Ok(())
    }

    fn at_cleanup(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        Ok(())
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn at_startup(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        (**self).at_startup(ctx)
    }

    fn at_each_frame(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        (**self).at_each_frame(ctx)
    }

    fn at_cleanup(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        (**self).at_cleanup(ctx)
    }
}

/// Sleeps so that consecutive frames are at least `period` apart.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    period: Duration,
    last: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.period {
                thread::sleep(self.period - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Runs a simulation frame after frame, each frame being one `process` call
/// fed with the previous frame's field.
pub struct Driver<'p, 'd> {
    processor: &'p SimulationProcessor,
    initial_function: InitialFunction,
    method: String,
    params: RunParameters,
    observers: Vec<Box<dyn Observer + 'd>>,
    limiter: Option<FrameLimiter>,
}

impl<'p, 'd> Driver<'p, 'd> {
    pub fn new(
        processor: &'p SimulationProcessor,
        initial_function: &str,
        method: &str,
        params: RunParameters,
    ) -> Result<Self, SimError> {
        let initial_function = InitialFunction::from_name(initial_function)
            .ok_or_else(|| SimError::UnknownInitialFunction(initial_function.to_string()))?;
        params.validate()?;
        if !processor
            .get_method_names()
            .map_err(ProcessError::from)?
            .iter()
            .any(|name| name == method)
        {
            return Err(ProcessError::UnknownMethod(method.to_string()).into());
        }

        Ok(Self {
            processor,
            initial_function,
            method: method.to_string(),
            params,
            observers: Vec::new(),
            limiter: None,
        })
    }

    pub fn with_observer(mut self, observer: impl Observer + 'd) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Spaces frames `view_dt` seconds apart in wall-clock time.
    pub fn with_frame_pacing(mut self) -> Self {
        let period = Duration::try_from_secs_f32(self.params.view_dt).unwrap_or_default();
        self.limiter = Some(FrameLimiter::new(period));
        self
    }

    /// Runs `frames` frames and returns the last field.
    ///
    /// Device-resident fields stay on the device between frames; they are read
    /// back only when observers are attached.
    pub fn run(&mut self, frames: usize) -> Result<Field, SimError> {
        let Self {
            processor,
            initial_function,
            method,
            params,
            observers,
            limiter,
        } = self;
        let (method, params): (&str, &RunParameters) = (method, params);

        let ts = initial_function.generate(params.n);
        let value_range = ts
            .iter()
            .fold((Float::INFINITY, Float::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        let step = params.step_params();

        for o in observers.iter_mut() {
            o.at_startup(ObsCtx {
                initial_function: *initial_function,
                method,
                params,
                value_range,
                frame: 0,
                time: 0.0,
                solution: &ts,
            })?;
        }

        let mut field = Field::Host(ts);
        for frame in 1..=frames {
            field = processor.process(&field, &step, method, params.iters)?;

            if !observers.is_empty() {
                let values = field.to_host()?;
                for o in observers.iter_mut() {
                    o.at_each_frame(ObsCtx {
                        initial_function: *initial_function,
                        method,
                        params,
                        value_range,
                        frame,
                        time: frame as f32 * params.dt,
                        solution: &values,
                    })?;
                }
            }

            if let Some(limiter) = limiter.as_mut() {
                limiter.wait();
            }
        }

        if !observers.is_empty() {
            let values = field.to_host()?;
            for o in observers.iter_mut() {
                o.at_cleanup(ObsCtx {
                    initial_function: *initial_function,
                    method,
                    params,
                    value_range,
                    frame: frames,
                    time: frames as f32 * params.dt,
                    solution: &values,
                })?;
            }
        }

        Ok(field)
    }
}

pub struct Logger;

impl Observer for Logger {
    fn at_startup(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        tracing::event!(
            tracing::Level::INFO,
            "start of simulation from `{}` (`{}` method, n={}, Δx={:e}, Δt={:e} in {} sub-steps, u={:e}, χ={:e})",
            ctx.initial_function(),
            ctx.method(),
            ctx.params().n,
            ctx.params().dx,
            ctx.params().dt,
            ctx.params().iters,
            ctx.params().u,
            ctx.params().chi,
        );
        Ok(())
    }

    fn at_each_frame(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        tracing::event!(
            tracing::Level::TRACE,
            "`{}`: frame {} (t={:e})",
            ctx.method(),
            ctx.frame(),
            ctx.time()
        );
        Ok(())
    }

    fn at_cleanup(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        tracing::event!(
            tracing::Level::INFO,
            "finished simulation with `{}` after {} frames",
            ctx.method(),
            ctx.frame()
        );
        Ok(())
    }
}

/// Keeps every frame in memory, the initial field included.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    times: Vec<f32>,
    frames: Vec<Vec<Float>>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Vec<Float>] {
        &self.frames
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    fn record(&mut self, ctx: &ObsCtx) {
        self.times.push(ctx.time());
        self.frames.push(ctx.solution().to_vec());
    }
}

impl Observer for FrameRecorder {
    fn at_startup(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        self.record(&ctx);
        Ok(())
    }

    fn at_each_frame(&mut self, ctx: ObsCtx) -> Result<(), SimError> {
        self.record(&ctx);
        Ok(())
    }
}
