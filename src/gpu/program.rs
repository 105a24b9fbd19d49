use std::{fmt, sync::Arc};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::{
    field::Field,
    method::RegistryError,
    params::SchemeParams,
};

use super::{kernels::COMMON, DeviceField, GpuContext, GpuError, KernelSource, Launch};

const WORKGROUP_SIZE: u32 = 64;

/// Rows one serial invocation walks per dispatch.
const SERIAL_ROWS: u32 = 4096;

const FORWARD: u32 = 0;
const BACKWARD: u32 = 1;

/// The `Params` uniform: scheme parameters plus the rows of one dispatch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct KernelParams {
    scheme: SchemeParams,
    row_start: u32,
    row_end: u32,
    sweep: u32,
    _pad: u32,
}

impl KernelParams {
    fn new(scheme: SchemeParams, (row_start, row_end): (u32, u32), sweep: u32) -> Self {
        Self {
            scheme,
            row_start,
            row_end,
            sweep,
            _pad: 0,
        }
    }
}

/// Interior rows `1..n-1` split into consecutive chunks of at most
/// [`SERIAL_ROWS`] rows.
fn row_chunks(n: u32) -> Vec<(u32, u32)> {
    (1..n - 1)
        .step_by(SERIAL_ROWS as usize)
        .map(|start| (start, (start + SERIAL_ROWS).min(n - 1)))
        .collect()
}

/// A compiled compute kernel implementing one scheme.
pub struct DeviceProgram {
    name: &'static str,
    context: Arc<GpuContext>,
    pipeline: wgpu::ComputePipeline,
    launch: Launch,
}

impl DeviceProgram {
    pub(crate) fn compile(
        context: &Arc<GpuContext>,
        kernel: &KernelSource,
    ) -> Result<Self, RegistryError> {
        tracing::event!(tracing::Level::DEBUG, "building kernel `{}`", kernel.name);

        let device = &context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.name),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON}\n{}", kernel.source).into()),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(kernel.name),
            layout: Some(&context.pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RegistryError::Compile {
                name: kernel.name.to_string(),
                message: error.to_string(),
            });
        }

        Ok(Self {
            name: kernel.name,
            context: Arc::clone(context),
            pipeline,
            launch: kernel.launch,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs `iters` sub-steps, one compute pass each.
    ///
    /// The input is read in place when it already lives on `context` and is
    /// never written. Two working buffers alternate as output; the second one
    /// starts as a copy of the input so that a kernel reading its output buffer
    /// on the second sub-step finds the level before its input.
    pub(crate) fn run(
        &self,
        field: &Field,
        params: SchemeParams,
        iters: usize,
    ) -> Result<DeviceField, GpuError> {
        let context = &self.context;
        let n = field.len();

        let staged;
        let input = match field {
            Field::Device(f) if f.lives_on(context) => f.buffer(),
            Field::Device(f) => {
                staged = context.upload(&f.to_host()?);
                &staged
            }
            Field::Host(xs) => {
                staged = context.upload(xs);
                &staged
            }
        };

        let _guard = context.lock();
        let device = &context.device;

        let mut buffers = vec![context.zeroed(n, "field_a")];
        if iters > 1 {
            buffers.push(context.duplicate(input, n));
        }
        let scratch = match self.launch {
            Launch::PerPoint => context.zeroed(1, "scratch"),
            Launch::Serial => context.zeroed(n, "scratch"),
        };
        let (groups_x, groups_y) = self.workgroups(n as u32, device.limits().max_compute_workgroups_per_dimension);
        let chunks = row_chunks(n as u32);

        for k in 0..iters {
            let src = if k == 0 { input } else { &buffers[(k + 1) % 2] };
            let dst = &buffers[k % 2];

            let bind_groups: Vec<_> = self
                .dispatches(params.at_iteration(k), &chunks)
                .iter()
                .map(|dispatch| {
                    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("params"),
                        contents: bytemuck::bytes_of(dispatch),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(self.name),
                        layout: &context.bind_group_layout,
                        entries: &[
                            wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() },
                            wgpu::BindGroupEntry { binding: 1, resource: src.as_entire_binding() },
                            wgpu::BindGroupEntry { binding: 2, resource: dst.as_entire_binding() },
                            wgpu::BindGroupEntry { binding: 3, resource: scratch.as_entire_binding() },
                        ],
                    })
                })
                .collect();

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(self.name),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(self.name),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                for bind_group in &bind_groups {
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.dispatch_workgroups(groups_x, groups_y, 1);
                }
            }
            context.queue.submit(std::iter::once(encoder.finish()));
            device.poll(wgpu::Maintain::Wait);

            tracing::event!(
                tracing::Level::TRACE,
                "`{}`: sub-step {}/{} done ({} dispatches)",
                self.name,
                k + 1,
                iters,
                bind_groups.len()
            );
        }

        let result = buffers.swap_remove((iters - 1) % 2);
        Ok(DeviceField::new(result, n, Arc::clone(context)))
    }

    // Serial kernels sweep forward chunk by chunk, then backward.
    fn dispatches(&self, scheme: SchemeParams, chunks: &[(u32, u32)]) -> Vec<KernelParams> {
        match self.launch {
            Launch::PerPoint => vec![KernelParams::new(scheme, (1, scheme.n - 1), FORWARD)],
            Launch::Serial => chunks
                .iter()
                .map(|&rows| KernelParams::new(scheme, rows, FORWARD))
                .chain(chunks.iter().rev().map(|&rows| KernelParams::new(scheme, rows, BACKWARD)))
                .collect(),
        }
    }

    // Per-point kernels index with `id.x + id.y * groups.x * 64`.
    fn workgroups(&self, n: u32, max_per_dimension: u32) -> (u32, u32) {
        match self.launch {
            Launch::Serial => (1, 1),
            Launch::PerPoint => {
                let total = n.div_ceil(WORKGROUP_SIZE).max(1);
                let x = total.min(max_per_dimension);
                (x, total.div_ceil(x))
            }
        }
    }
}

impl fmt::Debug for DeviceProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceProgram")
            .field("name", &self.name)
            .field("launch", &self.launch)
            .finish_non_exhaustive()
    }
}
