//! Compute-device backend built on wgpu.
//!
//! The caller owns the device: a [`GpuContext`] is created once (or wrapped
//! around an existing `wgpu::Device`) and handed to the processor. Fields that
//! stay on the device between calls are [`DeviceField`]s.

mod kernels;
mod program;

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::Float;

pub(crate) use kernels::{KernelSource, Launch, KERNELS};
pub use program::DeviceProgram;

#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no compute adapter available")]
    NoAdapter,
    #[error("failed to create the compute device")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to map a device buffer for reading")]
    Readback(#[from] wgpu::BufferAsyncError),
    #[error("device buffer mapping was abandoned")]
    ReadbackAbandoned,
}

/// A compute device, its queue and the binding layout shared by every kernel.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    submission: Mutex<()>,
}

impl GpuContext {
    /// Picks the first adapter able to run compute work, preferring a discrete
    /// GPU and falling back to a software adapter.
    pub fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let request = |force_fallback_adapter| {
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter,
            }))
        };
        let adapter = request(false)
            .or_else(|| request(true))
            .ok_or(GpuError::NoAdapter)?;

        tracing::event!(
            tracing::Level::INFO,
            "compute adapter: {} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("thermal_device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))?;

        Ok(Self::from_device(device, queue))
    }

    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("field_step_bgl"),
            entries: &[
                bgl_uniform(0),    // params
                bgl_storage_ro(1), // field_in
                bgl_storage_rw(2), // field_out
                bgl_storage_rw(3), // scratch
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("field_step_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        Self {
            device,
            queue,
            bind_group_layout,
            pipeline_layout,
            submission: Mutex::new(()),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    // Serialises command submission on this device.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.submission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn upload(&self, xs: &[Float]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("field_upload"),
                contents: bytemuck::cast_slice(xs),
                usage: field_usages(),
            })
    }

    // wgpu zero-initialises new buffers
    pub(crate) fn zeroed(&self, len: usize, label: &str) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: byte_len(len.max(1)),
            usage: field_usages(),
            mapped_at_creation: false,
        })
    }

    pub(crate) fn duplicate(&self, src: &wgpu::Buffer, len: usize) -> wgpu::Buffer {
        let dst = self.zeroed(len, "field_copy");
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("field_copy"),
            });
        encoder.copy_buffer_to_buffer(src, 0, &dst, 0, byte_len(len));
        self.queue.submit(std::iter::once(encoder.finish()));
        dst
    }

    pub(crate) fn read(&self, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<Float>, GpuError> {
        let size = byte_len(len);
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("field_readback"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| GpuError::ReadbackAbandoned)??;

        let data = slice.get_mapped_range();
        let values = bytemuck::cast_slice::<u8, Float>(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(values)
    }
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext").finish_non_exhaustive()
    }
}

/// A field resident in device memory.
///
/// Feeding it back into the processor reuses the buffer without a host round
/// trip; [`DeviceField::to_host`] copies the values out.
pub struct DeviceField {
    buffer: wgpu::Buffer,
    len: usize,
    context: Arc<GpuContext>,
}

impl DeviceField {
    pub(crate) fn new(buffer: wgpu::Buffer, len: usize, context: Arc<GpuContext>) -> Self {
        Self {
            buffer,
            len,
            context,
        }
    }

    /// Uploads `xs` to the device of `context`.
    pub fn upload(context: &Arc<GpuContext>, xs: &[Float]) -> Self {
        Self::new(context.upload(xs), xs.len(), Arc::clone(context))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_host(&self) -> Result<Vec<Float>, GpuError> {
        let _guard = self.context.lock();
        self.context.read(&self.buffer, self.len)
    }

    pub(crate) fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub(crate) fn lives_on(&self, context: &Arc<GpuContext>) -> bool {
        Arc::ptr_eq(&self.context, context)
    }
}

impl fmt::Debug for DeviceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceField")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

fn field_usages() -> wgpu::BufferUsages {
    wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST
}

fn byte_len(len: usize) -> u64 {
    (len * std::mem::size_of::<Float>()) as u64
}

fn bgl_uniform(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_ro(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_rw(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
