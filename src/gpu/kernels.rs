//! WGSL sources of the device programs.
//!
//! Every kernel is compiled with `common.wgsl` prepended, which declares the
//! shared bindings: the `Params` uniform, the read-only input field, the output
//! field and a scratch buffer.

pub(crate) const COMMON: &str = include_str!("kernels/common.wgsl");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Launch {
    /// One invocation per field point, 64 per workgroup.
    PerPoint,
    /// A single invocation walks a bounded chunk of rows per dispatch; needs a
    /// field-sized scratch.
    Serial,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct KernelSource {
    pub name: &'static str,
    pub source: &'static str,
    pub launch: Launch,
}

macro_rules! kernel {
    ($name:literal, $launch:ident) => {
        KernelSource {
            name: $name,
            source: include_str!(concat!("kernels/", $name, ".wgsl")),
            launch: Launch::$launch,
        }
    };
}

pub(crate) const KERNELS: &[KernelSource] = &[
    kernel!("explicit_by_flow_gpu", PerPoint),
    kernel!("explicit_central_gpu", PerPoint),
    kernel!("explicit_counter_flow_gpu", PerPoint),
    kernel!("explicit_leapfrog_gpu", PerPoint),
    kernel!("implicit_by_flow_gpu", Serial),
    kernel!("implicit_central_gpu", Serial),
    kernel!("implicit_counter_flow_gpu", Serial),
    kernel!("simple_linear_gpu", PerPoint),
];
