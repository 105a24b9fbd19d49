use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::Arc,
};

use thiserror::Error;

use crate::{
    gpu::{DeviceProgram, GpuContext, KERNELS},
    methods::{HostRoutine, HOST_ROUTINES},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("method `{0}` is registered by both the device and the host backend")]
    Duplicate(String),
    #[error("kernel `{name}` failed to build: {message}")]
    Compile { name: String, message: String },
}

/// A numerical scheme bound to the backend that runs it.
pub enum Method {
    Device(DeviceProgram),
    Host(HostRoutine),
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Device(program) => f.debug_tuple("Device").field(program).finish(),
            Method::Host(_) => f.write_str("Host(<fn>)"),
        }
    }
}

/// Every available method under a single, ordered namespace.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, Method>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles every device kernel (when a device is given), then adds every
    /// host routine.
    pub fn build(context: Option<&Arc<GpuContext>>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        if let Some(context) = context {
            for kernel in KERNELS {
                registry.insert(kernel.name, Method::Device(DeviceProgram::compile(context, kernel)?))?;
            }
        }
        for &(name, routine) in HOST_ROUTINES {
            registry.insert(name, Method::Host(routine))?;
        }

        Ok(registry)
    }

    /// Fails if `name` is already taken, by either backend.
    pub fn insert(&mut self, name: impl Into<String>, method: Method) -> Result<(), RegistryError> {
        match self.methods.entry(name.into()) {
            Entry::Occupied(entry) => Err(RegistryError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(method);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Sorted method names.
    pub fn names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.methods.len()
    }
}
