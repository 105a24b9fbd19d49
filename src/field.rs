use std::borrow::Cow;

use crate::{
    gpu::{DeviceField, GpuError},
    Float,
};

/// Temperature at `n` equally spaced points, on the host or on a device.
#[derive(Debug)]
pub enum Field {
    Host(Vec<Float>),
    Device(DeviceField),
}

impl Field {
    pub fn len(&self) -> usize {
        match self {
            Field::Host(xs) => xs.len(),
            Field::Device(f) => f.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_on_device(&self) -> bool {
        matches!(self, Field::Device(_))
    }

    /// Host view of the values, reading them back from the device if needed.
    pub fn to_host(&self) -> Result<Cow<'_, [Float]>, GpuError> {
        match self {
            Field::Host(xs) => Ok(Cow::Borrowed(xs)),
            Field::Device(f) => f.to_host().map(Cow::Owned),
        }
    }

    pub fn into_host(self) -> Result<Vec<Float>, GpuError> {
        match self {
            Field::Host(xs) => Ok(xs),
            Field::Device(f) => f.to_host(),
        }
    }
}

impl From<Vec<Float>> for Field {
    fn from(xs: Vec<Float>) -> Self {
        Field::Host(xs)
    }
}

impl From<&[Float]> for Field {
    fn from(xs: &[Float]) -> Self {
        Field::Host(xs.to_vec())
    }
}

impl From<DeviceField> for Field {
    fn from(f: DeviceField) -> Self {
        Field::Device(f)
    }
}
