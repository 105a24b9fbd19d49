pub mod faer_add;

pub mod initial;
pub mod params;

pub mod gpu;
pub mod methods;

pub mod field;
pub mod method;
pub mod processor;

pub mod driver;

pub use faer_add::Float;

pub use driver::{Driver, FrameLimiter, FrameRecorder, Logger, ObsCtx, Observer, RunParameters, SimError};
pub use field::Field;
pub use gpu::{DeviceField, DeviceProgram, GpuContext, GpuError};
pub use initial::{linear_peak_function, list_functions, peak_function, step_function, InitialFunction};
pub use method::{Method, MethodRegistry, RegistryError};
pub use params::{derive, StepParams};
pub use processor::{ProcessError, SimulationProcessor};
