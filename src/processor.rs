use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::{
    field::Field,
    gpu::{GpuContext, GpuError},
    method::{Method, MethodRegistry, RegistryError},
    params::StepParams,
    Float,
};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("a field needs at least 3 points, got {0}")]
    FieldTooShort(usize),
    #[error("the iteration count must be at least 1")]
    NoIterations,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Device(#[from] GpuError),
}

/// Steps a temperature field with any registered scheme.
///
/// The method registry is built on first use (or by [`SimulationProcessor::compile`])
/// and reused afterwards. A failed build is kept and reported on every later
/// call. Calls are blocking; device work of one processor is serialised.
#[derive(Debug)]
pub struct SimulationProcessor {
    context: Option<Arc<GpuContext>>,
    registry: OnceLock<Result<MethodRegistry, RegistryError>>,
}

impl SimulationProcessor {
    /// Device kernels run on `context`, next to the host routines.
    pub fn new(context: Arc<GpuContext>) -> Self {
        Self {
            context: Some(context),
            registry: OnceLock::new(),
        }
    }

    /// Only the host routines are registered.
    pub fn host_only() -> Self {
        Self {
            context: None,
            registry: OnceLock::new(),
        }
    }

    pub fn context(&self) -> Option<&Arc<GpuContext>> {
        self.context.as_ref()
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.registry.get(), Some(Ok(_)))
    }

    /// Builds the method registry. Calling it again is a no-op.
    pub fn compile(&self) -> Result<(), RegistryError> {
        self.registry().map(|_| ())
    }

    fn registry(&self) -> Result<&MethodRegistry, RegistryError> {
        self.registry
            .get_or_init(|| {
                tracing::event!(tracing::Level::DEBUG, "compiling simulation methods...");
                let registry = MethodRegistry::build(self.context.as_ref());
                match &registry {
                    Ok(registry) => tracing::event!(
                        tracing::Level::INFO,
                        "simulation methods compiled: {:?}",
                        registry.names()
                    ),
                    Err(err) => tracing::event!(
                        tracing::Level::ERROR,
                        "failed to compile simulation methods: {err}"
                    ),
                }
                registry
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Sorted names of every method.
    pub fn get_method_names(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.registry()?.names())
    }

    /// Advances `field` by `params.dt` in `iters` equal sub-steps.
    ///
    /// Device methods return a device-resident field, host methods a host one.
    /// The first and last values are left unchanged and `field` is never
    /// modified.
    pub fn process(
        &self,
        field: &Field,
        params: &StepParams,
        method_name: &str,
        iters: usize,
    ) -> Result<Field, ProcessError> {
        let method = self
            .registry()?
            .get(method_name)
            .ok_or_else(|| ProcessError::UnknownMethod(method_name.to_string()))?;

        let n = field.len();
        if n < 3 {
            return Err(ProcessError::FieldTooShort(n));
        }
        if iters == 0 {
            return Err(ProcessError::NoIterations);
        }

        let scheme_params = params.per_sub_step(n, iters);
        tracing::event!(
            tracing::Level::TRACE,
            "`{}`: n={}, iters={}, s={:e}, r={:e}",
            method_name,
            n,
            iters,
            scheme_params.s,
            scheme_params.r
        );

        match method {
            Method::Host(routine) => {
                let values = field.to_host()?;
                Ok(Field::Host(routine(&values, &scheme_params, iters)))
            }
            Method::Device(program) => Ok(Field::Device(program.run(field, scheme_params, iters)?)),
        }
    }

    /// [`SimulationProcessor::process`] on host values, returning host values.
    pub fn process_values(
        &self,
        ts: &[Float],
        params: &StepParams,
        method_name: &str,
        iters: usize,
    ) -> Result<Vec<Float>, ProcessError> {
        let result = self.process(&Field::from(ts), params, method_name, iters)?;
        Ok(result.into_host()?)
    }
}
