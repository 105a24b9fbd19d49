use std::sync::Arc;

use thermal::{Driver, FrameRecorder, GpuContext, Logger, RunParameters, SimulationProcessor};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let (processor, method) = match GpuContext::new() {
        Ok(context) => (SimulationProcessor::new(Arc::new(context)), "explicit_central_gpu"),
        Err(err) => {
            tracing::warn!("running on the host only: {err}");
            (SimulationProcessor::host_only(), "explicit_central_cpu")
        }
    };

    let params = RunParameters::default().with_advection(0.02);
    let mut recorder = FrameRecorder::new();

    Driver::new(&processor, "linear_peak_function", method, params)
        .expect("invalid simulation setup")
        .with_frame_pacing()
        .with_observer(Logger)
        .with_observer(&mut recorder)
        .run(40)
        .expect("failed to run simulation");

    let last = recorder.frames().last().expect("no frame recorded");
    let (peak_at, peak) = last
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &x)| if x > best.1 { (i, x) } else { best });
    println!(
        "after {} frames the peak is {peak:.4} at x = {:.3}",
        recorder.frames().len() - 1,
        peak_at as f32 * params.dx
    );
}
