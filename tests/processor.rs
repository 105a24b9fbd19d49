//! End-to-end checks of the simulation processor on both backends.

use std::sync::Arc;

use thermal::{
    DeviceField, Field, Float, Method, MethodRegistry, ProcessError, RegistryError,
    SimulationProcessor, StepParams,
};

mod common;
use common::{assert_close, gpu_context, ramp, random_field, SCHEMES};

const N: usize = 239239;

fn processor() -> SimulationProcessor {
    match gpu_context() {
        Some(context) => SimulationProcessor::new(context),
        None => SimulationProcessor::host_only(),
    }
}

fn transport() -> StepParams {
    StepParams::new(1.0, 1.0, 0.2, 1.0)
}

#[test]
fn method_names_are_sorted_and_suffixed() {
    let names = SimulationProcessor::host_only().get_method_names().unwrap();
    let expected: Vec<_> = SCHEMES.iter().map(|s| format!("{s}_cpu")).collect();
    assert_eq!(names, expected);

    if let Some(context) = gpu_context() {
        let names = SimulationProcessor::new(context).get_method_names().unwrap();
        assert_eq!(names.len(), 2 * SCHEMES.len());
        assert!(names.windows(2).all(|w| w[0] < w[1]));
        for scheme in SCHEMES {
            assert!(names.contains(&format!("{scheme}_gpu")));
            assert!(names.contains(&format!("{scheme}_cpu")));
        }
    }
}

#[test]
fn all_methods_runnable() {
    let processor = processor();
    let ts = random_field(N, 239);

    for name in processor.get_method_names().unwrap() {
        let input = ts.clone();
        let res = processor
            .process_values(&input, &transport(), &name, 1)
            .unwrap();

        assert_eq!(res.len(), N, "{name}");
        assert!(res.iter().all(|x| !x.is_nan()), "NaN in {name}");
        assert_eq!((res[0], res[N - 1]), (ts[0], ts[N - 1]), "borders move in {name}");
        assert_eq!(input, ts, "{name} affects its input");
    }
}

#[test]
fn still_fields_are_left_unchanged() {
    let processor = processor();
    let ts = random_field(500, 7);
    let params = StepParams::new(0.01, 0.1, 0.0, 0.0);

    for name in processor.get_method_names().unwrap() {
        let res = processor.process_values(&ts, &params, &name, 5).unwrap();
        assert_close(&res, &ts, 1e-6, 0.0, &name);
    }
}

#[test]
fn simple_linear_keeps_a_ramp() {
    let processor = processor();
    let ts = ramp(N);

    for name in processor.get_method_names().unwrap() {
        if name.starts_with("simple_linear") {
            let res = processor.process_values(&ts, &transport(), &name, 10).unwrap();
            assert_close(&res, &ts, 1e-3, 1e-5, &name);
        }
    }
}

#[test]
fn simple_linear_is_a_weighted_average() {
    let processor = processor();
    let u = 0.3;
    let ts = random_field(N, 239);
    let params = StepParams::new(1.0, 1.0, u, 1.0);

    let mut expected = ts.clone();
    for i in 1..N - 1 {
        expected[i] = (u * ts[i - 1] + ts[i] + u * ts[i + 1]) / (u + 1.0 + u);
    }

    for name in processor.get_method_names().unwrap() {
        if name.starts_with("simple_linear") {
            let res = processor.process_values(&ts, &params, &name, 1).unwrap();
            assert_close(&res, &expected, 1e-6, 1e-5, &name);
        }
    }
}

#[test]
fn transport_of_a_ramp_stays_close() {
    let processor = processor();
    let ts = ramp(N);

    // a ramp only shifts by u*dt/dx = 0.2, rounding of f32 near 2.4e5 included
    for name in processor.get_method_names().unwrap() {
        if name.starts_with("explicit_central") || name.starts_with("implicit_") {
            let res = processor.process_values(&ts, &transport(), &name, 10).unwrap();
            assert_close(&res, &ts, 0.75, 1e-5, &name);
        }
    }
}

#[test]
fn backends_agree() {
    let Some(context) = gpu_context() else {
        return;
    };
    let processor = SimulationProcessor::new(context);

    for (n, params) in [
        (1000, StepParams::new(0.01, 0.1, 0.1, 0.0025)),
        (N, transport()),
    ] {
        let ts = random_field(n, 42);
        for scheme in SCHEMES {
            let host = processor
                .process_values(&ts, &params, &format!("{scheme}_cpu"), 10)
                .unwrap();
            let device = processor
                .process_values(&ts, &params, &format!("{scheme}_gpu"), 10)
                .unwrap();
            assert_close(&device, &host, 1e-4, 1e-4, &format!("{scheme} (n={n})"));
        }
    }
}

#[test]
fn device_borders_are_exact_over_sub_steps() {
    let Some(context) = gpu_context() else {
        return;
    };
    let processor = SimulationProcessor::new(context);
    let ts = random_field(N, 5);

    for scheme in SCHEMES {
        let name = format!("{scheme}_gpu");
        for iters in [2, 7] {
            let res = processor.process_values(&ts, &transport(), &name, iters).unwrap();
            assert_eq!(res[0], ts[0], "{name}, iters={iters}");
            assert_eq!(res[N - 1], ts[N - 1], "{name}, iters={iters}");
            assert!(res.iter().all(|x| x.is_finite()), "{name}, iters={iters}");
        }
    }
}

#[test]
fn implicit_device_solves_span_long_fields() {
    let Some(context) = gpu_context() else {
        return;
    };
    let processor = SimulationProcessor::new(context);
    let still = StepParams::new(1.0, 1.0, 0.0, 0.0);

    // past 2^16 rows, several serial chunks per sweep
    for n in [65537, 65538, 100_000] {
        let ts = ramp(n);
        for scheme in ["implicit_by_flow", "implicit_central", "implicit_counter_flow"] {
            let res = processor
                .process_values(&ts, &still, &format!("{scheme}_gpu"), 3)
                .unwrap();
            let mismatch = res.iter().zip(&ts).position(|(a, b)| a != b);
            assert_eq!(mismatch, None, "{scheme} (n={n})");
        }
    }
}

#[test]
fn device_fields_chain_without_readback() {
    let Some(context) = gpu_context() else {
        return;
    };
    let processor = SimulationProcessor::new(Arc::clone(&context));
    let ts = random_field(4096, 3);
    let params = StepParams::new(0.01, 0.1, 0.1, 0.0025);

    let mut host = Field::from(ts.clone());
    let mut device = Field::from(DeviceField::upload(&context, &ts));
    for _ in 0..5 {
        host = processor
            .process(&host, &params, "explicit_leapfrog_cpu", 3)
            .unwrap();
        device = processor
            .process(&device, &params, "explicit_leapfrog_gpu", 3)
            .unwrap();
        assert!(device.is_on_device());
    }

    assert_close(
        &device.into_host().unwrap(),
        &host.into_host().unwrap(),
        1e-4,
        1e-4,
        "chained leapfrog",
    );
}

#[test]
fn device_input_is_not_modified() {
    let Some(context) = gpu_context() else {
        return;
    };
    let processor = SimulationProcessor::new(Arc::clone(&context));
    let ts = random_field(300, 11);
    let input = Field::from(DeviceField::upload(&context, &ts));

    for scheme in SCHEMES {
        let res = processor
            .process(&input, &transport(), &format!("{scheme}_gpu"), 4)
            .unwrap()
            .into_host()
            .unwrap();
        assert_eq!(input.to_host().unwrap().as_ref(), ts.as_slice(), "{scheme}");
        assert_eq!((res[0], res[299]), (ts[0], ts[299]), "{scheme}");
    }
}

#[test]
fn device_methods_need_a_device() {
    let processor = SimulationProcessor::host_only();
    let err = processor
        .process_values(&ramp(10), &transport(), "explicit_central_gpu", 1)
        .unwrap_err();
    assert!(matches!(err, ProcessError::UnknownMethod(_)));
}

#[test]
fn namespace_collisions_are_fatal() {
    let mut registry = MethodRegistry::build(None).unwrap();
    let err = registry
        .insert("explicit_central_cpu", Method::Host(thermal::methods::explicit_central))
        .unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("explicit_central_cpu".into()));
}

#[test]
fn courant_override_drives_the_step() {
    let processor = SimulationProcessor::host_only();
    let ts: Vec<Float> = ramp(32);
    // u = 0 but s forced: the ramp shifts by s per sub-step
    let params = StepParams::new(1.0, 1.0, 0.0, 0.0).with_courant(0.1);
    let res = processor
        .process_values(&ts, &params, "explicit_counter_flow_cpu", 4)
        .unwrap();
    assert!((res[16] - (ts[16] - 0.4)).abs() < 1e-5, "{}", res[16]);
}
