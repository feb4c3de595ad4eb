//! GPU integration tests. Compare the compute evaluator with the CPU path.
//!
//! Run with: `cargo test -p curvenode-gpu`. Tests return early when no
//! adapter is available.

use std::sync::{Mutex, OnceLock};

use curvenode_core::{CurveMapping, Extrapolation, apply_color4, apply_vector3};
use curvenode_gpu::{CurvesCompute, ShaderVariant, pack, request_headless_device};
use glam::{Vec3, Vec4};

const EPSILON: f32 = 1e-4;

fn gpu_test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Build the evaluator, or `None` (with a note) when no adapter exists.
fn create_test_compute() -> Option<CurvesCompute> {
    match request_headless_device() {
        Ok((device, queue)) => Some(CurvesCompute::new(device, queue)),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn sample_colors() -> Vec<[f32; 4]> {
    (0..97)
        .map(|i| {
            let t = i as f32 / 96.0;
            [t * 1.4 - 0.2, 1.0 - t, (t * 7.0).fract(), t * 0.5 + 0.25]
        })
        .collect()
}

fn assert_close(gpu: [f32; 4], cpu: Vec4, what: &str) {
    for c in 0..4 {
        assert!(
            (gpu[c] - cpu[c]).abs() < EPSILON,
            "{what} channel {c}: gpu={} cpu={}",
            gpu[c],
            cpu[c],
        );
    }
}

#[test]
fn test_rgb_matches_cpu() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(compute) = create_test_compute() else {
        return;
    };

    let mut mapping = CurveMapping::color();
    mapping.insert_point(0, 0.3, 0.6).unwrap();
    mapping.insert_point(1, 0.7, 0.4).unwrap();
    mapping.insert_point(3, 0.5, 0.2).unwrap();
    assert_eq!(pack(&mapping, &mut Default::default()).variant, ShaderVariant::Rgb);

    let inputs = sample_colors();
    let facs: Vec<f32> = (0..inputs.len()).map(|i| [1.0, 0.5, 0.0][i % 3]).collect();
    let results = compute.evaluate_mapping(&mapping, &facs, &inputs).unwrap();
    assert_eq!(results.len(), inputs.len());

    for (i, (gpu, input)) in results.iter().zip(&inputs).enumerate() {
        let cpu = apply_color4(&mapping, facs[i], Vec4::from_array(*input));
        assert_close(*gpu, cpu, &format!("element {i}"));
    }
}

#[test]
fn test_fast_path_matches_cpu() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(compute) = create_test_compute() else {
        return;
    };

    let mut mapping = CurveMapping::color();
    mapping.insert_point(3, 0.25, 0.75).unwrap();
    assert_eq!(
        pack(&mapping, &mut Default::default()).variant,
        ShaderVariant::RgbOpti
    );

    let inputs = sample_colors();
    let facs = vec![1.0; inputs.len()];
    let results = compute.evaluate_mapping(&mapping, &facs, &inputs).unwrap();
    for (i, (gpu, input)) in results.iter().zip(&inputs).enumerate() {
        let cpu = apply_color4(&mapping, 1.0, Vec4::from_array(*input));
        assert_close(*gpu, cpu, &format!("element {i}"));
    }
}

#[test]
fn test_vector_extrapolation_matches_cpu() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(compute) = create_test_compute() else {
        return;
    };

    let mut mapping = CurveMapping::vector();
    mapping.insert_point(0, 0.0, 0.4).unwrap();
    mapping.insert_point(2, -0.5, -0.1).unwrap();
    mapping.set_extend(Extrapolation::Extrapolate);

    let inputs: Vec<[f32; 4]> = (0..40)
        .map(|i| {
            let t = i as f32 / 39.0 * 4.0 - 2.0;
            [t, -t, t * 0.5, 0.33]
        })
        .collect();
    let facs = vec![1.0; inputs.len()];
    let results = compute.evaluate_mapping(&mapping, &facs, &inputs).unwrap();

    for (i, (gpu, input)) in results.iter().zip(&inputs).enumerate() {
        let cpu = apply_vector3(&mapping, 1.0, Vec3::new(input[0], input[1], input[2]));
        assert_close(*gpu, cpu.extend(input[3]), &format!("element {i}"));
    }
}

#[test]
fn test_workgroup_tail_is_covered() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(compute) = create_test_compute() else {
        return;
    };

    // 65 is one past a full workgroup.
    let mapping = CurveMapping::color();
    let inputs = vec![[0.5f32; 4]; 65];
    let facs = vec![1.0; 65];
    let results = compute.evaluate_mapping(&mapping, &facs, &inputs).unwrap();
    assert!(results.iter().all(|r| (r[0] - 0.5).abs() < EPSILON));
}

#[test]
fn test_mismatched_lengths_are_rejected() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(compute) = create_test_compute() else {
        return;
    };
    let err = compute
        .evaluate_mapping(&CurveMapping::color(), &[1.0], &[[0.0; 4], [1.0; 4]])
        .unwrap_err();
    assert!(err.to_string().contains("2 inputs"));
}

#[test]
fn test_concurrent_calls_keep_their_own_uniforms() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(compute) = create_test_compute() else {
        return;
    };

    let mut raised = CurveMapping::color();
    raised.move_point(0, 0, 0.0, 0.5).unwrap();
    let mut lowered = CurveMapping::color();
    lowered.move_point(0, 1, 1.0, 0.25).unwrap();

    let inputs = sample_colors();
    let facs = vec![1.0; inputs.len()];
    std::thread::scope(|scope| {
        for mapping in [&raised, &lowered] {
            let (compute, inputs, facs) = (&compute, &inputs, &facs);
            scope.spawn(move || {
                for _ in 0..8 {
                    let results = compute.evaluate_mapping(mapping, facs, inputs).unwrap();
                    for (i, (gpu, input)) in results.iter().zip(inputs).enumerate() {
                        let cpu = apply_color4(mapping, 1.0, Vec4::from_array(*input));
                        assert_close(*gpu, cpu, &format!("element {i}"));
                    }
                }
            });
        }
    });
}
