//! End-to-end scenarios driving the full scheduler + driver pipeline against
//! [`tile_sched::MockKernel`], a dense reference convolution. Mirrors the
//! six scenarios used to validate the tiling scheduler against an
//! untiled implementation of the same arithmetic.

use approx::assert_relative_eq;

use tile_sched::{
    schedule_and_run, ActivationKind, DevicePolicy, HardwareConstants, LayerDescriptor, LoadPolicy, MockKernel,
    Padding, PlanKind, SamplingConfig, Stride, TensorShape, Transport,
};

/// Deterministic pseudo-random fill, no external RNG crate needed: a small
/// LCG seeded by the caller plus the element index.
fn fill(len: usize, seed: u32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let x = (i as u32).wrapping_mul(2654435761).wrapping_add(seed);
            ((x >> 8) % 2000) as f32 / 1000.0 - 1.0
        })
        .collect()
}

/// Dense (untiled) reference convolution, independent of the driver/shim
/// code under test: NHWC-padded `inputs`/`weights` in, NCHW `outputs` out.
#[allow(clippy::too_many_arguments)]
fn reference_conv(
    inputs: &[f32],
    weights: &[f32],
    in_shape: TensorShape,
    out_shape: TensorShape,
    kern_shape: TensorShape,
    stride: Stride,
    pad: Padding,
    relu: bool,
) -> Vec<f32> {
    let mut out = vec![0f32; out_shape.channels * out_shape.rows * out_shape.cols];
    for out_row in 0..out_shape.rows {
        for out_col in 0..out_shape.cols {
            for k in 0..out_shape.channels {
                let mut acc = 0.0f32;
                for kr in 0..kern_shape.rows {
                    for kc in 0..kern_shape.cols {
                        let in_row = out_row * stride.rows + kr;
                        let in_col = out_col * stride.cols + kc;
                        if in_row < pad.top || in_col < pad.left {
                            continue;
                        }
                        let in_row = in_row - pad.top;
                        let in_col = in_col - pad.left;
                        if in_row >= in_shape.rows || in_col >= in_shape.cols {
                            continue;
                        }
                        for c in 0..in_shape.channels {
                            let in_idx = (in_row * in_shape.cols + in_col) * in_shape.padded_channels() + c;
                            let wt_idx = ((k * kern_shape.rows + kr) * kern_shape.cols + kc) * kern_shape.padded_channels() + c;
                            acc += inputs[in_idx] * weights[wt_idx];
                        }
                    }
                }
                if relu && acc < 0.0 {
                    acc = 0.0;
                }
                out[(k * out_shape.rows + out_row) * out_shape.cols + out_col] = acc;
            }
        }
    }
    out
}

fn nhwc_buffer(shape: TensorShape, seed: u32) -> Vec<f32> {
    fill(shape.rows * shape.cols * shape.padded_channels(), seed)
}

fn weight_buffer(kernel: TensorShape, out_channels: usize, seed: u32) -> Vec<f32> {
    fill(out_channels * kernel.rows * kernel.cols * kernel.padded_channels(), seed)
}

#[test]
fn small_layer_fits_in_one_of_everything() {
    let hw = HardwareConstants::default();
    let layer = LayerDescriptor {
        inputs: TensorShape::new(32, 32, 16),
        weights: TensorShape::new(3, 3, 16),
        outputs: TensorShape::new(32, 32, 32),
        stride: Stride { rows: 1, cols: 1 },
        pad: Padding {
            top: 1,
            bottom: 1,
            left: 1,
            right: 1,
        },
        activation: ActivationKind::Relu,
        input_req: Transport::Dma,
        weights_req: Transport::Dma,
        output_req: Transport::Dma,
    };
    let padded = layer.nhwc_padded(hw.align);
    let host_inputs = nhwc_buffer(padded.inputs, 1);
    let host_weights = weight_buffer(padded.weights, layer.outputs.channels, 2);
    let mut host_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];

    let report = schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut host_results,
        &hw,
        &DevicePolicy::default(),
        &SamplingConfig::none(),
        &MockKernel,
    )
    .unwrap();

    assert_eq!(report.plan_kind, PlanKind::ActivationPriority);
    assert_eq!(report.total_hw_passes, 4);
    assert_eq!(report.executed_hw_passes, 4);

    let expected = reference_conv(
        &host_inputs,
        &host_weights,
        padded.inputs,
        layer.outputs,
        padded.weights,
        layer.stride,
        layer.pad,
        true,
    );
    for (a, b) in host_results.iter().zip(expected.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }
}

/// Small UMEM forces `num_input_tiles > 1`; verifies row-tile stitching
/// (the advancing row offset / halo arithmetic) against the dense reference.
#[test]
fn row_tiled_layer_matches_reference() {
    let hw = HardwareConstants {
        umem_bytes: 2 * 1024,
        ..HardwareConstants::default()
    };
    let layer = LayerDescriptor {
        inputs: TensorShape::new(16, 16, 2),
        weights: TensorShape::new(5, 5, 2),
        outputs: TensorShape::new(16, 16, 8),
        stride: Stride { rows: 1, cols: 1 },
        pad: Padding {
            top: 2,
            bottom: 2,
            left: 2,
            right: 2,
        },
        activation: ActivationKind::None,
        input_req: Transport::Dma,
        weights_req: Transport::Dma,
        output_req: Transport::Dma,
    };
    let padded = layer.nhwc_padded(hw.align);
    let host_inputs = nhwc_buffer(padded.inputs, 7);
    let host_weights = weight_buffer(padded.weights, layer.outputs.channels, 11);
    let mut host_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];

    let report = schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut host_results,
        &hw,
        &DevicePolicy::default(),
        &SamplingConfig::none(),
        &MockKernel,
    )
    .unwrap();
    assert_eq!(report.total_hw_passes, report.executed_hw_passes);

    let expected = reference_conv(
        &host_inputs,
        &host_weights,
        padded.inputs,
        layer.outputs,
        padded.weights,
        layer.stride,
        layer.pad,
        false,
    );
    for (a, b) in host_results.iter().zip(expected.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-3);
    }
}

/// A tiny SPAD forces `num_output_tiles > 1`; every non-last output tile's
/// `num_ofmaps` must be a multiple of `PE_INSTS` (invariant 5).
#[test]
fn kernel_tiled_layer_matches_reference() {
    // Small enough that both the output-plane bound and the weight
    // scratchpad's whole-kernel bound force `num_output_tiles > 1`, but
    // still large enough that the tighter (kernel) bound clears `pe_insts`
    // and gets rounded down to a clean multiple of it.
    let hw = HardwareConstants {
        spad_bytes: 2304,
        pe_insts: 8,
        ..HardwareConstants::default()
    };
    let layer = LayerDescriptor {
        inputs: TensorShape::new(8, 8, 4),
        weights: TensorShape::new(3, 3, 4),
        outputs: TensorShape::new(8, 8, 24),
        stride: Stride { rows: 1, cols: 1 },
        pad: Padding {
            top: 1,
            bottom: 1,
            left: 1,
            right: 1,
        },
        activation: ActivationKind::Relu,
        input_req: Transport::Dma,
        weights_req: Transport::Dma,
        output_req: Transport::Dma,
    };
    let padded = layer.nhwc_padded(hw.align);
    let host_inputs = nhwc_buffer(padded.inputs, 3);
    let host_weights = weight_buffer(padded.weights, layer.outputs.channels, 4);
    let mut host_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];

    let activation_plan = tile_sched::planner::plan_activation_priority(&layer, &hw, false).unwrap();
    let l2 = &activation_plan.l2_tiles[0];
    let output_tiles = &l2.input_tiles[0].output_tiles;
    assert!(output_tiles.len() > 1);
    for tile in &output_tiles[..output_tiles.len() - 1] {
        assert_eq!(tile.num_ofmaps % hw.pe_insts, 0);
    }

    let report = schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut host_results,
        &hw,
        &DevicePolicy::default(),
        &SamplingConfig::none(),
        &MockKernel,
    )
    .unwrap();
    assert_eq!(report.plan_kind, PlanKind::ActivationPriority);

    let expected = reference_conv(
        &host_inputs,
        &host_weights,
        padded.inputs,
        layer.outputs,
        padded.weights,
        layer.stride,
        layer.pad,
        true,
    );
    for (a, b) in host_results.iter().zip(expected.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-3);
    }
}

/// Sampling a plan with 6 output tiles down to first + one (upscaled) middle
/// + last should run fewer HW passes than the unsampled plan, and the
/// dropped tiles' channels should be left at the shim's dummy-write value.
#[test]
fn sampling_skips_middle_output_tiles() {
    let hw = HardwareConstants {
        spad_bytes: 1024,
        pe_insts: 8,
        ..HardwareConstants::default()
    };
    let layer = LayerDescriptor {
        inputs: TensorShape::new(8, 8, 4),
        weights: TensorShape::new(1, 1, 4),
        outputs: TensorShape::new(8, 8, 48),
        stride: Stride { rows: 1, cols: 1 },
        pad: Padding::default(),
        activation: ActivationKind::None,
        input_req: Transport::Dma,
        weights_req: Transport::Dma,
        output_req: Transport::Dma,
    };
    let padded = layer.nhwc_padded(hw.align);
    let host_inputs = nhwc_buffer(padded.inputs, 5);
    let host_weights = weight_buffer(padded.weights, layer.outputs.channels, 6);

    let activation_plan = tile_sched::planner::plan_activation_priority(&layer, &hw, false).unwrap();
    let output_tiles = &activation_plan.l2_tiles[0].input_tiles[0].output_tiles;
    assert_eq!(output_tiles.len(), 6);

    let mut full_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];
    let full_report = schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut full_results,
        &hw,
        &DevicePolicy::default(),
        &SamplingConfig::none(),
        &MockKernel,
    )
    .unwrap();
    assert_eq!(full_report.total_hw_passes, 6);

    let sampling_cfg = SamplingConfig {
        sampled_output: 1,
        ..SamplingConfig::none()
    };
    let mut sampled_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];
    let sampled_report = schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut sampled_results,
        &hw,
        &DevicePolicy::default(),
        &sampling_cfg,
        &MockKernel,
    )
    .unwrap();

    // first (tile 0), one upscaled middle (tile 1), and last (tile 5) run.
    assert_eq!(sampled_report.total_hw_passes, 3);
    assert_eq!(sampled_report.executed_hw_passes, 3);

    let executed_tiles = [0usize, 1, 5];
    let channels_per_tile = 8;
    for k in 0..layer.outputs.channels {
        let tile = k / channels_per_tile;
        let plane = layer.outputs.rows * layer.outputs.cols;
        let actual = &sampled_results[k * plane..(k + 1) * plane];
        if executed_tiles.contains(&tile) {
            let expected = &full_results[k * plane..(k + 1) * plane];
            for (a, b) in actual.iter().zip(expected.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-4);
            }
        } else {
            assert!(actual.iter().all(|&v| v == 0.0), "skipped tile {tile} should be left at the shim's dummy value");
        }
    }
}

/// A small spatial footprint plus a tiny UMEM drives `Tin > 1` in the
/// activation-priority plan, which inflates its weight-reload cost enough
/// for the gate to prefer weight-priority instead.
#[test]
fn weight_priority_selected_and_matches_reference() {
    let hw = HardwareConstants {
        umem_bytes: 32 * 1024,
        ..HardwareConstants::default()
    };
    let layer = LayerDescriptor {
        inputs: TensorShape::new(14, 14, 512),
        weights: TensorShape::new(1, 1, 512),
        outputs: TensorShape::new(14, 14, 512),
        stride: Stride { rows: 1, cols: 1 },
        pad: Padding::default(),
        activation: ActivationKind::Relu,
        input_req: Transport::Dma,
        weights_req: Transport::Dma,
        output_req: Transport::Dma,
    };
    let padded = layer.nhwc_padded(hw.align);
    let host_inputs = nhwc_buffer(padded.inputs, 9);
    let host_weights = weight_buffer(padded.weights, layer.outputs.channels, 13);
    let mut host_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];

    let report = schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut host_results,
        &hw,
        &DevicePolicy::default(),
        &SamplingConfig::none(),
        &MockKernel,
    )
    .unwrap();
    assert_eq!(report.plan_kind, PlanKind::WeightPriority);

    let expected = reference_conv(
        &host_inputs,
        &host_weights,
        padded.inputs,
        layer.outputs,
        padded.weights,
        layer.stride,
        layer.pad,
        true,
    );
    for (a, b) in host_results.iter().zip(expected.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-3);
    }
}

/// Single-HW-pass output tiles (`num_ofmaps == PE_INSTS`) with ACP weights
/// exercise the prefetch-dispatch path; `trace_mode` must make it a no-op
/// without changing the computed result.
#[test]
fn prefetch_contention_does_not_affect_result() {
    let hw = HardwareConstants {
        spad_bytes: 1152,
        pe_insts: 8,
        ..HardwareConstants::default()
    };
    let layer = LayerDescriptor {
        inputs: TensorShape::new(8, 8, 4),
        weights: TensorShape::new(3, 3, 4),
        outputs: TensorShape::new(8, 8, 24),
        stride: Stride { rows: 1, cols: 1 },
        pad: Padding {
            top: 1,
            bottom: 1,
            left: 1,
            right: 1,
        },
        activation: ActivationKind::None,
        input_req: Transport::Dma,
        weights_req: Transport::Dma,
        output_req: Transport::Dma,
    };
    let padded = layer.nhwc_padded(hw.align);
    let host_inputs = nhwc_buffer(padded.inputs, 21);
    let host_weights = weight_buffer(padded.weights, layer.outputs.channels, 22);

    let device_policy = DevicePolicy {
        weights_load_policy: LoadPolicy::AcpAlways,
        use_sw_prefetch: true,
        ..DevicePolicy::default()
    };

    let mut prefetch_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];
    schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut prefetch_results,
        &hw,
        &device_policy,
        &SamplingConfig::none(),
        &MockKernel,
    )
    .unwrap();

    let trace_cfg = SamplingConfig {
        trace_mode: true,
        ..SamplingConfig::none()
    };
    let mut trace_results = vec![0f32; layer.outputs.channels * layer.outputs.rows * layer.outputs.cols];
    schedule_and_run(
        &host_inputs,
        &host_weights,
        std::slice::from_ref(&layer),
        0,
        &mut trace_results,
        &hw,
        &device_policy,
        &trace_cfg,
        &MockKernel,
    )
    .unwrap();

    for (a, b) in prefetch_results.iter().zip(trace_results.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-6);
    }
}

/// Planning is a pure function: two calls on the same descriptor must
/// produce structurally equal trees.
#[test]
fn planning_is_idempotent() {
    let hw = HardwareConstants::default();
    let layer = LayerDescriptor {
        inputs: TensorShape::new(32, 32, 16),
        weights: TensorShape::new(3, 3, 16),
        outputs: TensorShape::new(32, 32, 32),
        stride: Stride { rows: 1, cols: 1 },
        pad: Padding {
            top: 1,
            bottom: 1,
            left: 1,
            right: 1,
        },
        activation: ActivationKind::Relu,
        input_req: Transport::Dma,
        weights_req: Transport::Dma,
        output_req: Transport::Dma,
    };
    let first = tile_sched::planner::plan_activation_priority(&layer, &hw, false).unwrap();
    let second = tile_sched::planner::plan_activation_priority(&layer, &hw, false).unwrap();
    assert_eq!(first, second);
}
