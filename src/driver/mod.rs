//! Execution driver (component I). Grounded on
//! `smv_standard_convolution_layer_impl` in `smv/convolution.c`: walks the
//! chosen plan in nesting order, consulting the operand policy oracle per
//! tile, dispatching prefetch jobs to the worker pool, invoking the
//! external compute primitive, and stitching NHWC tile results back into
//! the caller's NCHW output buffer.

mod shim;

use tracing::{debug, debug_span};

use crate::compute::{AccessConfig, ConvolutionKernel, HwPassOptions, OperandPointers};
use crate::config::{DevicePolicy, HardwareConstants, SamplingConfig};
use crate::error::{Result, SchedulerError};
use crate::layer::{LayerDescriptor, Transport};
use crate::planner::{plan_activation_priority, select_plan};
use crate::policy;
use crate::pool::{PrefetchJob, WorkerPool};
use crate::primitives::tile::{InputTile, L2Tile, OutputTile, Plan, PlanKind, WtInputTile, WtOutputTile};
use crate::sampling::annotate_plan;

const DEFAULT_WORKER_COUNT: usize = 4;
/// Assumed interconnect bandwidth used to size the prefetch-contention
/// delay, matching the source's `current_tile_load_size / 10.0` (ns,
/// assuming 10 GB/s).
const ASSUMED_BANDWIDTH_BYTES_PER_NS: f64 = 10.0;

/// Summary of one [`schedule_and_run`] call, for observability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub plan_kind: PlanKind,
    pub total_hw_passes: usize,
    pub executed_hw_passes: usize,
}

struct Stats {
    total: usize,
    executed: usize,
}

/// Runs the tiling scheduler and execution driver for `layers[lnum]`.
///
/// `host_inputs` / `host_weights` must already be NHWC-packed and
/// channel-aligned per [`HardwareConstants::align`]; `host_results` is
/// written in NCHW order. All three buffers must cover the full (untiled)
/// layer.
#[allow(clippy::too_many_arguments)]
pub fn schedule_and_run<K: ConvolutionKernel>(
    host_inputs: &[f32],
    host_weights: &[f32],
    layers: &[LayerDescriptor],
    lnum: usize,
    host_results: &mut [f32],
    hw: &HardwareConstants,
    device_policy: &DevicePolicy,
    sampling_cfg: &SamplingConfig,
    kernel: &K,
) -> Result<RunReport> {
    let layer = layers.get(lnum).ok_or_else(|| SchedulerError::InfeasibleTiling {
        lnum,
        reason: "layer index out of range".into(),
    })?;

    let activation_plan = plan_activation_priority(layer, hw, device_policy.use_pipelined_dma)?;
    let (mut plan, cost) = select_plan(layer, hw, device_policy, &activation_plan)?;
    debug!(cost_activation = cost.cost_activation, cost_weight = cost.cost_weight, chosen = ?cost.chosen, "cost gate decision");
    annotate_plan(&mut plan, sampling_cfg);

    let pool = if device_policy.use_sw_prefetch && !sampling_cfg.trace_mode {
        Some(WorkerPool::new(DEFAULT_WORKER_COUNT))
    } else {
        None
    };

    let mut stats = Stats { total: 0, executed: 0 };

    match &plan {
        Plan::ActivationPriority(activation) => {
            walk_activation_plan(
                activation,
                layer,
                hw,
                device_policy,
                pool.as_ref(),
                host_inputs,
                host_weights,
                host_results,
                kernel,
                &mut stats,
            );
        }
        Plan::WeightPriority(weight) => {
            walk_weight_plan(
                weight,
                layer,
                hw,
                device_policy,
                pool.as_ref(),
                host_inputs,
                host_weights,
                host_results,
                kernel,
                &mut stats,
            );
        }
    }

    if let Some(pool) = &pool {
        pool.join();
    }

    Ok(RunReport {
        plan_kind: plan.kind(),
        total_hw_passes: stats.total,
        executed_hw_passes: stats.executed,
    })
}

/// Builds the tile-scoped layer descriptor a HW pass runs against.
fn partial_layer_from_tile(
    layer: &LayerDescriptor,
    input_shape: crate::layer::TensorShape,
    output_shape: crate::layer::TensorShape,
    pad: crate::layer::Padding,
    weights_shape: crate::layer::TensorShape,
) -> LayerDescriptor {
    let mut partial = layer.clone_for_tile();
    partial.inputs = input_shape;
    partial.outputs = output_shape;
    partial.weights = weights_shape;
    partial.pad = pad;
    partial
}

#[allow(clippy::too_many_arguments)]
fn walk_activation_plan<K: ConvolutionKernel>(
    plan: &crate::primitives::tile::ActivationPlan,
    layer: &LayerDescriptor,
    hw: &HardwareConstants,
    device_policy: &DevicePolicy,
    pool: Option<&WorkerPool>,
    host_inputs: &[f32],
    host_weights: &[f32],
    host_results: &mut [f32],
    kernel: &K,
    stats: &mut Stats,
) {
    let padded = layer.nhwc_padded(hw.align);
    let in_row_stripe = padded.inputs.row_stripe_elems();
    let wt_kernel_elems = padded.weights.rows * padded.weights.cols * padded.weights.padded_channels();
    let kernel_rows = padded.kernel_rows();
    let stride_rows = layer.stride.rows.max(1);
    let halo = kernel_rows.saturating_sub(stride_rows);

    let mut l2_kern_start = 0usize;
    for l2 in &plan.l2_tiles {
        let _span = debug_span!("l2_tile", num_kernels = l2.num_kernels, execute = l2.execute).entered();
        if !l2.execute {
            shim_l2_tile(l2, host_weights, host_results, l2_kern_start, &padded, hw);
            l2_kern_start += l2.num_kernels;
            continue;
        }

        let mut input_row_start = 0usize;
        let mut result_row_start = 0usize;
        for (it_idx, input_tile) in l2.input_tiles.iter().enumerate() {
            let advance = input_tile.input_shape.rows.saturating_sub(halo).max(1);
            let nominal_output_rows = input_tile.output_tiles.first().map(|t| t.output_shape.rows).unwrap_or(0);

            if !input_tile.execute {
                shim_input_tile(input_tile, host_inputs, host_weights, host_results, input_row_start, l2_kern_start, &padded, hw, in_row_stripe);
                input_row_start += advance;
                result_row_start += nominal_output_rows;
                continue;
            }

            let _span = debug_span!("input_tile", index = it_idx, execute = true).entered();
            let in_elem_start = input_row_start * in_row_stripe;

            let mut out_kern_start = l2_kern_start;
            for (ot_idx, output_tile) in input_tile.output_tiles.iter().enumerate() {
                if !output_tile.execute {
                    shim_output_tile(output_tile, host_weights, host_results, out_kern_start, &padded, hw);
                    out_kern_start += output_tile.num_ofmaps;
                    continue;
                }

                let _span = debug_span!("output_tile", index = ot_idx, num_ofmaps = output_tile.num_ofmaps).entered();

                maybe_prefetch_next_weights(
                    pool,
                    device_policy,
                    layer,
                    host_weights,
                    hw,
                    l2.input_tiles.len(),
                    output_tile,
                    input_tile.output_tiles.get(ot_idx + 1),
                    out_kern_start,
                    wt_kernel_elems,
                );

                run_output_tile_passes(
                    output_tile,
                    layer,
                    hw,
                    device_policy,
                    host_inputs,
                    host_weights,
                    host_results,
                    kernel,
                    stats,
                    input_tile.input_shape,
                    input_tile.pad,
                    padded.weights,
                    in_elem_start,
                    out_kern_start,
                    result_row_start,
                    padded.outputs,
                    l2.input_tiles.len(),
                    it_idx,
                );

                out_kern_start += output_tile.num_ofmaps;
            }

            input_row_start += advance;
            result_row_start += nominal_output_rows;
        }

        l2_kern_start += l2.num_kernels;
    }
}

#[allow(clippy::too_many_arguments)]
fn run_output_tile_passes<K: ConvolutionKernel>(
    output_tile: &OutputTile,
    layer: &LayerDescriptor,
    hw: &HardwareConstants,
    device_policy: &DevicePolicy,
    host_inputs: &[f32],
    host_weights: &[f32],
    host_results: &mut [f32],
    kernel: &K,
    stats: &mut Stats,
    input_shape: crate::layer::TensorShape,
    pad: crate::layer::Padding,
    weights_shape: crate::layer::TensorShape,
    in_elem_start: usize,
    out_kern_start: usize,
    result_row_start: usize,
    full_output_shape: crate::layer::TensorShape,
    num_input_tiles: usize,
    input_tile_idx: usize,
) {
    let mut scratch = vec![0f32; output_tile.output_shape.rows * output_tile.output_shape.cols * output_tile.num_ofmaps];

    let weights_transport = policy::weights_transport(
        device_policy,
        layer,
        PlanKind::ActivationPriority,
        num_input_tiles,
        output_tile.num_hw_passes,
    );
    let inputs_transport = policy::inputs_transport(
        device_policy,
        layer,
        PlanKind::ActivationPriority,
        1,
        output_tile.num_hw_passes,
    );
    let outputs_transport = policy::output_transport(layer);

    for pass in &output_tile.hw_passes {
        let _span = debug_span!("hw_pass", kern_start = pass.kern_start, kern_end = pass.kern_end, execute = pass.execute).entered();
        stats.total += 1;
        if !pass.execute {
            let weight_start = (out_kern_start + pass.kern_start) * weights_shape.rows * weights_shape.cols * weights_shape.padded_channels();
            let weight_len = pass.kern_count() * weights_shape.rows * weights_shape.cols * weights_shape.padded_channels();
            let output_start = ((out_kern_start + pass.kern_start) * full_output_shape.rows + result_row_start) * full_output_shape.cols;
            let output_len = pass.kern_count() * output_tile.output_shape.rows * output_tile.output_shape.cols;
            shim::shim_hw_pass(
                host_weights,
                host_results,
                weight_start,
                weight_len,
                output_start,
                output_len,
                hw.cache_line_bytes,
                hw.bytes_per_elem,
            );
            continue;
        }
        stats.executed += 1;

        let partial = partial_layer_from_tile(layer, input_shape, output_tile.output_shape, pad, weights_shape);

        let inputs_req = if pass.load_inputs_first { inputs_transport } else { Transport::None };
        let weights_req = if pass.kern_start == 0 && input_tile_idx == 0 { weights_transport } else { Transport::None };
        let access = AccessConfig {
            inputs: inputs_req,
            weights: weights_req,
            outputs: outputs_transport,
        };

        let weight_elem_start = (out_kern_start + pass.kern_start) * weights_shape.rows * weights_shape.cols * weights_shape.padded_channels();

        let operands = build_operand_pointers(host_inputs, host_weights, host_results, in_elem_start, weight_elem_start, &access);

        let opts = HwPassOptions {
            img: pass.img,
            kern_start: pass.kern_start,
            kern_end: pass.kern_end,
            total_tile_ofmaps: pass.total_tile_ofmaps,
            execute: pass.execute,
            upscale: pass.upscale,
            load_inputs_first: pass.load_inputs_first,
            use_pipelined_dma: pass.use_pipelined_dma,
            activation: layer.activation,
        };

        kernel.run_pass(operands, access, &partial, opts, &mut scratch);
    }

    for local_k in 0..output_tile.num_ofmaps {
        let k_global = out_kern_start + local_k;
        for r in 0..output_tile.output_shape.rows {
            for c in 0..output_tile.output_shape.cols {
                let nhwc_idx = (r * output_tile.output_shape.cols + c) * output_tile.num_ofmaps + local_k;
                let nchw_idx = (k_global * full_output_shape.rows + (result_row_start + r)) * full_output_shape.cols + c;
                if nchw_idx < host_results.len() {
                    host_results[nchw_idx] = scratch[nhwc_idx];
                }
            }
        }
    }
}

fn build_operand_pointers(
    host_inputs: &[f32],
    host_weights: &[f32],
    host_results: &mut [f32],
    in_elem_start: usize,
    weight_elem_start: usize,
    access: &AccessConfig,
) -> OperandPointers {
    let in_ptr = unsafe { host_inputs.as_ptr().add(in_elem_start.min(host_inputs.len())) as *const u8 };
    let wt_ptr = unsafe { host_weights.as_ptr().add(weight_elem_start.min(host_weights.len())) as *const u8 };
    let out_ptr = host_results.as_mut_ptr() as *mut u8;

    let slot = |transport: Transport, ptr: *const u8| -> (*const u8, *const u8, *const u8) {
        match transport {
            Transport::Dma => (ptr, std::ptr::null(), std::ptr::null()),
            Transport::Acp => (std::ptr::null(), std::ptr::null(), ptr),
            Transport::None => (std::ptr::null(), ptr, std::ptr::null()),
        }
    };

    let (inputs_dma, inputs_cache, inputs_acp) = slot(access.inputs, in_ptr);
    let (weights_dma, weights_cache, weights_acp) = slot(access.weights, wt_ptr);

    OperandPointers {
        inputs_dma,
        inputs_cache,
        inputs_acp,
        weights_dma,
        weights_cache,
        weights_acp,
        outputs_dma: out_ptr,
        outputs_cache: std::ptr::null_mut(),
        outputs_acp: std::ptr::null_mut(),
    }
}

#[allow(clippy::too_many_arguments)]
fn maybe_prefetch_next_weights(
    pool: Option<&WorkerPool>,
    device_policy: &DevicePolicy,
    layer: &LayerDescriptor,
    host_weights: &[f32],
    hw: &HardwareConstants,
    num_input_tiles: usize,
    current: &OutputTile,
    next: Option<&OutputTile>,
    out_kern_start: usize,
    wt_kernel_elems: usize,
) {
    let Some(pool) = pool else { return };
    let Some(next_tile) = next else { return };

    let transport = policy::weights_transport(device_policy, layer, PlanKind::ActivationPriority, num_input_tiles, current.num_hw_passes);
    if !matches!(transport, Transport::Acp) {
        return;
    }

    let next_start_elem = (out_kern_start + current.num_ofmaps) * wt_kernel_elems;
    let len_bytes = next_tile.num_ofmaps * wt_kernel_elems * hw.bytes_per_elem;
    if len_bytes == 0 {
        return;
    }
    let use_pf_delay = current.num_hw_passes == 1;
    let delay_ns = if use_pf_delay {
        (len_bytes as f64 / ASSUMED_BANDWIDTH_BYTES_PER_NS) as u64
    } else {
        0
    };

    let base = unsafe { host_weights.as_ptr().add(next_start_elem.min(host_weights.len())) as *const u8 };
    let job = unsafe { PrefetchJob::new(base, len_bytes, 0, delay_ns, hw.cache_line_bytes) };
    pool.dispatch(job);
}

fn shim_l2_tile(
    l2: &L2Tile,
    host_weights: &[f32],
    host_results: &mut [f32],
    l2_kern_start: usize,
    padded: &LayerDescriptor,
    hw: &HardwareConstants,
) {
    let wt_kernel_elems = padded.weights.rows * padded.weights.cols * padded.weights.padded_channels();
    let weight_start = l2_kern_start * wt_kernel_elems;
    let weight_len = l2.num_kernels * wt_kernel_elems;
    let output_start = l2_kern_start * padded.outputs.rows * padded.outputs.cols;
    let output_len = l2.num_kernels * padded.outputs.rows * padded.outputs.cols;
    shim::shim_hw_pass(host_weights, host_results, weight_start, weight_len, output_start, output_len, hw.cache_line_bytes, hw.bytes_per_elem);
}

fn shim_input_tile(
    input_tile: &InputTile,
    host_inputs: &[f32],
    host_weights: &[f32],
    host_results: &mut [f32],
    input_row_start: usize,
    l2_kern_start: usize,
    padded: &LayerDescriptor,
    hw: &HardwareConstants,
    in_row_stripe: usize,
) {
    shim::shim_input_read(host_inputs, input_row_start * in_row_stripe, input_tile.input_shape.rows * in_row_stripe, hw.cache_line_bytes, hw.bytes_per_elem);
    let mut out_kern_start = l2_kern_start;
    for output_tile in &input_tile.output_tiles {
        shim_output_tile(output_tile, host_weights, host_results, out_kern_start, padded, hw);
        out_kern_start += output_tile.num_ofmaps;
    }
}

fn shim_output_tile(
    output_tile: &OutputTile,
    host_weights: &[f32],
    host_results: &mut [f32],
    out_kern_start: usize,
    padded: &LayerDescriptor,
    hw: &HardwareConstants,
) {
    let wt_kernel_elems = padded.weights.rows * padded.weights.cols * padded.weights.padded_channels();
    let weight_start = out_kern_start * wt_kernel_elems;
    let weight_len = output_tile.num_ofmaps * wt_kernel_elems;
    let output_start = out_kern_start * padded.outputs.rows * padded.outputs.cols;
    let output_len = output_tile.num_ofmaps * output_tile.output_shape.rows * output_tile.output_shape.cols;
    shim::shim_hw_pass(host_weights, host_results, weight_start, weight_len, output_start, output_len, hw.cache_line_bytes, hw.bytes_per_elem);
}

#[allow(clippy::too_many_arguments)]
fn walk_weight_plan<K: ConvolutionKernel>(
    plan: &crate::primitives::tile::WeightPlan,
    layer: &LayerDescriptor,
    hw: &HardwareConstants,
    device_policy: &DevicePolicy,
    pool: Option<&WorkerPool>,
    host_inputs: &[f32],
    host_weights: &[f32],
    host_results: &mut [f32],
    kernel: &K,
    stats: &mut Stats,
) {
    let padded = layer.nhwc_padded(hw.align);
    let in_row_stripe = padded.inputs.row_stripe_elems();
    let wt_kernel_elems = padded.weights.rows * padded.weights.cols * padded.weights.padded_channels();
    let kernel_rows = padded.kernel_rows();
    let stride_rows = layer.stride.rows.max(1);
    let halo = kernel_rows.saturating_sub(stride_rows);

    let mut out_kern_start = 0usize;
    for (ot_idx, output_tile) in plan.output_tiles.iter().enumerate() {
        let _span = debug_span!("output_tile", index = ot_idx, num_ofmaps = output_tile.num_ofmaps).entered();
        if !output_tile.execute {
            shim_wt_output_tile(output_tile, host_inputs, host_weights, host_results, out_kern_start, &padded, hw, in_row_stripe);
            out_kern_start += output_tile.num_ofmaps;
            continue;
        }

        let weights_transport = policy::weights_transport(device_policy, layer, PlanKind::WeightPriority, 1, output_tile.input_tiles.first().map(|t| t.num_hw_passes).unwrap_or(1));
        let outputs_transport = policy::output_transport(layer);

        maybe_prefetch_next_wt_weights(
            pool,
            device_policy,
            layer,
            host_weights,
            hw,
            output_tile,
            plan.output_tiles.get(ot_idx + 1),
            out_kern_start,
            wt_kernel_elems,
        );

        let mut result_row_start = 0usize;
        let mut input_row_start = 0usize;
        for (it_idx, input_tile) in output_tile.input_tiles.iter().enumerate() {
            let advance = input_tile.input_shape.rows.saturating_sub(halo).max(1);
            if !input_tile.execute {
                shim_wt_input_tile(input_tile, host_weights, host_results, out_kern_start, &padded, hw);
                result_row_start += input_tile.output_shape.rows;
                input_row_start += advance;
                continue;
            }
            let _span = debug_span!("input_tile", index = it_idx).entered();

            let inputs_transport = policy::inputs_transport(device_policy, layer, PlanKind::WeightPriority, plan.output_tiles.len(), input_tile.num_hw_passes);

            let mut scratch = vec![0f32; input_tile.output_shape.rows * input_tile.output_shape.cols * output_tile.num_ofmaps];
            let in_elem_start = input_row_start * in_row_stripe;

            for pass in &input_tile.hw_passes {
                let _span = debug_span!("hw_pass", kern_start = pass.kern_start, kern_end = pass.kern_end, execute = pass.execute).entered();
                stats.total += 1;
                if !pass.execute {
                    let weight_start = (out_kern_start + pass.kern_start) * wt_kernel_elems;
                    let weight_len = pass.kern_count() * wt_kernel_elems;
                    let output_start = ((out_kern_start + pass.kern_start) * padded.outputs.rows + result_row_start) * padded.outputs.cols;
                    let output_len = pass.kern_count() * input_tile.output_shape.rows * input_tile.output_shape.cols;
                    shim::shim_hw_pass(host_weights, host_results, weight_start, weight_len, output_start, output_len, hw.cache_line_bytes, hw.bytes_per_elem);
                    continue;
                }
                stats.executed += 1;

                let partial = partial_layer_from_tile(layer, input_tile.input_shape, input_tile.output_shape, input_tile.pad, padded.weights);

                let inputs_req = if it_idx == 0 { inputs_transport } else { Transport::None };
                let weights_req = if pass.kern_start == 0 { weights_transport } else { Transport::None };
                let access = AccessConfig {
                    inputs: inputs_req,
                    weights: weights_req,
                    outputs: outputs_transport,
                };

                let weight_pass_start = (out_kern_start + pass.kern_start) * wt_kernel_elems;
                let operands = build_operand_pointers(host_inputs, host_weights, host_results, in_elem_start, weight_pass_start, &access);

                let opts = HwPassOptions {
                    img: pass.img,
                    kern_start: pass.kern_start,
                    kern_end: pass.kern_end,
                    total_tile_ofmaps: pass.total_tile_ofmaps,
                    execute: pass.execute,
                    upscale: pass.upscale,
                    load_inputs_first: pass.load_inputs_first,
                    use_pipelined_dma: pass.use_pipelined_dma,
                    activation: layer.activation,
                };

                kernel.run_pass(operands, access, &partial, opts, &mut scratch);
            }

            for local_k in 0..output_tile.num_ofmaps {
                let k_global = out_kern_start + local_k;
                for r in 0..input_tile.output_shape.rows {
                    for c in 0..input_tile.output_shape.cols {
                        let nhwc_idx = (r * input_tile.output_shape.cols + c) * output_tile.num_ofmaps + local_k;
                        let nchw_idx = (k_global * padded.outputs.rows + (result_row_start + r)) * padded.outputs.cols + c;
                        if nchw_idx < host_results.len() {
                            host_results[nchw_idx] = scratch[nhwc_idx];
                        }
                    }
                }
            }

            result_row_start += input_tile.output_shape.rows;
            input_row_start += advance;
        }

        out_kern_start += output_tile.num_ofmaps;
    }
}

/// Weight-priority counterpart of [`maybe_prefetch_next_weights`]: weights
/// are reloaded fresh per output tile here (`load_inputs_first = false`
/// means weights, not inputs, lead each tile), so the prefetch target is the
/// next output tile's weight block. Grounded on `wt_try_prefetch_weights`.
#[allow(clippy::too_many_arguments)]
fn maybe_prefetch_next_wt_weights(
    pool: Option<&WorkerPool>,
    device_policy: &DevicePolicy,
    layer: &LayerDescriptor,
    host_weights: &[f32],
    hw: &HardwareConstants,
    current: &WtOutputTile,
    next: Option<&WtOutputTile>,
    out_kern_start: usize,
    wt_kernel_elems: usize,
) {
    let Some(pool) = pool else { return };
    let Some(next_tile) = next else { return };

    let num_hw_passes = current.input_tiles.first().map(|t| t.num_hw_passes).unwrap_or(1);
    let transport = policy::weights_transport(device_policy, layer, PlanKind::WeightPriority, 1, num_hw_passes);
    if !matches!(transport, Transport::Acp) {
        return;
    }

    let next_start_elem = (out_kern_start + current.num_ofmaps) * wt_kernel_elems;
    let len_bytes = next_tile.num_ofmaps * wt_kernel_elems * hw.bytes_per_elem;
    if len_bytes == 0 {
        return;
    }
    let use_pf_delay = num_hw_passes == 1;
    let delay_ns = if use_pf_delay {
        (len_bytes as f64 / ASSUMED_BANDWIDTH_BYTES_PER_NS) as u64
    } else {
        0
    };

    let base = unsafe { host_weights.as_ptr().add(next_start_elem.min(host_weights.len())) as *const u8 };
    let job = unsafe { PrefetchJob::new(base, len_bytes, 0, delay_ns, hw.cache_line_bytes) };
    pool.dispatch(job);
}

fn shim_wt_output_tile(
    output_tile: &WtOutputTile,
    host_inputs: &[f32],
    host_weights: &[f32],
    host_results: &mut [f32],
    out_kern_start: usize,
    padded: &LayerDescriptor,
    hw: &HardwareConstants,
    in_row_stripe: usize,
) {
    let kernel_rows = padded.kernel_rows();
    let stride_rows = padded.stride.rows.max(1);
    let halo = kernel_rows.saturating_sub(stride_rows);
    let mut input_row_start = 0usize;
    for input_tile in &output_tile.input_tiles {
        shim::shim_input_read(host_inputs, input_row_start * in_row_stripe, input_tile.input_shape.rows * in_row_stripe, hw.cache_line_bytes, hw.bytes_per_elem);
        shim_wt_input_tile(input_tile, host_weights, host_results, out_kern_start, padded, hw);
        input_row_start += input_tile.input_shape.rows.saturating_sub(halo).max(1);
    }
}

fn shim_wt_input_tile(
    input_tile: &WtInputTile,
    host_weights: &[f32],
    host_results: &mut [f32],
    out_kern_start: usize,
    padded: &LayerDescriptor,
    hw: &HardwareConstants,
) {
    let wt_kernel_elems = padded.weights.rows * padded.weights.cols * padded.weights.padded_channels();
    let weight_start = out_kern_start * wt_kernel_elems;
    let num_ofmaps = input_tile.hw_passes.iter().map(|p| p.kern_end).max().unwrap_or(0);
    let weight_len = num_ofmaps * wt_kernel_elems;
    let output_start = out_kern_start * padded.outputs.rows * padded.outputs.cols;
    let output_len = num_ofmaps * input_tile.output_shape.rows * input_tile.output_shape.cols;
    shim::shim_hw_pass(host_weights, host_results, weight_start, weight_len, output_start, output_len, hw.cache_line_bytes, hw.bytes_per_elem);
}
