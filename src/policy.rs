//! Operand policy oracle (component H). Grounded on `get_weights_io_req` /
//! `get_input_io_req` in `smv/convolution.c` and their `_wt` counterparts in
//! `smv/convolution_wt.c`: per operand, pick DMA, ACP, or the layer's own
//! default transport hint.

use crate::config::{DevicePolicy, LoadPolicy};
use crate::layer::{LayerDescriptor, Transport};
use crate::primitives::tile::PlanKind;

/// The `DynamicDmaAcp` heuristic: if the operand is not reused across outer
/// tiles (`outer_tile_count <= 1`), prefer DMA, unless software prefetching
/// is enabled and there are enough HW passes to double-buffer, in which case
/// ACP lets the prefetch overlap with compute. When the operand *is* reused
/// across outer tiles, ACP always wins (repeat DMA would be wasted
/// bandwidth).
fn dynamic_dma_acp(outer_tile_count: usize, use_sw_prefetch: bool, num_hw_passes: usize) -> Transport {
    if outer_tile_count <= 1 {
        if use_sw_prefetch && num_hw_passes >= 2 {
            Transport::Acp
        } else {
            Transport::Dma
        }
    } else {
        Transport::Acp
    }
}

fn resolve(policy: LoadPolicy, default_hint: Transport, outer_tile_count: usize, use_sw_prefetch: bool, num_hw_passes: usize) -> Transport {
    match policy {
        LoadPolicy::DefaultHint => default_hint,
        LoadPolicy::DmaAlways => Transport::Dma,
        LoadPolicy::AcpAlways => Transport::Acp,
        LoadPolicy::DynamicDmaAcp => dynamic_dma_acp(outer_tile_count, use_sw_prefetch, num_hw_passes),
    }
}

/// Weight transport. `DynamicDmaAcp` is only meaningful under the
/// activation-priority plan (weights are the operand reused across input
/// tiles there); under weight-priority it has no defined arm and falls back
/// to the layer's own hint, matching the source's silence on the reverse
/// combination (see Design Notes).
pub fn weights_transport(
    device_policy: &DevicePolicy,
    layer: &LayerDescriptor,
    plan_kind: PlanKind,
    num_input_tiles: usize,
    num_hw_passes: usize,
) -> Transport {
    match (plan_kind, device_policy.weights_load_policy) {
        (PlanKind::WeightPriority, LoadPolicy::DynamicDmaAcp) => layer.weights_req,
        (PlanKind::ActivationPriority, policy) => resolve(
            policy,
            layer.weights_req,
            num_input_tiles,
            device_policy.use_sw_prefetch,
            num_hw_passes,
        ),
        (PlanKind::WeightPriority, policy) => {
            resolve(policy, layer.weights_req, 1, device_policy.use_sw_prefetch, num_hw_passes)
        }
    }
}

/// Input transport. `DynamicDmaAcp` is only meaningful under the
/// weight-priority plan (inputs are the operand reused across output tiles
/// there); under activation-priority it falls back to the layer's own hint.
pub fn inputs_transport(
    device_policy: &DevicePolicy,
    layer: &LayerDescriptor,
    plan_kind: PlanKind,
    num_output_tiles: usize,
    num_hw_passes: usize,
) -> Transport {
    match (plan_kind, device_policy.inputs_load_policy) {
        (PlanKind::ActivationPriority, LoadPolicy::DynamicDmaAcp) => layer.input_req,
        (PlanKind::WeightPriority, policy) => resolve(
            policy,
            layer.input_req,
            num_output_tiles,
            device_policy.use_sw_prefetch,
            num_hw_passes,
        ),
        (PlanKind::ActivationPriority, policy) => {
            resolve(policy, layer.input_req, 1, device_policy.use_sw_prefetch, num_hw_passes)
        }
    }
}

/// Output transport always follows the layer descriptor's own hint; there is
/// no dynamic output policy.
pub fn output_transport(layer: &LayerDescriptor) -> Transport {
    layer.output_req
}
