//! Plan selector / cost gate (component F). Grounded on the cost-model
//! block inside `smv_standard_convolution_layer_impl`: a cheap analytic
//! comparison of DRAM traffic under each plan shape, computed from the
//! activation-priority plan's own tile counts (the weight-priority plan is
//! only actually built if the gate picks it).

use tracing::warn;

use crate::config::{DevicePolicy, HardwareConstants};
use crate::error::Result;
use crate::layer::{LayerDescriptor, Transport};
use crate::planner::weight::plan_weight_priority;
use crate::primitives::tile::{ActivationPlan, Plan, PlanKind};

/// DRAM access latency, arbitrary time units per byte. Only used
/// comparatively between the two candidate plans, never as an absolute
/// prediction.
const DRAM_LATENCY: f64 = 1.0;
/// L2-coherent (ACP) access latency, same units. Lower than DRAM because the
/// weight-priority plan's repeated input reuse is expected to hit in L2.
const L2_LATENCY_ACP: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub cost_activation: f64,
    pub cost_weight: f64,
    pub chosen: PlanKind,
    /// True when the gate preferred weight-priority but the driver's
    /// current implementation precondition blocked it (see Design Notes:
    /// open question on `kernel_size < output_channel_plane_size`).
    pub precondition_blocked: bool,
}

/// Runs the cost gate and returns the chosen [`Plan`] plus its breakdown.
/// Builds the weight-priority plan only when the gate actually selects it.
pub fn select_plan(
    layer: &LayerDescriptor,
    hw: &HardwareConstants,
    _device_policy: &DevicePolicy,
    activation: &ActivationPlan,
) -> Result<(Plan, CostBreakdown)> {
    let padded = layer.nhwc_padded(hw.align);

    let weight_bytes = (padded.weights.rows
        * padded.weights.cols
        * padded.weights.padded_channels()
        * padded.outputs.channels
        * hw.bytes_per_elem) as f64;
    let input_bytes = (padded.inputs.nhwc_elems() * hw.bytes_per_elem) as f64;

    let tin = activation
        .l2_tiles
        .first()
        .map(|l2| l2.input_tiles.len())
        .unwrap_or(1);
    let to = activation
        .l2_tiles
        .first()
        .and_then(|l2| l2.input_tiles.first())
        .map(|it| it.output_tiles.len())
        .unwrap_or(1);

    // Keyed off the layer's own resolved input transport, not a device-policy
    // hint: `curr_layer.input_req == IO_ACP` in the source, not a load-policy
    // setting a caller might leave at its default.
    let l2_latency = if layer.input_req == Transport::Acp {
        L2_LATENCY_ACP
    } else {
        DRAM_LATENCY
    };

    let cost_activation = weight_bytes * tin as f64 * DRAM_LATENCY + input_bytes * DRAM_LATENCY;
    let cost_weight = if tin > 1 {
        weight_bytes * DRAM_LATENCY
            + input_bytes * DRAM_LATENCY
            + (to as f64 - 1.0) * input_bytes * l2_latency
    } else {
        weight_bytes * DRAM_LATENCY + input_bytes * DRAM_LATENCY
    };

    let per_kernel_bytes =
        padded.weights.rows * padded.weights.cols * padded.weights.padded_channels() * hw.bytes_per_elem;
    let output_plane_bytes = padded.outputs.rows * padded.outputs.cols * hw.bytes_per_elem;
    let precondition_ok = per_kernel_bytes > output_plane_bytes;

    let wants_weight_priority = cost_weight < cost_activation;

    if wants_weight_priority && precondition_ok {
        let weight_plan = plan_weight_priority(layer, hw)?;
        let breakdown = CostBreakdown {
            cost_activation,
            cost_weight,
            chosen: PlanKind::WeightPriority,
            precondition_blocked: false,
        };
        Ok((Plan::WeightPriority(weight_plan), breakdown))
    } else {
        if wants_weight_priority && !precondition_ok {
            warn!(
                per_kernel_bytes,
                output_plane_bytes,
                "cost gate prefers weight-priority but kernel is not larger than the output \
                 channel plane; falling back to activation-priority"
            );
        }
        let breakdown = CostBreakdown {
            cost_activation,
            cost_weight,
            chosen: PlanKind::ActivationPriority,
            precondition_blocked: wants_weight_priority && !precondition_ok,
        };
        Ok((Plan::ActivationPriority(activation.clone()), breakdown))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layer::{ActivationKind, Padding, Stride, TensorShape, Transport};
    use crate::planner::activation::plan_activation_priority;

    #[test]
    fn small_layer_keeps_activation_priority() {
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
        let hw = HardwareConstants::default();
        let device_policy = DevicePolicy::default();
        let activation = plan_activation_priority(&layer, &hw, false).unwrap();
        let (plan, breakdown) = select_plan(&layer, &hw, &device_policy, &activation).unwrap();
        assert_eq!(plan.kind(), PlanKind::ActivationPriority);
        assert_eq!(breakdown.chosen, PlanKind::ActivationPriority);
    }
}
