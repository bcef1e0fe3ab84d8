//! Weight-priority planner (component E). Grounded on
//! `convolution_wt_divide_work` in `smv/convolution_wt.c`: output channels
//! are split first against the two SPADs, then each output tile
//! independently splits its own input rows against UMEM. Unlike the
//! activation-priority plan, there is no shared L2 tier and no shared input
//! tile sequence: each output tile owns its own row split.

use crate::config::HardwareConstants;
use crate::error::{Result, SchedulerError};
use crate::layer::LayerDescriptor;
use crate::primitives::tile::{HwPass, WeightPlan, WtInputTile, WtOutputTile};
use crate::utils::calculation::{div_ceil, floor_to_multiple};

pub fn plan_weight_priority(
    layer: &LayerDescriptor,
    hw: &HardwareConstants,
) -> Result<WeightPlan> {
    let padded = layer.nhwc_padded(hw.align);

    let output_2d_bytes_full = padded.outputs.rows * padded.outputs.cols * hw.bytes_per_elem;
    if output_2d_bytes_full == 0 || output_2d_bytes_full > hw.spad_bytes {
        return Err(SchedulerError::InfeasibleTiling {
            lnum: 0,
            reason: format!(
                "full output row-plane of {output_2d_bytes_full} bytes exceeds SPAD ({} bytes)",
                hw.spad_bytes
            ),
        });
    }

    // As in the activation-priority planner: the weight scratchpad bounds
    // whole kernels independently of the output scratchpad's plane-size
    // bound, and the tighter of the two applies.
    let packed_kernel_bytes =
        padded.weights.rows * padded.weights.cols * padded.weights.padded_channels() * hw.bytes_per_elem;
    if packed_kernel_bytes == 0 {
        return Err(SchedulerError::InfeasibleTiling {
            lnum: 0,
            reason: "zero-sized kernel".into(),
        });
    }
    let max_kernels_per_output_tile = hw.spad_bytes / packed_kernel_bytes;
    if max_kernels_per_output_tile == 0 {
        return Err(SchedulerError::InfeasibleTiling {
            lnum: 0,
            reason: format!(
                "a single kernel of {packed_kernel_bytes} bytes exceeds the weight SPAD ({} bytes)",
                hw.spad_bytes
            ),
        });
    }

    let max_ofmaps_by_plane = hw.spad_bytes / output_2d_bytes_full;
    let mut max_ofmaps = max_ofmaps_by_plane.min(max_kernels_per_output_tile);
    if max_ofmaps >= hw.pe_insts {
        max_ofmaps = floor_to_multiple(max_ofmaps, hw.pe_insts);
    }
    max_ofmaps = max_ofmaps.min(padded.outputs.channels).max(1);
    let num_output_tiles = div_ceil(padded.outputs.channels, max_ofmaps);

    let kernel_rows = padded.kernel_rows();
    let stride_rows = layer.stride.rows.max(1);
    let halo = kernel_rows.saturating_sub(stride_rows);
    let row_stripe_bytes = padded.inputs.row_stripe_elems() * hw.bytes_per_elem;
    let total_input_bytes = padded.inputs.rows * row_stripe_bytes;

    let (num_input_tiles, max_rows_per_tile) = if total_input_bytes <= hw.umem_bytes {
        (1, padded.inputs.rows)
    } else {
        if kernel_rows * row_stripe_bytes > hw.umem_bytes {
            return Err(SchedulerError::InfeasibleTiling {
                lnum: 0,
                reason: "a single kernel-height row stripe exceeds UMEM".into(),
            });
        }
        let max_rows_per_tile = hw.umem_bytes / row_stripe_bytes;
        let denom = max_rows_per_tile
            .checked_sub(halo)
            .filter(|d| *d > 0)
            .ok_or_else(|| SchedulerError::InfeasibleTiling {
                lnum: 0,
                reason: "halo consumes the entire row budget; no tile can advance".into(),
            })?;
        let tiles = div_ceil(padded.inputs.rows.saturating_sub(halo), denom);
        (tiles, max_rows_per_tile)
    };

    let mut output_tiles = Vec::with_capacity(num_output_tiles);
    let mut ofmap_remaining = padded.outputs.channels;
    let advance = max_rows_per_tile.saturating_sub(halo).max(1);

    for t in 0..num_output_tiles {
        let is_last_output = t == num_output_tiles - 1;
        let num_ofmaps = if is_last_output {
            ofmap_remaining
        } else {
            max_ofmaps
        };
        ofmap_remaining -= num_ofmaps;

        let mut input_tiles = Vec::with_capacity(num_input_tiles);
        let mut rows_remaining = padded.inputs.rows;

        for i in 0..num_input_tiles {
            let is_first = i == 0;
            let is_last = i == num_input_tiles - 1;

            let tile_rows = if num_input_tiles == 1 {
                padded.inputs.rows
            } else if !is_last {
                max_rows_per_tile
            } else {
                rows_remaining
            };

            let output_rows = if num_input_tiles == 1 {
                padded.outputs.rows
            } else if is_first {
                (max_rows_per_tile - kernel_rows + layer.pad.top) / stride_rows + 1
            } else if is_last {
                (rows_remaining - kernel_rows + layer.pad.bottom) / stride_rows + 1
            } else {
                (max_rows_per_tile - kernel_rows) / stride_rows + 1
            };

            let pad_top = if num_input_tiles == 1 || is_first {
                layer.pad.top
            } else {
                0
            };
            let pad_bottom = if num_input_tiles == 1 || is_last {
                layer.pad.bottom
            } else {
                0
            };

            let mut input_shape = padded.inputs;
            input_shape.rows = tile_rows;
            let mut output_shape = padded.outputs;
            output_shape.rows = output_rows;

            let num_hw_passes = div_ceil(num_ofmaps, hw.pe_insts);
            let mut hw_passes = Vec::with_capacity(num_hw_passes);
            for p in 0..num_hw_passes {
                let kern_start = p * hw.pe_insts;
                let kern_end = ((p + 1) * hw.pe_insts).min(num_ofmaps);
                hw_passes.push(HwPass {
                    kern_start,
                    kern_end,
                    img: 0,
                    total_tile_ofmaps: num_ofmaps,
                    execute: true,
                    upscale: 1,
                    load_inputs_first: false,
                    use_pipelined_dma: false,
                });
            }

            input_tiles.push(WtInputTile {
                input_shape,
                output_shape,
                input_pad: 0,
                pad: crate::layer::Padding {
                    top: pad_top,
                    bottom: pad_bottom,
                    left: layer.pad.left,
                    right: layer.pad.right,
                },
                execute: true,
                upscale: 1,
                num_hw_passes,
                hw_passes,
            });

            rows_remaining = rows_remaining.saturating_sub(advance);
        }

        output_tiles.push(WtOutputTile {
            num_ofmaps,
            output_pad: 0,
            execute: true,
            upscale: 1,
            input_tiles,
        });
        let _ = t;
    }

    Ok(WeightPlan { output_tiles })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::layer::{ActivationKind, Padding, Stride, TensorShape, Transport};

    #[test]
    fn splits_output_channels_before_rows() {
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
        let hw = HardwareConstants {
            spad_bytes: 8 * 1024,
            ..HardwareConstants::default()
        };
        let plan = plan_weight_priority(&layer, &hw).unwrap();
        assert!(plan.output_tiles.len() > 1);
        for tile in &plan.output_tiles[..plan.output_tiles.len() - 1] {
            assert_eq!(tile.num_ofmaps % hw.pe_insts, 0);
        }
    }
}
