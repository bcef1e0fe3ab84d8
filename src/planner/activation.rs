//! Activation-priority planner (component D). Grounded on
//! `convolution_divide_work` in the reference `smv/convolution.c`: L2 tiles
//! are split first (kernel blocks resident in L2), then each L2 tile's input
//! rows are split to fit UMEM, then each input tile's output channels are
//! split to fit the two SPADs, then each output tile's kernels are split
//! into SIMD-width HW passes.

use crate::config::HardwareConstants;
use crate::error::{Result, SchedulerError};
use crate::layer::LayerDescriptor;
use crate::primitives::tile::{ActivationPlan, HwPass, InputTile, L2Tile, OutputTile};
use crate::utils::calculation::{div_ceil, floor_to_multiple};

/// Builds the activation-priority tile tree for one layer invocation.
///
/// `use_pipelined_dma` is threaded straight onto every HW pass; the planner
/// does not otherwise consult device policy (that's the operand oracle's
/// job, applied later by the driver).
pub fn plan_activation_priority(
    layer: &LayerDescriptor,
    hw: &HardwareConstants,
    use_pipelined_dma: bool,
) -> Result<ActivationPlan> {
    let padded = layer.nhwc_padded(hw.align);

    let packed_kernel_bytes =
        padded.weights.rows * padded.weights.cols * padded.weights.padded_channels() * hw.bytes_per_elem;
    if packed_kernel_bytes == 0 {
        return Err(SchedulerError::InfeasibleTiling {
            lnum: 0,
            reason: "zero-sized kernel".into(),
        });
    }
    let mut max_kernels_per_l2 = floor_to_multiple(hw.l2_bytes / packed_kernel_bytes, hw.pe_insts);
    if max_kernels_per_l2 == 0 {
        max_kernels_per_l2 = hw.pe_insts.max(1);
    }
    let num_l2_tiles = div_ceil(padded.outputs.channels, max_kernels_per_l2);

    // How many whole kernels the weight scratchpad can hold at once,
    // independent of the output scratchpad's plane-size bound.
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

    let mut l2_tiles = Vec::with_capacity(num_l2_tiles);
    let mut kern_remaining = padded.outputs.channels;

    for _ in 0..num_l2_tiles {
        let l2_kernels = max_kernels_per_l2.min(kern_remaining);
        kern_remaining -= l2_kernels;

        let mut input_tiles = Vec::with_capacity(num_input_tiles);
        let mut rows_remaining = padded.inputs.rows;
        let advance = max_rows_per_tile.saturating_sub(halo).max(1);

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
                (max_rows_per_tile - kernel_rows + layer.pad.top) / layer.stride.rows.max(1) + 1
            } else if is_last {
                (rows_remaining - kernel_rows + layer.pad.bottom) / layer.stride.rows.max(1) + 1
            } else {
                (max_rows_per_tile - kernel_rows) / layer.stride.rows.max(1) + 1
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

            let output_2d_bytes = output_rows * padded.outputs.cols * hw.bytes_per_elem;
            if output_2d_bytes == 0 || output_2d_bytes > hw.spad_bytes {
                return Err(SchedulerError::InfeasibleTiling {
                    lnum: 0,
                    reason: format!(
                        "output row-plane of {output_2d_bytes} bytes exceeds SPAD ({} bytes)",
                        hw.spad_bytes
                    ),
                });
            }
            // The output scratchpad bounds how many ofmaps fit by plane size;
            // the weight scratchpad separately bounds how many whole kernels
            // fit at all. Both scratchpads are live for the same output tile,
            // so the tighter of the two wins.
            let max_ofmaps_by_plane = hw.spad_bytes / output_2d_bytes;
            let mut max_ofmaps = max_ofmaps_by_plane.min(max_kernels_per_output_tile);
            if max_ofmaps >= hw.pe_insts {
                max_ofmaps = floor_to_multiple(max_ofmaps, hw.pe_insts);
            }
            max_ofmaps = max_ofmaps.min(l2_kernels).max(1);
            let num_output_tiles = div_ceil(l2_kernels, max_ofmaps);

            let mut output_tiles = Vec::with_capacity(num_output_tiles);
            let mut ofmap_remaining = l2_kernels;
            for j in 0..num_output_tiles {
                let is_last_output = j == num_output_tiles - 1;
                let num_ofmaps = if is_last_output {
                    ofmap_remaining
                } else {
                    max_ofmaps
                };
                ofmap_remaining -= num_ofmaps;

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
                        load_inputs_first: p == 0,
                        use_pipelined_dma,
                    });
                }

                output_tiles.push(OutputTile {
                    num_ofmaps,
                    output_shape,
                    output_pad: 0,
                    num_hw_passes,
                    execute: true,
                    upscale: 1,
                    hw_passes,
                });
            }

            input_tiles.push(InputTile {
                input_shape,
                input_pad: 0,
                pad: crate::layer::Padding {
                    top: pad_top,
                    bottom: pad_bottom,
                    left: layer.pad.left,
                    right: layer.pad.right,
                },
                execute: true,
                upscale: 1,
                output_tiles,
            });

            rows_remaining = rows_remaining.saturating_sub(advance);
        }

        l2_tiles.push(L2Tile {
            num_kernels: l2_kernels,
            execute: true,
            upscale: 1,
            input_tiles,
        });
    }

    Ok(ActivationPlan { l2_tiles })
}
