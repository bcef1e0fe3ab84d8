//! The external compute primitive boundary (component I's collaborator,
//! §6). Grounded on `smv_convolution_layer_hw`'s nine-argument-pointer
//! dispatch in `smv/convolution.c`: the driver never knows which transport
//! actually carries an operand, so it always offers all nine pointers and
//! the access configuration tells the kernel which three are live.

use crate::layer::{ActivationKind, PartialLayer, Transport};

/// One operand's resident pointer for each of the three possible
/// transports. Only the slot matching [`AccessConfig`]'s choice for this
/// operand is expected to be valid; the others may be null. Kept as a
/// nine-slot struct (three operands times three transports) rather than one
/// pointer-plus-tag pair, matching the source's layout (see Design Notes).
#[derive(Debug, Clone, Copy)]
pub struct OperandPointers {
    pub inputs_dma: *const u8,
    pub inputs_cache: *const u8,
    pub inputs_acp: *const u8,
    pub weights_dma: *const u8,
    pub weights_cache: *const u8,
    pub weights_acp: *const u8,
    pub outputs_dma: *mut u8,
    pub outputs_cache: *mut u8,
    pub outputs_acp: *mut u8,
}

/// Per-operand transport choice for one HW pass, as resolved by
/// [`crate::policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessConfig {
    pub inputs: Transport,
    pub weights: Transport,
    pub outputs: Transport,
}

/// Everything about one HW pass invocation that isn't the operand pointers
/// or the layer shape.
#[derive(Debug, Clone, Copy)]
pub struct HwPassOptions {
    pub img: usize,
    pub kern_start: usize,
    pub kern_end: usize,
    pub total_tile_ofmaps: usize,
    pub execute: bool,
    pub upscale: u32,
    pub load_inputs_first: bool,
    pub use_pipelined_dma: bool,
    pub activation: ActivationKind,
}

/// The opaque accelerator compute primitive. Out of scope for this crate
/// (§1): an implementation might invoke a hardware accelerator, a simulator,
/// or, for testing, a dense reference convolution.
pub trait ConvolutionKernel {
    /// Runs one HW pass. `scratch_out` is the *entire* enclosing output
    /// tile's NHWC scratch buffer (`rows * cols * opts.total_tile_ofmaps`
    /// elements), shared across every HW pass in the tile; this call only
    /// writes the channel range `[opts.kern_start, opts.kern_end)` at each
    /// pixel, leaving the rest untouched for sibling passes. Never fails: a
    /// kernel that can't complete is considered a fatal environment error
    /// outside this crate's error model (§7).
    fn run_pass(
        &self,
        operands: OperandPointers,
        access: AccessConfig,
        layer: &PartialLayer,
        opts: HwPassOptions,
        scratch_out: &mut [f32],
    );
}

/// Reference [`ConvolutionKernel`] test double. Feature-gated rather than
/// `#[cfg(test)]` so integration tests (which link the crate as an ordinary
/// dependency) can use it too; see the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use crate::layer::TensorShape;

    /// Reference (untiled, dense) convolution used by the end-to-end tests.
    /// Ignores which transport carries each operand: exactly one of an
    /// operand's three slots is non-null for any given pass (see
    /// `build_operand_pointers`), so this just reads through whichever one
    /// that is rather than assuming `Dma`.
    pub struct MockKernel;

    /// Picks the one non-null pointer among an operand's three transport
    /// slots. Panics if none is set, which would mean the driver built a
    /// pass with no resident copy of the operand at all.
    fn resident(dma: *const u8, cache: *const u8, acp: *const u8) -> *const u8 {
        [dma, cache, acp]
            .into_iter()
            .find(|p| !p.is_null())
            .expect("operand has no resident transport slot")
    }

    impl ConvolutionKernel for MockKernel {
        fn run_pass(
            &self,
            operands: OperandPointers,
            _access: AccessConfig,
            layer: &PartialLayer,
            opts: HwPassOptions,
            scratch_out: &mut [f32],
        ) {
            if !opts.execute {
                return;
            }
            let in_shape: TensorShape = layer.inputs;
            let out_shape: TensorShape = layer.outputs;
            let kern_shape: TensorShape = layer.weights;
            let stride = layer.stride;
            let pad = layer.pad;

            let in_ptr = resident(operands.inputs_dma, operands.inputs_cache, operands.inputs_acp) as *const f32;
            let wt_ptr = resident(operands.weights_dma, operands.weights_cache, operands.weights_acp) as *const f32;

            for out_row in 0..out_shape.rows {
                for out_col in 0..out_shape.cols {
                    for k in opts.kern_start..opts.kern_end {
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
                                    let wt_idx = ((k * kern_shape.rows + kr) * kern_shape.cols + kc)
                                        * kern_shape.padded_channels()
                                        + c;
                                    unsafe {
                                        acc += *in_ptr.add(in_idx) * *wt_ptr.add(wt_idx);
                                    }
                                }
                            }
                        }
                        if matches!(layer.activation, ActivationKind::Relu) && acc < 0.0 {
                            acc = 0.0;
                        }
                        // `k` is already tile-local (0..num_ofmaps); `scratch_out` is the
                        // whole output tile's NHWC buffer shared across every HW pass, so
                        // passes write disjoint, non-overlapping channel ranges into it.
                        let out_idx = (out_row * out_shape.cols + out_col) * opts.total_tile_ofmaps + k;
                        scratch_out[out_idx] = acc;
                    }
                }
            }
        }
    }
}
