//! Layer descriptor: the caller-supplied shape of one convolution layer, plus
//! the small set of derived values (NHWC alignment padding, per-tile partial
//! layers) the planner and driver need.

use serde::{Deserialize, Serialize};

/// `(rows, cols, channels, align_pad)` tensor shape, as the source keeps for
/// inputs, weights, and outputs independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorShape {
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
    pub align_pad: usize,
}

impl TensorShape {
    pub fn new(rows: usize, cols: usize, channels: usize) -> Self {
        Self {
            rows,
            cols,
            channels,
            align_pad: 0,
        }
    }

    /// Elements per 2D (row, col) plane of one channel, including alignment.
    pub fn padded_channels(&self) -> usize {
        self.channels + self.align_pad
    }

    /// Total NHWC element count (rows * cols * padded channels).
    pub fn nhwc_elems(&self) -> usize {
        self.rows * self.cols * self.padded_channels()
    }

    /// Single row-stripe size in elements: `cols * padded_channels`.
    pub fn row_stripe_elems(&self) -> usize {
        self.cols * self.padded_channels()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stride {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationKind {
    None,
    Relu,
    LeakyRelu,
    Sigmoid,
    Tanh,
}

/// How an operand reaches the accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    /// Already resident; no transfer needed.
    None,
    /// Explicit DMA copy.
    Dma,
    /// Cache-coherent bus (ACP).
    Acp,
}

/// A single convolution layer, in the units the planner works with: element
/// counts, not bytes. Byte sizes are derived by multiplying by the element
/// width the caller's data type uses (see [`crate::config::HardwareConstants`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub inputs: TensorShape,
    pub weights: TensorShape,
    pub outputs: TensorShape,
    pub stride: Stride,
    pub pad: Padding,
    pub activation: ActivationKind,
    pub input_req: Transport,
    pub weights_req: Transport,
    pub output_req: Transport,
}

impl LayerDescriptor {
    /// Kernel rows/cols live on the weights shape (`weights.rows/cols`).
    pub fn kernel_rows(&self) -> usize {
        self.weights.rows
    }

    pub fn kernel_cols(&self) -> usize {
        self.weights.cols
    }

    /// Returns a copy with NHWC alignment padding recomputed on `inputs` and
    /// `weights` from `inputs.channels` (both operands share the same
    /// channel-dim pad, since a kernel's channel depth matches the input's).
    /// Outputs are left untouched: they're written NCHW.
    pub fn nhwc_padded(&self, align: usize) -> LayerDescriptor {
        let pad = calc_padding(self.inputs.channels, align);
        let mut padded = self.clone();
        padded.inputs.align_pad = pad;
        padded.weights.align_pad = pad;
        padded
    }

    /// A tile-scoped copy with shapes/padding rewritten; see
    /// [`crate::driver::partial_layer_from_tile`] for the call sites that
    /// fill these fields in.
    pub fn clone_for_tile(&self) -> LayerDescriptor {
        self.clone()
    }
}

/// A layer descriptor narrowed to a single tile's shape and padding, built
/// fresh per HW pass by the execution driver. Same fields as
/// [`LayerDescriptor`]; kept as a distinct name at call sites (see
/// [`LayerDescriptor::clone_for_tile`]) since the two have different
/// lifetimes in the driver even though they share a representation.
pub type PartialLayer = LayerDescriptor;

/// Smallest non-negative `pad` such that `(channels + pad) % align == 0`.
pub fn calc_padding(channels: usize, align: usize) -> usize {
    if align == 0 {
        return 0;
    }
    let rem = channels % align;
    if rem == 0 {
        0
    } else {
        align - rem
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn calc_padding_aligns_up() {
        assert_eq!(calc_padding(16, 8), 0);
        assert_eq!(calc_padding(17, 8), 7);
        assert_eq!(calc_padding(0, 8), 0);
    }

    #[test]
    fn nhwc_padded_leaves_outputs_nchw() {
        let layer = LayerDescriptor {
            inputs: TensorShape::new(32, 32, 3),
            weights: TensorShape::new(3, 3, 3),
            outputs: TensorShape::new(32, 32, 16),
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
        let padded = layer.nhwc_padded(8);
        assert_eq!(padded.inputs.align_pad, 5);
        assert_eq!(padded.weights.align_pad, 5);
        assert_eq!(padded.outputs.align_pad, 0);
    }
}
