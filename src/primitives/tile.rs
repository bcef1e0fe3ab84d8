//! Tile tree data model (component C). Children are owned, contiguous
//! vectors per parent; nothing here holds a pointer that could outlive the
//! tree it belongs to. Tile descriptors are built fresh for each layer call
//! and dropped together with the [`Plan`] that owns them.

use crate::layer::{Padding, TensorShape};

/// Uniform accessor for the execute/upscale pair every tile-tree level
/// carries, so the sampling annotator (§4.G) and driver (§4.I) can walk any
/// level generically.
pub trait Sampled {
    fn execute(&self) -> bool;
    fn upscale(&self) -> u32;
    fn set_sampling(&mut self, execute: bool, upscale: u32);
}

macro_rules! impl_sampled {
    ($ty:ty) => {
        impl Sampled for $ty {
            fn execute(&self) -> bool {
                self.execute
            }
            fn upscale(&self) -> u32 {
                self.upscale
            }
            fn set_sampling(&mut self, execute: bool, upscale: u32) {
                self.execute = execute;
                self.upscale = upscale;
            }
        }
    };
}

/// One invocation of the SIMD-width-bounded compute primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwPass {
    pub kern_start: usize,
    pub kern_end: usize,
    pub img: usize,
    pub total_tile_ofmaps: usize,
    pub execute: bool,
    pub upscale: u32,
    pub load_inputs_first: bool,
    pub use_pipelined_dma: bool,
}

impl HwPass {
    pub fn kern_count(&self) -> usize {
        self.kern_end - self.kern_start
    }
}

impl_sampled!(HwPass);

/// A run of output feature maps sharing one set of HW passes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTile {
    pub num_ofmaps: usize,
    pub output_shape: TensorShape,
    pub output_pad: usize,
    pub num_hw_passes: usize,
    pub execute: bool,
    pub upscale: u32,
    pub hw_passes: Vec<HwPass>,
}

impl_sampled!(OutputTile);

/// A row-stripe of the input activation tensor (activation-priority plan).
#[derive(Debug, Clone, PartialEq)]
pub struct InputTile {
    /// `[rows, cols, channels]` of this tile's NHWC-padded activations.
    pub input_shape: TensorShape,
    pub input_pad: usize,
    pub pad: Padding,
    pub execute: bool,
    pub upscale: u32,
    pub output_tiles: Vec<OutputTile>,
}

impl_sampled!(InputTile);

/// A block of kernels resident in the L2 cache together (activation-priority
/// plan). Owns the full row-tiled sequence shared by every output tile in
/// this L2 tile.
#[derive(Debug, Clone, PartialEq)]
pub struct L2Tile {
    pub num_kernels: usize,
    pub execute: bool,
    pub upscale: u32,
    pub input_tiles: Vec<InputTile>,
}

impl_sampled!(L2Tile);

/// Activation-priority plan: L2 tile -> input tile -> output tile -> HW pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivationPlan {
    pub l2_tiles: Vec<L2Tile>,
}

/// An input tile under the weight-priority plan. Unlike the
/// activation-priority plan, each output tile owns its own independent
/// sequence of these (rows are re-split per output tile).
#[derive(Debug, Clone, PartialEq)]
pub struct WtInputTile {
    pub input_shape: TensorShape,
    pub output_shape: TensorShape,
    pub input_pad: usize,
    pub pad: Padding,
    pub execute: bool,
    pub upscale: u32,
    pub num_hw_passes: usize,
    pub hw_passes: Vec<HwPass>,
}

impl_sampled!(WtInputTile);

/// An output tile under the weight-priority plan: decided first, before rows
/// are split.
#[derive(Debug, Clone, PartialEq)]
pub struct WtOutputTile {
    pub num_ofmaps: usize,
    pub output_pad: usize,
    pub execute: bool,
    pub upscale: u32,
    pub input_tiles: Vec<WtInputTile>,
}

impl_sampled!(WtOutputTile);

/// Weight-priority plan: output tile -> input tile -> HW pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightPlan {
    pub output_tiles: Vec<WtOutputTile>,
}

/// Either of the two plan shapes the cost gate (§4.F) chooses between.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    ActivationPriority(ActivationPlan),
    WeightPriority(WeightPlan),
}

impl Plan {
    pub fn kind(&self) -> PlanKind {
        match self {
            Plan::ActivationPriority(_) => PlanKind::ActivationPriority,
            Plan::WeightPriority(_) => PlanKind::WeightPriority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    ActivationPriority,
    WeightPriority,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hw_pass_kern_count() {
        let pass = HwPass {
            kern_start: 8,
            kern_end: 16,
            img: 0,
            total_tile_ofmaps: 32,
            execute: true,
            upscale: 1,
            load_inputs_first: true,
            use_pipelined_dma: false,
        };
        assert_eq!(pass.kern_count(), 8);
    }
}
