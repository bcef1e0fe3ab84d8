//! Hardware constants and policy knobs, all `serde`-friendly so an embedding
//! binary can load them from a config file. This crate never reads
//! `std::env`/CLI args itself — that is the embedder's job.

use serde::{Deserialize, Serialize};

/// Fixed accelerator properties. Byte-denominated unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConstants {
    /// Unified activation scratchpad size, in bytes.
    pub umem_bytes: usize,
    /// Per-kernel-scratchpad size, in bytes (there are two: kernels + outputs).
    pub spad_bytes: usize,
    /// L2 cache budget used for the activation-priority planner's kernel
    /// block split.
    pub l2_bytes: usize,
    /// SIMD lane count; output-tile kernel-count granularity.
    pub pe_insts: usize,
    /// Channel-dimension alignment, in elements.
    pub align: usize,
    /// Bytes per packed element (e.g. 2 for fp16).
    pub bytes_per_elem: usize,
    /// Cache line size, in bytes, for the prefetch shim.
    pub cache_line_bytes: usize,
}

impl Default for HardwareConstants {
    fn default() -> Self {
        Self {
            umem_bytes: 2 * 1024 * 1024,
            spad_bytes: 128 * 1024,
            l2_bytes: 1024 * 1024,
            pe_insts: 8,
            align: 8,
            bytes_per_elem: 2,
            cache_line_bytes: 64,
        }
    }
}

/// Per-operand data-movement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPolicy {
    /// Use the layer descriptor's own transport hint unchanged.
    DefaultHint,
    DmaAlways,
    AcpAlways,
    /// Choose DMA vs ACP per tile based on operand reuse; see
    /// [`crate::policy`].
    DynamicDmaAcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePolicy {
    pub inputs_load_policy: LoadPolicy,
    pub weights_load_policy: LoadPolicy,
    pub use_sw_prefetch: bool,
    pub use_hw_activation_func: bool,
    pub use_pipelined_dma: bool,
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self {
            inputs_load_policy: LoadPolicy::DefaultHint,
            weights_load_policy: LoadPolicy::DefaultHint,
            use_sw_prefetch: true,
            use_hw_activation_func: true,
            use_pipelined_dma: false,
        }
    }
}

/// How many *extra* tiles to execute beyond the mandatory first/last at each
/// tile-tree level. `0` means "execute all" (no sampling at that level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub sampled_l2: u32,
    pub sampled_input: u32,
    pub sampled_output: u32,
    pub sampled_hw_pass: u32,
    /// Mirrors the source's compile-time `TRACE_MODE`: when set, every
    /// prefetch dispatch becomes a no-op (useful when driving a trace-only
    /// replay where background memory traffic would pollute the trace).
    pub trace_mode: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sampled_l2: 0,
            sampled_input: 0,
            sampled_output: 0,
            sampled_hw_pass: 0,
            trace_mode: false,
        }
    }
}

impl SamplingConfig {
    pub fn none() -> Self {
        Self::default()
    }
}
