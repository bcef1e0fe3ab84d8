//! Tiling scheduler and execution driver for one convolution layer running
//! on a host-plus-accelerator platform. Given a layer's shape and a set of
//! hardware constants, [`schedule_and_run`] builds a tile tree, picks
//! between an activation-priority and a weight-priority nesting via an
//! analytic cost model, optionally samples it down for fast profiling runs,
//! and walks it to completion against a caller-supplied
//! [`compute::ConvolutionKernel`].
//!
//! This crate does not implement the convolution math itself: it schedules
//! and drives calls into whatever `ConvolutionKernel` the embedder provides,
//! which might be a real accelerator, a cycle-level simulator, or (as the
//! test suite uses) a dense reference implementation.

pub mod compute;
pub mod config;
pub mod driver;
pub mod error;
pub mod layer;
pub mod planner;
pub mod policy;
pub mod pool;
pub mod primitives;
pub mod sampling;
pub mod utils;

pub use compute::{AccessConfig, ConvolutionKernel, HwPassOptions, OperandPointers};
pub use config::{DevicePolicy, HardwareConstants, LoadPolicy, SamplingConfig};
pub use driver::{schedule_and_run, RunReport};
pub use error::{Result, SchedulerError};
pub use layer::{ActivationKind, LayerDescriptor, Padding, PartialLayer, Stride, TensorShape, Transport};
pub use planner::CostBreakdown;
pub use primitives::tile::{Plan, PlanKind};

#[cfg(any(test, feature = "test-util"))]
pub use compute::mock::MockKernel;
