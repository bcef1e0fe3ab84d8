//! Tile planners (components D, E) and the plan selector (component F).
//!
//! Both planners are pure functions of a [`crate::layer::LayerDescriptor`]
//! and [`crate::config::HardwareConstants`]: no I/O, no shared state, called
//! once per layer invocation and producing a tree the driver walks and then
//! drops.

pub mod activation;
pub mod cost;
pub mod weight;

pub use activation::plan_activation_priority;
pub use cost::{select_plan, CostBreakdown};
pub use weight::plan_weight_priority;
