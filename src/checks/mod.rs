//! Check actions
//!
//! This module provides the shared status-check engine and its two variants:
//!
//! - **detector**: anomaly state of a detector's incidents
//! - **slo**: triggered alerts of a service level objective
//!
//! ## Adding New Checks
//!
//! 1. Create a new file in `src/checks/` (e.g., `mycheck.rs`)
//! 2. Implement the `StatusCheck` trait
//! 3. Register in `registry.rs`
//! 4. Add to `mod.rs` exports

pub mod detector;
pub mod metric;
pub mod registry;
pub mod slo;
mod traits;

pub use detector::DetectorCheck;
pub use metric::{Metric, MetricState, web_console_url};
pub use registry::ActionRegistry;
pub use slo::SloCheck;
pub use traits::*;

use crate::api::types::{ActionParameter, ParameterType};

/// `stateCheckMode` parameter shared by all checks
fn state_check_mode_parameter() -> ActionParameter {
    ActionParameter::new("stateCheckMode", "State Check Mode", ParameterType::String)
        .with_description("How often should the state be checked ?")
        .with_default(CheckMode::AllTheTime.as_str())
        .with_option("All the time", CheckMode::AllTheTime.as_str())
        .with_option("At least once", CheckMode::AtLeastOnce.as_str())
        .with_order(3)
        .required()
}
