//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Coach system prompt for plan generation
pub const PLAN_SYSTEM: &str = include_str!("../../prompts/plan-system.pmt");

/// User instruction for plan generation
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");

/// Coach system prompt for reflection analysis
pub const REFLECTION_SYSTEM: &str = include_str!("../../prompts/reflection-system.pmt");

/// User instruction for reflection analysis
pub const REFLECTION: &str = include_str!("../../prompts/reflection.pmt");

/// Names of every embedded template
pub const TEMPLATE_NAMES: [&str; 4] = ["plan-system", "plan", "reflection-system", "reflection"];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "plan-system" => Some(PLAN_SYSTEM),
        "plan" => Some(PLAN),
        "reflection-system" => Some(REFLECTION_SYSTEM),
        "reflection" => Some(REFLECTION),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
