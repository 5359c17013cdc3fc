mod build;
mod execute;
mod types;


pub(crate) use build::build_plan;
pub(crate) use execute::execute_plan;
pub(crate) use types::{ProbeSettings, RunSettings};
