pub(crate) mod logger;
pub(crate) mod shutdown_handlers;
pub(crate) mod summary_output;

pub(crate) use summary_output::{selection_lines, summary_lines};
