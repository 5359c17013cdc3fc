mod export;
mod probe;
mod run;

pub(crate) use probe::run_probe;
pub(crate) use run::run_scenario;
