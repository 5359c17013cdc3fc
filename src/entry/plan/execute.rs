use crate::app;
use crate::error::AppResult;

use super::types::RunPlan;

pub(crate) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    match plan {
        RunPlan::Scenario(settings) => {
            app::run_scenario(settings).await?;
        }
        RunPlan::Probe(settings) => {
            app::run_probe(settings).await?;
        }
    }
    Ok(())
}
