mod engine;
mod error;
mod solver;
mod types;

pub use engine::{run_final_corpus, run_full, simulate};
pub use error::PlannerError;
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, project_end_corpus, solve_goal,
    solve_goal_with_config,
};
pub use types::{
    CalculationMode, OutputMode, PlannerInputs, SimulationOutput, SimulationParameters,
    SimulationReport, SimulationSummary, YearRecord,
};
