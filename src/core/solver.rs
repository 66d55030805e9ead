use serde::Serialize;
use tracing::{debug, info, warn};

use super::engine::{run_final_corpus, run_full};
use super::error::PlannerError;
use super::types::{CalculationMode, PlannerInputs, SimulationParameters, SimulationReport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalSolveConfig {
    pub search_min: f64,
    pub search_max: f64,
    /// Stop once `search_max - search_min` shrinks to this width.
    pub interval_tolerance: f64,
    /// Accept a candidate whose final corpus lands this close to the target.
    pub acceptance_tolerance: f64,
    pub max_iterations: u32,
    /// Evaluations returning a zero or non-finite corpus do not count as iterations;
    /// this bounds how many of them the search tolerates before giving up.
    pub max_inconclusive: u32,
}

impl GoalSolveConfig {
    pub fn for_mode(mode: CalculationMode) -> Option<Self> {
        match mode {
            CalculationMode::CalculateSip => Some(Self {
                search_min: 1_000.0,
                search_max: 5_000_000.0,
                interval_tolerance: 100.0,
                acceptance_tolerance: 100_000.0,
                max_iterations: 50,
                max_inconclusive: 8,
            }),
            CalculationMode::CalculateIncome => Some(Self {
                search_min: 10_000.0,
                search_max: 5_000_000.0,
                interval_tolerance: 1_000.0,
                acceptance_tolerance: 100_000.0,
                max_iterations: 50,
                max_inconclusive: 8,
            }),
            CalculationMode::CalculateEndCorpus => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub final_corpus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub mode: CalculationMode,
    pub target_end_corpus: f64,
    pub solved_value: Option<f64>,
    pub sip_amount: f64,
    pub monthly_income: f64,
    pub iterations: Vec<GoalSolveIteration>,
    pub inconclusive_evaluations: u32,
    pub converged: bool,
    pub monotonic_bounds: bool,
    pub message: String,
    pub report: SimulationReport,
}

#[derive(Debug, Clone)]
struct SearchOutcome {
    solved_value: Option<f64>,
    iterations: Vec<GoalSolveIteration>,
    inconclusive_evaluations: u32,
    converged: bool,
    monotonic_bounds: bool,
    message: String,
}

/// Solves for whichever unknown `inputs.calculation_mode` names, using the stock
/// search bounds for that mode, then runs the full ledger with the result.
pub fn solve_goal(inputs: &PlannerInputs) -> Result<GoalSolveResult, PlannerError> {
    solve_goal_with_config(inputs, GoalSolveConfig::for_mode(inputs.calculation_mode))
}

pub fn solve_goal_with_config(
    inputs: &PlannerInputs,
    config: Option<GoalSolveConfig>,
) -> Result<GoalSolveResult, PlannerError> {
    let mode = inputs.calculation_mode;
    let params = &inputs.params;
    let config = config.or_else(|| GoalSolveConfig::for_mode(mode));

    let (sip_amount, monthly_income, outcome) = match (mode, config) {
        (CalculationMode::CalculateEndCorpus, _) | (_, None) => (
            inputs.starting_sip_amount,
            inputs.starting_monthly_income,
            SearchOutcome {
                solved_value: None,
                iterations: Vec::new(),
                inconclusive_evaluations: 0,
                converged: true,
                monotonic_bounds: true,
                message: "Projected final corpus from the given SIP and income.".to_string(),
            },
        ),
        (CalculationMode::CalculateSip, Some(config)) => {
            validate_config(config)?;
            let income = inputs.starting_monthly_income;
            let outcome = bisect(
                config,
                inputs.target_end_corpus,
                Direction::Increasing,
                |sip| run_final_corpus(params, sip, income),
            )?;
            let sip = outcome.solved_value.unwrap_or(inputs.starting_sip_amount);
            (sip, income, outcome)
        }
        (CalculationMode::CalculateIncome, Some(config)) => {
            validate_config(config)?;
            let sip = inputs.starting_sip_amount;
            let outcome = bisect(
                config,
                inputs.target_end_corpus,
                Direction::Decreasing,
                |income| run_final_corpus(params, sip, income),
            )?;
            let income = outcome
                .solved_value
                .unwrap_or(inputs.starting_monthly_income);
            (sip, income, outcome)
        }
    };

    let report = run_full(params, sip_amount, monthly_income)?;
    info!(
        ?mode,
        sip_amount,
        monthly_income,
        converged = outcome.converged,
        iterations = outcome.iterations.len(),
        final_corpus = report.summary.final_corpus,
        "goal solve finished"
    );

    Ok(GoalSolveResult {
        mode,
        target_end_corpus: inputs.target_end_corpus,
        solved_value: outcome.solved_value,
        sip_amount,
        monthly_income,
        iterations: outcome.iterations,
        inconclusive_evaluations: outcome.inconclusive_evaluations,
        converged: outcome.converged,
        monotonic_bounds: outcome.monotonic_bounds,
        message: outcome.message,
        report,
    })
}

/// How the final corpus responds to a larger candidate value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Direction {
    Increasing,
    Decreasing,
}

fn bisect<F>(
    config: GoalSolveConfig,
    target: f64,
    direction: Direction,
    mut evaluate: F,
) -> Result<SearchOutcome, PlannerError>
where
    F: FnMut(f64) -> Result<f64, PlannerError>,
{
    let monotonic_bounds = check_bounds(config, direction, &mut evaluate)?;

    let mut lo = config.search_min;
    let mut hi = config.search_max;
    let mut best = None;
    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut inconclusive = 0;
    let mut accepted = false;

    while (iterations.len() as u32) < config.max_iterations && hi - lo > config.interval_tolerance {
        let mid = ((lo + hi) / 2.0).floor();
        let final_corpus = evaluate(mid)?;

        if final_corpus == 0.0 || !final_corpus.is_finite() {
            inconclusive += 1;
            warn!(candidate = mid, inconclusive, "inconclusive evaluation");
            if inconclusive >= config.max_inconclusive {
                break;
            }
            continue;
        }

        iterations.push(GoalSolveIteration {
            iteration: iterations.len() as u32 + 1,
            lower_bound: lo,
            upper_bound: hi,
            candidate_value: mid,
            final_corpus,
        });
        best = Some(mid);
        debug!(lo, hi, candidate = mid, final_corpus, "bisection step");

        if (final_corpus - target).abs() < config.acceptance_tolerance {
            accepted = true;
            break;
        }

        let overshoot = final_corpus > target;
        match (direction, overshoot) {
            (Direction::Increasing, true) | (Direction::Decreasing, false) => hi = mid,
            (Direction::Increasing, false) | (Direction::Decreasing, true) => lo = mid,
        }
    }

    let narrowed = hi - lo <= config.interval_tolerance;
    let converged = best.is_some() && (accepted || narrowed);
    let message = if best.is_none() {
        "No conclusive evaluation within the search bounds; kept the starting value.".to_string()
    } else if accepted {
        "Final corpus is within tolerance of the target.".to_string()
    } else if narrowed {
        "Search interval narrowed to tolerance; returning best estimate.".to_string()
    } else if inconclusive >= config.max_inconclusive {
        "Stopped after repeated inconclusive evaluations; returning best estimate.".to_string()
    } else {
        "Reached max iterations before tolerance was met; returning best estimate.".to_string()
    };

    Ok(SearchOutcome {
        solved_value: best,
        iterations,
        inconclusive_evaluations: inconclusive,
        converged,
        monotonic_bounds,
        message,
    })
}

/// The search assumes the final corpus moves in one direction across the interval.
/// Only the endpoints are checked; a violation is reported, not fatal.
fn check_bounds<F>(
    config: GoalSolveConfig,
    direction: Direction,
    evaluate: &mut F,
) -> Result<bool, PlannerError>
where
    F: FnMut(f64) -> Result<f64, PlannerError>,
{
    let at_min = evaluate(config.search_min)?;
    let at_max = evaluate(config.search_max)?;
    let monotonic = match direction {
        Direction::Increasing => at_max >= at_min,
        Direction::Decreasing => at_max <= at_min,
    };
    if !monotonic {
        warn!(
            ?direction,
            at_min, at_max, "final corpus is not monotonic across the search bounds"
        );
    }
    Ok(monotonic)
}

fn validate_config(config: GoalSolveConfig) -> Result<(), PlannerError> {
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(PlannerError::invalid("searchBounds", "must be finite"));
    }
    if config.search_max <= config.search_min {
        return Err(PlannerError::invalid(
            "searchMax",
            "must be greater than searchMin",
        ));
    }
    if !config.interval_tolerance.is_finite() || config.interval_tolerance <= 0.0 {
        return Err(PlannerError::invalid("intervalTolerance", "must be > 0"));
    }
    if !config.acceptance_tolerance.is_finite() || config.acceptance_tolerance < 0.0 {
        return Err(PlannerError::invalid("acceptanceTolerance", "must be >= 0"));
    }
    if config.max_iterations == 0 {
        return Err(PlannerError::invalid("maxIterations", "must be > 0"));
    }
    if config.max_inconclusive == 0 {
        return Err(PlannerError::invalid("maxInconclusive", "must be > 0"));
    }
    Ok(())
}

/// Convenience for callers holding bare parameters and a fixed SIP/income pair.
pub fn project_end_corpus(
    params: &SimulationParameters,
    sip_amount: f64,
    monthly_income: f64,
) -> Result<GoalSolveResult, PlannerError> {
    let inputs = PlannerInputs {
        params: params.clone(),
        calculation_mode: CalculationMode::CalculateEndCorpus,
        starting_sip_amount: sip_amount,
        starting_monthly_income: monthly_income,
        target_end_corpus: 0.0,
    };
    solve_goal(&inputs)
}
