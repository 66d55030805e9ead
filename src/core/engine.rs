use tracing::debug;

use super::error::PlannerError;
use super::types::{
    OutputMode, SimulationOutput, SimulationParameters, SimulationReport, SimulationSummary,
    YearRecord,
};

const MONTHS_PER_YEAR: u32 = 12;
/// Ledger capacity reserved up front; longer horizons grow the vector as needed.
const PREALLOCATED_YEARS: u32 = 151;

#[derive(Debug, Default, Clone, Copy)]
struct YearFlow {
    sip: f64,
    withdrawal: f64,
}

impl YearFlow {
    fn net_monthly(self) -> f64 {
        (self.sip - self.withdrawal) / MONTHS_PER_YEAR as f64
    }
}

/// Runs the accumulation/withdrawal simulation for one SIP level and one base income.
///
/// `OutputMode::FinalCorpusOnly` skips building the ledger and returns the unrounded
/// closing corpus, which is what the goal solver evaluates on every step.
pub fn simulate(
    params: &SimulationParameters,
    sip_amount: f64,
    monthly_income: f64,
    mode: OutputMode,
) -> Result<SimulationOutput, PlannerError> {
    match mode {
        OutputMode::Full => run_full(params, sip_amount, monthly_income).map(SimulationOutput::Full),
        OutputMode::FinalCorpusOnly => run_final_corpus(params, sip_amount, monthly_income)
            .map(|final_corpus| SimulationOutput::FinalCorpus { final_corpus }),
    }
}

pub fn run_full(
    params: &SimulationParameters,
    sip_amount: f64,
    monthly_income: f64,
) -> Result<SimulationReport, PlannerError> {
    let mut yearly_data = Vec::with_capacity(params.year_span().min(PREALLOCATED_YEARS) as usize);
    run_years(params, sip_amount, monthly_income, Some(&mut yearly_data))?;
    let summary = summarize(params, &yearly_data);
    Ok(SimulationReport {
        yearly_data,
        summary,
    })
}

pub fn run_final_corpus(
    params: &SimulationParameters,
    sip_amount: f64,
    monthly_income: f64,
) -> Result<f64, PlannerError> {
    run_years(params, sip_amount, monthly_income, None)
}

fn run_years(
    params: &SimulationParameters,
    sip_amount: f64,
    monthly_income: f64,
    mut ledger: Option<&mut Vec<YearRecord>>,
) -> Result<f64, PlannerError> {
    params.ensure_finite()?;
    ensure_finite_amount("sipAmount", sip_amount)?;
    ensure_finite_amount("monthlyIncome", monthly_income)?;

    let monthly_return = params.expected_return / 100.0 / MONTHS_PER_YEAR as f64;
    let sip_step_up = 1.0 + params.sip_increase_rate / 100.0;
    let mut corpus = params.added_corpus_now;
    let mut current_sip = sip_amount;

    for age in params.current_age..=params.end_age {
        let is_retired = age >= params.retirement_age;
        let is_sip_active = age <= params.sip_payment_end_age;

        if age == params.retirement_age {
            corpus += params.added_corpus_retirement;
        }
        let year_start_corpus = corpus;

        let current_income = if is_retired {
            income_for_age(params, monthly_income, age)
        } else {
            0.0
        };

        let mut flow = YearFlow::default();
        for _ in 0..MONTHS_PER_YEAR {
            if is_sip_active {
                corpus += current_sip;
                flow.sip += current_sip;
            }
            if is_retired {
                corpus -= current_income;
                flow.withdrawal += current_income;
            }
            corpus *= 1.0 + monthly_return;
        }

        if !corpus.is_finite() {
            return Err(PlannerError::Computation(format!(
                "corpus became non-finite at age {age}"
            )));
        }

        if let Some(records) = ledger.as_deref_mut() {
            records.push(YearRecord {
                age,
                year_start_corpus: round_amount(year_start_corpus),
                sip_amount: if is_sip_active {
                    round_amount(current_sip)
                } else {
                    0
                },
                total_sip_for_year: round_amount(flow.sip),
                monthly_income: round_amount(current_income),
                total_withdrawal_for_year: round_amount(flow.withdrawal),
                year_end_corpus: round_amount(corpus),
                net_cash_flow: round_amount(flow.net_monthly()),
                is_retired,
                is_sip_active,
                is_sip_frozen: is_sip_active && age >= params.sip_freeze_age,
            });
        }

        if is_sip_active && age < params.sip_freeze_age {
            current_sip *= sip_step_up;
        }

        if is_retired && corpus <= 0.0 {
            debug!(age, corpus, "corpus depleted during retirement; stopping");
            break;
        }
    }

    Ok(corpus)
}

/// Withdrawal level for `age`, derived from the base income and elapsed retired years
/// rather than compounded year over year.
fn income_for_age(params: &SimulationParameters, monthly_income: f64, age: u32) -> f64 {
    let years_retired = age.saturating_sub(params.retirement_age);
    let growth = 1.0 + params.yearly_income_increase / 100.0;
    monthly_income * growth.powi(years_retired as i32)
}

fn summarize(params: &SimulationParameters, yearly_data: &[YearRecord]) -> SimulationSummary {
    let total_sip_invested = yearly_data.iter().map(|y| y.total_sip_for_year).sum();
    let total_withdrawn = yearly_data
        .iter()
        .map(|y| y.total_withdrawal_for_year)
        .sum();
    let final_corpus = yearly_data
        .last()
        .map(|y| y.year_end_corpus as f64)
        .unwrap_or(params.added_corpus_now);

    SimulationSummary {
        total_sip_invested,
        total_withdrawn,
        final_corpus,
    }
}

/// Half-up rounding to whole currency units (`-2.5` rounds to `-2`).
fn round_amount(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn ensure_finite_amount(name: &str, value: f64) -> Result<(), PlannerError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PlannerError::Computation(format!(
            "{name} must be a finite number, got {value}"
        )))
    }
}
