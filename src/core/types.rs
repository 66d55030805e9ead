use serde::{Deserialize, Serialize};

use super::error::PlannerError;

/// Inputs that stay fixed for a single simulation run.
///
/// Ages are whole years. Rates are percentages (`10.0` means 10 %). Amounts are in
/// whole currency units but kept as `f64` so the engine never truncates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub current_age: u32,
    pub retirement_age: u32,
    pub end_age: u32,
    pub sip_payment_end_age: u32,
    pub yearly_income_increase: f64,
    pub added_corpus_now: f64,
    pub added_corpus_retirement: f64,
    pub sip_increase_rate: f64,
    pub sip_freeze_age: u32,
    pub expected_return: f64,
}

impl SimulationParameters {
    /// Number of years a run would cover if the corpus never depletes.
    pub fn year_span(&self) -> u32 {
        if self.end_age < self.current_age {
            0
        } else {
            (self.end_age - self.current_age).saturating_add(1)
        }
    }

    pub(crate) fn ensure_finite(&self) -> Result<(), PlannerError> {
        let fields = [
            ("yearlyIncomeIncrease", self.yearly_income_increase),
            ("addedCorpusNow", self.added_corpus_now),
            ("addedCorpusRetirement", self.added_corpus_retirement),
            ("sipIncreaseRate", self.sip_increase_rate),
            ("expectedReturn", self.expected_return),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(PlannerError::Computation(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            current_age: 25,
            retirement_age: 50,
            end_age: 85,
            sip_payment_end_age: 85,
            yearly_income_increase: 5.0,
            added_corpus_now: 0.0,
            added_corpus_retirement: 100_000_000.0,
            sip_increase_rate: 5.0,
            sip_freeze_age: 65,
            expected_return: 10.0,
        }
    }
}

/// One simulated year. Monetary fields are rounded snapshots of the engine's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub age: u32,
    pub year_start_corpus: i64,
    pub sip_amount: i64,
    pub total_sip_for_year: i64,
    pub monthly_income: i64,
    pub total_withdrawal_for_year: i64,
    pub year_end_corpus: i64,
    pub net_cash_flow: i64,
    pub is_retired: bool,
    pub is_sip_active: bool,
    pub is_sip_frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub total_sip_invested: i64,
    pub total_withdrawn: i64,
    /// Last record's year-end corpus, or the unrounded starting corpus when no
    /// year was simulated.
    pub final_corpus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub yearly_data: Vec<YearRecord>,
    pub summary: SimulationSummary,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Full,
    FinalCorpusOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SimulationOutput {
    Full(SimulationReport),
    FinalCorpus {
        #[serde(rename = "finalCorpus")]
        final_corpus: f64,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CalculationMode {
    #[serde(rename = "calculateSIP")]
    CalculateSip,
    #[serde(rename = "calculateIncome")]
    CalculateIncome,
    #[serde(rename = "calculateEndCorpus")]
    CalculateEndCorpus,
}

/// Everything a caller edits: the fixed parameters plus which unknown to solve for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerInputs {
    #[serde(flatten)]
    pub params: SimulationParameters,
    pub calculation_mode: CalculationMode,
    pub starting_sip_amount: f64,
    pub starting_monthly_income: f64,
    pub target_end_corpus: f64,
}

impl Default for PlannerInputs {
    fn default() -> Self {
        Self {
            params: SimulationParameters::default(),
            calculation_mode: CalculationMode::CalculateSip,
            starting_sip_amount: 0.0,
            starting_monthly_income: 800_000.0,
            target_end_corpus: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_span_is_inclusive_and_saturates() {
        let mut params = SimulationParameters::default();
        assert_eq!(params.year_span(), 61);

        params.end_age = params.current_age - 1;
        assert_eq!(params.year_span(), 0);

        params.current_age = 0;
        params.end_age = u32::MAX;
        assert_eq!(params.year_span(), u32::MAX);
    }
}
