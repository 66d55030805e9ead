//! User-edited inputs as they arrive from the CLI, the HTTP API, or the input cache,
//! and the layering that turns them into validated [`PlannerInputs`].

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::core::{CalculationMode, PlannerError, PlannerInputs};

const MAX_AGE: u32 = 150;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum ApiCalculationMode {
    #[serde(
        rename = "calculateSIP",
        alias = "calculate-sip",
        alias = "calculateSip",
        alias = "sip"
    )]
    CalculateSip,
    #[serde(rename = "calculateIncome", alias = "calculate-income", alias = "income")]
    CalculateIncome,
    #[serde(
        rename = "calculateEndCorpus",
        alias = "calculate-end-corpus",
        alias = "end-corpus"
    )]
    CalculateEndCorpus,
}

impl From<ApiCalculationMode> for CalculationMode {
    fn from(value: ApiCalculationMode) -> Self {
        match value {
            ApiCalculationMode::CalculateSip => CalculationMode::CalculateSip,
            ApiCalculationMode::CalculateIncome => CalculationMode::CalculateIncome,
            ApiCalculationMode::CalculateEndCorpus => CalculationMode::CalculateEndCorpus,
        }
    }
}

impl From<CalculationMode> for ApiCalculationMode {
    fn from(value: CalculationMode) -> Self {
        match value {
            CalculationMode::CalculateSip => ApiCalculationMode::CalculateSip,
            CalculationMode::CalculateIncome => ApiCalculationMode::CalculateIncome,
            CalculationMode::CalculateEndCorpus => ApiCalculationMode::CalculateEndCorpus,
        }
    }
}

/// Raw, user-edited fields. Every field is optional and layered over a base set of
/// inputs; numbers may arrive as JSON numbers or as text with digit-group commas,
/// and an empty text field counts as zero.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputsPayload {
    #[serde(deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub current_age: Option<u32>,
    #[serde(deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub retirement_age: Option<u32>,
    #[serde(deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub end_age: Option<u32>,
    #[serde(deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub sip_payment_end_age: Option<u32>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub yearly_income_increase: Option<f64>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub added_corpus_now: Option<f64>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub added_corpus_retirement: Option<f64>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub sip_increase_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_age", skip_serializing_if = "Option::is_none")]
    pub sip_freeze_age: Option<u32>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub expected_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_mode: Option<ApiCalculationMode>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub starting_sip_amount: Option<f64>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub starting_monthly_income: Option<f64>,
    #[serde(deserialize_with = "lenient_amount", skip_serializing_if = "Option::is_none")]
    pub target_end_corpus: Option<f64>,
}

impl From<&PlannerInputs> for InputsPayload {
    fn from(inputs: &PlannerInputs) -> Self {
        let p = &inputs.params;
        Self {
            current_age: Some(p.current_age),
            retirement_age: Some(p.retirement_age),
            end_age: Some(p.end_age),
            sip_payment_end_age: Some(p.sip_payment_end_age),
            yearly_income_increase: Some(p.yearly_income_increase),
            added_corpus_now: Some(p.added_corpus_now),
            added_corpus_retirement: Some(p.added_corpus_retirement),
            sip_increase_rate: Some(p.sip_increase_rate),
            sip_freeze_age: Some(p.sip_freeze_age),
            expected_return: Some(p.expected_return),
            calculation_mode: Some(inputs.calculation_mode.into()),
            starting_sip_amount: Some(inputs.starting_sip_amount),
            starting_monthly_income: Some(inputs.starting_monthly_income),
            target_end_corpus: Some(inputs.target_end_corpus),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    fn into_f64(self) -> Result<f64, String> {
        match self {
            LenientNumber::Number(v) => Ok(v),
            LenientNumber::Text(raw) => {
                let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
                let trimmed = cleaned.trim();
                if trimmed.is_empty() {
                    return Ok(0.0);
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| format!("'{raw}' is not a number"))
            }
        }
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<LenientNumber>::deserialize(deserializer)?
        .map(LenientNumber::into_f64)
        .transpose()
        .map_err(de::Error::custom)
}

fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = lenient_amount(deserializer)? else {
        return Ok(None);
    };
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 || value.fract() != 0.0 {
        return Err(de::Error::custom(format!(
            "age must be a non-negative whole number, got {value}"
        )));
    }
    Ok(Some(value as u32))
}

/// Layers `payload` over `base` and validates the result.
pub fn apply_payload(
    base: PlannerInputs,
    payload: InputsPayload,
) -> Result<PlannerInputs, PlannerError> {
    let mut inputs = base;
    let p = &mut inputs.params;

    if let Some(v) = payload.current_age {
        p.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        p.retirement_age = v;
    }
    if let Some(v) = payload.end_age {
        p.end_age = v;
    }
    if let Some(v) = payload.sip_payment_end_age {
        p.sip_payment_end_age = v;
    }
    if let Some(v) = payload.yearly_income_increase {
        p.yearly_income_increase = v;
    }
    if let Some(v) = payload.added_corpus_now {
        p.added_corpus_now = v;
    }
    if let Some(v) = payload.added_corpus_retirement {
        p.added_corpus_retirement = v;
    }
    if let Some(v) = payload.sip_increase_rate {
        p.sip_increase_rate = v;
    }
    if let Some(v) = payload.sip_freeze_age {
        p.sip_freeze_age = v;
    }
    if let Some(v) = payload.expected_return {
        p.expected_return = v;
    }

    if let Some(v) = payload.calculation_mode {
        inputs.calculation_mode = v.into();
    }
    if let Some(v) = payload.starting_sip_amount {
        inputs.starting_sip_amount = v;
    }
    if let Some(v) = payload.starting_monthly_income {
        inputs.starting_monthly_income = v;
    }
    if let Some(v) = payload.target_end_corpus {
        inputs.target_end_corpus = v;
    }

    validate_inputs(&inputs)?;
    Ok(inputs)
}

fn validate_inputs(inputs: &PlannerInputs) -> Result<(), PlannerError> {
    let p = &inputs.params;

    let ages = [
        ("currentAge", p.current_age),
        ("retirementAge", p.retirement_age),
        ("endAge", p.end_age),
        ("sipPaymentEndAge", p.sip_payment_end_age),
        ("sipFreezeAge", p.sip_freeze_age),
    ];
    for (field, age) in ages {
        if age > MAX_AGE {
            return Err(PlannerError::invalid(field, format!("must be <= {MAX_AGE}")));
        }
    }

    let amounts = [
        ("addedCorpusNow", p.added_corpus_now),
        ("addedCorpusRetirement", p.added_corpus_retirement),
        ("startingSipAmount", inputs.starting_sip_amount),
        ("startingMonthlyIncome", inputs.starting_monthly_income),
        ("targetEndCorpus", inputs.target_end_corpus),
    ];
    for (field, value) in amounts {
        if !value.is_finite() || value < 0.0 {
            return Err(PlannerError::invalid(field, "must be a finite amount >= 0"));
        }
    }

    let rates = [
        ("yearlyIncomeIncrease", p.yearly_income_increase),
        ("sipIncreaseRate", p.sip_increase_rate),
        ("expectedReturn", p.expected_return),
    ];
    for (field, value) in rates {
        if !value.is_finite() || value <= -100.0 {
            return Err(PlannerError::invalid(field, "must be a finite rate > -100"));
        }
    }

    Ok(())
}
