use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{CalculationMode, GoalSolveResult, PlannerError, PlannerInputs, solve_goal};
use crate::format::{amount_in_words, format_currency, format_number_with_commas};
use crate::inputs::{ApiCalculationMode, InputsPayload, apply_payload};
use crate::store::ParameterCache;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliCalculationMode {
    CalculateSip,
    CalculateIncome,
    CalculateEndCorpus,
}

impl From<CliCalculationMode> for ApiCalculationMode {
    fn from(value: CliCalculationMode) -> Self {
        match value {
            CliCalculationMode::CalculateSip => ApiCalculationMode::CalculateSip,
            CliCalculationMode::CalculateIncome => ApiCalculationMode::CalculateIncome,
            CliCalculationMode::CalculateEndCorpus => ApiCalculationMode::CalculateEndCorpus,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliOutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "swp-planner",
    about = "SIP accumulation + SWP withdrawal retirement corpus planner"
)]
pub struct Cli {
    #[arg(long)]
    pub current_age: Option<u32>,
    #[arg(long)]
    pub retirement_age: Option<u32>,
    #[arg(long, help = "Last simulated age (inclusive)")]
    pub end_age: Option<u32>,
    #[arg(long, help = "Last age at which monthly SIP contributions are made")]
    pub sip_payment_end_age: Option<u32>,
    #[arg(long, help = "Annual increase of the withdrawal income in percent")]
    pub yearly_income_increase: Option<f64>,
    #[arg(long, help = "Lump sum invested at the start")]
    pub added_corpus_now: Option<f64>,
    #[arg(long, help = "Lump sum added in the retirement year")]
    pub added_corpus_retirement: Option<f64>,
    #[arg(long, help = "Annual SIP step-up in percent")]
    pub sip_increase_rate: Option<f64>,
    #[arg(long, help = "Age from which the SIP amount stops stepping up")]
    pub sip_freeze_age: Option<u32>,
    #[arg(long, help = "Expected annual return in percent, compounded monthly")]
    pub expected_return: Option<f64>,
    #[arg(long, value_enum)]
    pub mode: Option<CliCalculationMode>,
    #[arg(long)]
    pub starting_sip_amount: Option<f64>,
    #[arg(long)]
    pub starting_monthly_income: Option<f64>,
    #[arg(long)]
    pub target_end_corpus: Option<f64>,
    #[arg(long, value_enum, default_value_t = CliOutputFormat::Table)]
    pub format: CliOutputFormat,
    #[arg(
        long,
        env = "SWP_CACHE_FILE",
        help = "Remember the last inputs in this file (discarded after 30 days)"
    )]
    pub cache_file: Option<PathBuf>,
    #[arg(long, default_value_t = false, help = "Forget cached inputs before running")]
    pub clear_cache: bool,
}

impl From<&Cli> for InputsPayload {
    fn from(cli: &Cli) -> Self {
        Self {
            current_age: cli.current_age,
            retirement_age: cli.retirement_age,
            end_age: cli.end_age,
            sip_payment_end_age: cli.sip_payment_end_age,
            yearly_income_increase: cli.yearly_income_increase,
            added_corpus_now: cli.added_corpus_now,
            added_corpus_retirement: cli.added_corpus_retirement,
            sip_increase_rate: cli.sip_increase_rate,
            sip_freeze_age: cli.sip_freeze_age,
            expected_return: cli.expected_return,
            calculation_mode: cli.mode.map(Into::into),
            starting_sip_amount: cli.starting_sip_amount,
            starting_monthly_income: cli.starting_monthly_income,
            target_end_corpus: cli.target_end_corpus,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    inputs: PlannerInputs,
    #[serde(flatten)]
    result: GoalSolveResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// One-shot calculation driven by command-line flags.
pub fn run_cli(cli: Cli) -> Result<(), PlannerError> {
    let now = Utc::now();
    let cache = cli.cache_file.clone().map(ParameterCache::new);
    let defaults = PlannerInputs::default();

    let base = match &cache {
        Some(cache) if cli.clear_cache => {
            cache.clear()?;
            defaults
        }
        Some(cache) => cache.load(&defaults, now),
        None => defaults,
    };

    let inputs = apply_payload(base, InputsPayload::from(&cli))?;
    let result = solve_goal(&inputs)?;
    let response = SimulateResponse { inputs, result };

    match cli.format {
        CliOutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        CliOutputFormat::Table => print!("{}", render_table(&response.result)),
    }

    // Cache write failures are logged, not fatal.
    if let Some(cache) = &cache {
        if let Err(err) = cache.save(&response.inputs, now) {
            warn!(path = %cache.path().display(), %err, "could not save inputs to cache");
        }
    }
    Ok(())
}

fn render_table(result: &GoalSolveResult) -> String {
    let summary = &result.report.summary;
    let mut out = String::new();

    let solved = match (result.mode, result.solved_value) {
        (CalculationMode::CalculateSip, Some(v)) => {
            format!("Required monthly SIP: {}", describe_amount(v))
        }
        (CalculationMode::CalculateIncome, Some(v)) => {
            format!("Sustainable monthly income: {}", describe_amount(v))
        }
        _ => format!("Final corpus: {}", describe_amount(summary.final_corpus)),
    };
    out.push_str(&format!("{solved}\n{}\n", result.message));
    out.push_str(&format!(
        "Total SIP invested: {}  Total withdrawn: {}  Final corpus: {}\n\n",
        format_currency(summary.total_sip_invested as f64),
        format_currency(summary.total_withdrawn as f64),
        format_currency(summary.final_corpus),
    ));

    out.push_str(&format!(
        "{:>4} {:>14} {:>12} {:>12} {:>14} {:>14} {:>12}  {}\n",
        "Age", "Start", "SIP/mo", "Income/mo", "Withdrawn", "End", "Net/mo", "Status"
    ));
    for year in &result.report.yearly_data {
        let status = match (year.is_retired, year.is_sip_active, year.is_sip_frozen) {
            (true, true, _) => "Retired, SIP",
            (true, false, _) => "Retired",
            (false, true, true) => "SIP frozen",
            (false, true, false) => "SIP",
            (false, false, _) => "-",
        };
        out.push_str(&format!(
            "{:>4} {:>14} {:>12} {:>12} {:>14} {:>14} {:>12}  {}\n",
            year.age,
            format_currency(year.year_start_corpus as f64),
            format_currency(year.sip_amount as f64),
            format_currency(year.monthly_income as f64),
            format_currency(year.total_withdrawal_for_year as f64),
            format_currency(year.year_end_corpus as f64),
            format_currency(year.net_cash_flow as f64),
            status,
        ));
    }
    out
}

fn describe_amount(value: f64) -> String {
    let exact = format_number_with_commas(value.round());
    let words = amount_in_words(value);
    if words.is_empty() {
        format!("{} [{exact}]", format_currency(value))
    } else {
        format!("{} ({words}) [{exact}]", format_currency(value))
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/defaults", get(defaults_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "SWP planner HTTP API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, PlannerInputs::default())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<InputsPayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<InputsPayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: InputsPayload) -> Response {
    match build_simulate_response(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => error_response(status_for(&err), &err.to_string()),
    }
}

fn build_simulate_response(payload: InputsPayload) -> Result<SimulateResponse, PlannerError> {
    let inputs = apply_payload(PlannerInputs::default(), payload)?;
    let result = solve_goal(&inputs)?;
    Ok(SimulateResponse { inputs, result })
}

fn status_for(err: &PlannerError) -> StatusCode {
    match err {
        PlannerError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_from_json(json: &str) -> InputsPayload {
        serde_json::from_str(json).expect("json should parse")
    }

    fn sample_payload() -> InputsPayload {
        payload_from_json(
            r#"{
              "currentAge": 30,
              "retirementAge": 60,
              "endAge": 85,
              "sipPaymentEndAge": 60,
              "yearlyIncomeIncrease": 5,
              "addedCorpusNow": 1000000,
              "addedCorpusRetirement": 5000000,
              "sipIncreaseRate": 5,
              "sipFreezeAge": 50,
              "expectedReturn": 10,
              "calculationMode": "calculateEndCorpus",
              "startingSipAmount": 50000,
              "startingMonthlyIncome": 100000
            }"#,
        )
    }

    #[test]
    fn payload_parses_web_keys_over_defaults() {
        let inputs =
            apply_payload(PlannerInputs::default(), sample_payload()).expect("valid inputs");

        assert_eq!(inputs.params.current_age, 30);
        assert_eq!(inputs.params.retirement_age, 60);
        assert_eq!(inputs.params.sip_freeze_age, 50);
        assert_eq!(inputs.params.added_corpus_now, 1_000_000.0);
        assert_eq!(inputs.calculation_mode, CalculationMode::CalculateEndCorpus);
        assert_eq!(inputs.starting_sip_amount, 50_000.0);
        assert_eq!(inputs.target_end_corpus, 0.0);
    }

    #[test]
    fn apply_payload_rejects_out_of_range_fields() {
        let mut payload = sample_payload();
        payload.expected_return = Some(-100.0);
        let err = apply_payload(PlannerInputs::default(), payload).expect_err("must reject");
        assert!(err.to_string().contains("expectedReturn"));
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);

        let mut payload = sample_payload();
        payload.added_corpus_retirement = Some(-1.0);
        let err = apply_payload(PlannerInputs::default(), payload).expect_err("must reject");
        assert!(err.to_string().contains("addedCorpusRetirement"));

        let mut payload = sample_payload();
        payload.end_age = Some(200);
        let err = apply_payload(PlannerInputs::default(), payload).expect_err("must reject");
        assert!(err.to_string().contains("endAge"));
    }

    #[test]
    fn end_age_before_current_age_is_accepted() {
        let mut payload = sample_payload();
        payload.end_age = Some(29);
        let response = build_simulate_response(payload).expect("empty range is valid");
        assert!(response.result.report.yearly_data.is_empty());
        assert_eq!(response.result.report.summary.final_corpus, 1_000_000.0);
    }

    #[test]
    fn cli_flags_map_onto_payload() {
        let cli = Cli::try_parse_from([
            "swp-planner",
            "--current-age",
            "40",
            "--mode",
            "calculate-income",
            "--target-end-corpus",
            "5000000",
            "--format",
            "json",
        ])
        .expect("flags should parse");
        assert_eq!(cli.format, CliOutputFormat::Json);

        let payload = InputsPayload::from(&cli);
        assert_eq!(payload.current_age, Some(40));
        assert_eq!(payload.end_age, None);
        assert_eq!(
            payload.calculation_mode,
            Some(ApiCalculationMode::CalculateIncome)
        );

        let inputs = apply_payload(PlannerInputs::default(), payload).expect("valid inputs");
        assert_eq!(inputs.params.current_age, 40);
        assert_eq!(inputs.params.end_age, 85);
        assert_eq!(inputs.target_end_corpus, 5_000_000.0);
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let response = build_simulate_response(sample_payload()).expect("valid request");
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"inputs\""));
        assert!(json.contains("\"calculationMode\":\"calculateEndCorpus\""));
        assert!(json.contains("\"mode\":\"calculateEndCorpus\""));
        assert!(json.contains("\"yearlyData\""));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"isSipFrozen\""));
        assert!(json.contains("\"converged\":true"));
    }

    #[test]
    fn cli_run_survives_unwritable_cache_file() {
        let blocker = std::env::temp_dir().join(format!(
            "swp-planner-{}-cache-blocker",
            std::process::id()
        ));
        std::fs::write(&blocker, "not a directory").expect("write blocker file");
        let cache_file = blocker.join("swp").join("cache.json");

        let cli = Cli::try_parse_from([
            "swp-planner",
            "--mode",
            "calculate-end-corpus",
            "--format",
            "json",
            "--cache-file",
            cache_file.to_str().expect("utf-8 temp path"),
        ])
        .expect("flags should parse");

        run_cli(cli).expect("result is printed even when the cache cannot be written");
        assert!(!cache_file.exists());
        std::fs::remove_file(&blocker).expect("remove blocker file");
    }

    #[test]
    fn table_lists_every_simulated_year() {
        let response = build_simulate_response(sample_payload()).expect("valid request");
        let table = render_table(&response.result);

        assert!(table.starts_with("Final corpus: "));
        let rows = table
            .lines()
            .skip_while(|line| !line.trim_start().starts_with("Age"))
            .skip(1)
            .count();
        assert_eq!(rows, response.result.report.yearly_data.len());
        assert!(table.contains("SIP frozen"));
        assert!(table.contains("Retired"));
    }
}
