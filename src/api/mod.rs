mod cli;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use jiff::civil::{Date, date};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

use crate::core::{
    CacheKey, Gender, MAX_PROJECTION_AGE, NoCache, OldAgeSecurityResult, PensionInput,
    PersonProfile, PlanReport, PlanRules, ResultCache, TtlCache, UniversalPensionResult,
    build_plan, calculate_pension, evaluate_withdrawal_strategies, generate_comparison,
    generate_projection, household_planning_age, income_sources, mortality,
};

pub use cli::{AssumptionPreset, Cli, CliGender, Command, ProfileArgs, build_profile};
pub use error::{ApiError, ApiResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartnerPayload {
    birth_date: Date,
    gender: Gender,
    #[serde(default)]
    annual_pension_income: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    birth_date: Option<Date>,
    valuation_date: Option<Date>,
    gender: Option<Gender>,
    annual_salary: Option<f64>,
    monthly_expenses: Option<f64>,
    service_years: Option<f64>,
    full_time_fraction: Option<f64>,
    retirement_age: Option<u32>,

    registered_savings: Option<f64>,
    tax_free_savings: Option<f64>,
    non_registered_savings: Option<f64>,
    cash_savings: Option<f64>,

    universal_pension_at_65: Option<f64>,
    universal_pension_start_age: Option<u32>,
    retirement_taxable_income: Option<f64>,
    partner: Option<PartnerPayload>,

    survivor_percentage: Option<f64>,
    assumptions: Option<AssumptionPreset>,
    capital: Option<f64>,
    horizon_age: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MortalityPayload {
    age: f64,
    gender: String,
}

#[derive(Copy, Clone, Debug)]
struct ApiOptions {
    assumptions: AssumptionPreset,
    /// Fraction, not percent.
    survivor_percentage: f64,
    capital: Option<f64>,
    horizon_age: Option<u32>,
}

#[derive(Debug)]
struct ApiRequest {
    profile: PersonProfile,
    options: ApiOptions,
}

impl ApiRequest {
    fn plan_rules(&self) -> PlanRules {
        PlanRules {
            survivor_percentage: self.options.survivor_percentage,
            ..PlanRules::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicPensionResponse {
    universal_pension: UniversalPensionResult,
    old_age_security: OldAgeSecurityResult,
}

#[derive(Clone)]
pub struct AppState {
    cache: Arc<dyn ResultCache<CacheKey, PlanReport>>,
}

impl AppState {
    pub fn new(cache_ttl: Duration) -> Self {
        let cache: Arc<dyn ResultCache<CacheKey, PlanReport>> = if cache_ttl.is_zero() {
            Arc::new(NoCache)
        } else {
            Arc::new(TtlCache::new(cache_ttl))
        };
        Self { cache }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/mortality", post(mortality_handler))
        .route("/api/pension", post(pension_handler))
        .route("/api/universal-pension", post(universal_pension_handler))
        .route("/api/supplement", post(supplement_handler))
        .route("/api/projection", post(projection_handler))
        .route("/api/withdrawal", post(withdrawal_handler))
        .route("/api/comparison", post(comparison_handler))
        .route("/api/plan", post(plan_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, cache_ttl: Duration) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(AppState::new(cache_ttl));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, cache_ttl_secs = cache_ttl.as_secs(), "retraite HTTP API listening");

    axum::serve(listener, app).await
}

/// Builds the full plan for the `plan` subcommand as pretty JSON.
pub fn run_plan(args: &ProfileArgs) -> ApiResult<String> {
    let profile = build_profile(args, today())?;
    let rules = PlanRules {
        survivor_percentage: args.survivor_percentage / 100.0,
        ..PlanRules::default()
    };
    let report = build_plan(&profile, &args.assumptions.assumption_set(), &rules)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    json_response(StatusCode::NOT_FOUND, json!({ "error": "Not found" }))
}

async fn mortality_handler(
    payload: Result<Json<MortalityPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    let gender: Gender = payload.gender.parse()?;
    let result = mortality(payload.age, gender)?;
    Ok(json_response(StatusCode::OK, result))
}

async fn pension_handler(payload: Result<Json<PlanPayload>, JsonRejection>) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let input = PensionInput::from_profile(&request.profile, request.options.survivor_percentage);
    let result = calculate_pension(&input, &request.plan_rules().pension);
    Ok(json_response(StatusCode::OK, result))
}

async fn universal_pension_handler(
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let sources = income_sources(&request.profile, &request.plan_rules());
    let response = PublicPensionResponse {
        universal_pension: sources.universal_pension.unwrap_or_default(),
        old_age_security: sources.old_age_security.unwrap_or_default(),
    };
    Ok(json_response(StatusCode::OK, response))
}

async fn supplement_handler(
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let sources = income_sources(&request.profile, &request.plan_rules());
    Ok(json_response(
        StatusCode::OK,
        sources.supplement.unwrap_or_default(),
    ))
}

async fn projection_handler(
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let rules = request.plan_rules();
    let horizon = match request.options.horizon_age {
        Some(age) => age,
        None => household_planning_age(&request.profile)?,
    };
    let sources = income_sources(&request.profile, &rules);
    let result = generate_projection(
        &request.profile,
        &sources,
        &request.options.assumptions.assumption_set(),
        horizon,
        &rules.projection,
    );
    Ok(json_response(StatusCode::OK, result))
}

async fn withdrawal_handler(
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let capital = request
        .options
        .capital
        .unwrap_or_else(|| request.profile.savings.total());
    let result =
        evaluate_withdrawal_strategies(capital, &request.profile, &request.plan_rules().withdrawal);
    Ok(json_response(StatusCode::OK, result))
}

async fn comparison_handler(
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let rules = request.plan_rules();
    let sources = income_sources(&request.profile, &rules);
    let report = generate_comparison(
        &request.profile,
        &sources,
        &rules.comparison,
        &rules.projection,
    )?;
    Ok(json_response(StatusCode::OK, report))
}

async fn plan_handler(
    State(state): State<AppState>,
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> ApiResult<Response> {
    let request = parse_request(payload)?;
    let report = cached_plan(&state, &request)?;
    Ok(json_response(StatusCode::OK, report))
}

fn cached_plan(state: &AppState, request: &ApiRequest) -> ApiResult<PlanReport> {
    let assumptions = request.options.assumptions.assumption_set();
    let key = CacheKey::for_plan(
        &request.profile,
        &assumptions,
        request.options.survivor_percentage,
    );
    if let Some(report) = state.cache.get(&key) {
        tracing::debug!(key = key.value(), "plan cache hit");
        return Ok(report);
    }

    let report = build_plan(&request.profile, &assumptions, &request.plan_rules())?;
    state.cache.set(key, report.clone());
    Ok(report)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn today() -> Date {
    jiff::Zoned::now().date()
}

fn parse_request(payload: Result<Json<PlanPayload>, JsonRejection>) -> ApiResult<ApiRequest> {
    let Json(payload) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    api_request_from_payload(payload, today())
}

#[cfg(test)]
fn api_request_from_json(json: &str, today: Date) -> ApiResult<ApiRequest> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
    api_request_from_payload(payload, today)
}

fn api_request_from_payload(payload: PlanPayload, today: Date) -> ApiResult<ApiRequest> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.birth_date {
        args.birth_date = v;
    }
    if let Some(v) = payload.valuation_date {
        args.valuation_date = Some(v);
    }
    if let Some(v) = payload.gender {
        args.gender = v.into();
    }
    if let Some(v) = payload.annual_salary {
        args.annual_salary = v;
    }
    if let Some(v) = payload.monthly_expenses {
        args.monthly_expenses = v;
    }
    if let Some(v) = payload.service_years {
        args.service_years = v;
    }
    if let Some(v) = payload.full_time_fraction {
        args.full_time_fraction = v;
    }
    if let Some(v) = payload.retirement_age {
        args.retirement_age = v;
    }

    if let Some(v) = payload.registered_savings {
        args.registered_savings = v;
    }
    if let Some(v) = payload.tax_free_savings {
        args.tax_free_savings = v;
    }
    if let Some(v) = payload.non_registered_savings {
        args.non_registered_savings = v;
    }
    if let Some(v) = payload.cash_savings {
        args.cash_savings = v;
    }

    if let Some(v) = payload.universal_pension_at_65 {
        args.universal_pension_at_65 = v;
    }
    if let Some(v) = payload.universal_pension_start_age {
        args.universal_pension_start_age = v;
    }
    if payload.retirement_taxable_income.is_some() {
        args.retirement_taxable_income = payload.retirement_taxable_income;
    }
    if let Some(partner) = payload.partner {
        args.partner_birth_date = Some(partner.birth_date);
        args.partner_gender = Some(partner.gender.into());
        args.partner_pension_income = partner.annual_pension_income;
    }

    if let Some(v) = payload.survivor_percentage {
        args.survivor_percentage = v;
    }
    if let Some(v) = payload.assumptions {
        args.assumptions = v;
    }

    if let Some(capital) = payload.capital {
        if !capital.is_finite() || capital < 0.0 {
            return Err(ApiError::Validation(vec![
                "capital must be a finite amount >= 0".to_string(),
            ]));
        }
    }
    if let Some(horizon) = payload.horizon_age {
        if horizon > MAX_PROJECTION_AGE {
            return Err(ApiError::Validation(vec![format!(
                "horizonAge must be <= {MAX_PROJECTION_AGE}"
            )]));
        }
    }

    let profile = build_profile(&args, today)?;
    Ok(ApiRequest {
        profile,
        options: ApiOptions {
            assumptions: args.assumptions,
            survivor_percentage: args.survivor_percentage / 100.0,
            capital: payload.capital,
            horizon_age: payload.horizon_age,
        },
    })
}

fn default_args_for_api() -> ProfileArgs {
    ProfileArgs {
        birth_date: date(1980, 1, 1),
        valuation_date: None,
        gender: CliGender::Female,
        annual_salary: 75_000.0,
        monthly_expenses: 3_000.0,
        service_years: 15.0,
        full_time_fraction: 1.0,
        retirement_age: 61,
        registered_savings: 0.0,
        tax_free_savings: 0.0,
        non_registered_savings: 0.0,
        cash_savings: 0.0,
        universal_pension_at_65: 12_000.0,
        universal_pension_start_age: 65,
        retirement_taxable_income: None,
        partner_birth_date: None,
        partner_gender: None,
        partner_pension_income: 0.0,
        survivor_percentage: 60.0,
        assumptions: AssumptionPreset::Standard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineError, WithdrawalStrategy};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn valuation_day() -> Date {
        date(2025, 1, 1)
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "birthDate": "1968-09-30",
          "valuationDate": "2025-06-01",
          "gender": "m",
          "annualSalary": 92000,
          "monthlyExpenses": 4200,
          "serviceYears": 27.5,
          "fullTimeFraction": 0.8,
          "retirementAge": 60,
          "registeredSavings": 150000,
          "taxFreeSavings": 60000,
          "nonRegisteredSavings": 20000,
          "cashSavings": 8000,
          "universalPensionAt65": 14500,
          "universalPensionStartAge": 70,
          "retirementTaxableIncome": 41000,
          "partner": { "birthDate": "1971-02-01", "gender": "female", "annualPensionIncome": 9000 },
          "survivorPercentage": 50,
          "assumptions": "conservative",
          "capital": 750000,
          "horizonAge": 95
        }"#;
        let request = api_request_from_json(json, valuation_day()).expect("json should parse");
        let profile = &request.profile;

        assert_eq!(profile.birth_date, date(1968, 9, 30));
        assert_eq!(profile.valuation_date, date(2025, 6, 1));
        assert_eq!(profile.age(), 56);
        assert_eq!(profile.gender, Gender::Male);
        assert_approx(profile.annual_salary, 92_000.0);
        assert_approx(profile.monthly_expenses, 4_200.0);
        assert_approx(profile.service_years, 27.5);
        assert_approx(profile.full_time_fraction, 0.8);
        assert_eq!(profile.retirement_age, 60);
        assert_approx(profile.savings.total(), 238_000.0);
        assert_approx(profile.savings.tax_advantaged(), 210_000.0);
        assert_approx(profile.expected_universal_pension_at_65, 14_500.0);
        assert_eq!(profile.universal_pension_start_age, 70);
        assert_eq!(profile.retirement_taxable_income, Some(41_000.0));
        let partner = profile.partner.as_ref().expect("partner parsed");
        assert_eq!(partner.gender, Gender::Female);
        assert_approx(partner.annual_pension_income, 9_000.0);

        assert_approx(request.options.survivor_percentage, 0.5);
        assert_eq!(request.options.assumptions, AssumptionPreset::Conservative);
        assert_eq!(request.options.capital, Some(750_000.0));
        assert_eq!(request.options.horizon_age, Some(95));
    }

    #[test]
    fn empty_payload_uses_api_defaults() {
        let request = api_request_from_json("{}", valuation_day()).expect("defaults are valid");
        assert_eq!(request.profile.valuation_date, valuation_day());
        assert_eq!(request.profile.age(), 45);
        assert_eq!(request.profile.gender, Gender::Female);
        assert_eq!(request.profile.retirement_age, 61);
        assert!(request.profile.partner.is_none());
        assert_approx(request.options.survivor_percentage, 0.6);
        assert_eq!(request.options.assumptions, AssumptionPreset::Standard);
    }

    #[test]
    fn invalid_profile_is_rejected_with_details() {
        let err = api_request_from_json(
            r#"{ "retirementAge": 50, "monthlyExpenses": -1 }"#,
            valuation_day(),
        )
        .expect_err("profile must be rejected");
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.details().len(), 2);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn negative_capital_is_rejected() {
        let err = api_request_from_json(r#"{ "capital": -5 }"#, valuation_day())
            .expect_err("capital must be rejected");
        assert!(err.details()[0].contains("capital"));
    }

    #[test]
    fn out_of_range_ages_are_rejected() {
        let err = api_request_from_json(r#"{ "horizonAge": 4000000000 }"#, valuation_day())
            .expect_err("horizon must be rejected");
        assert!(err.details()[0].contains("horizonAge"));

        let err = api_request_from_json(r#"{ "retirementAge": 4000000000 }"#, valuation_day())
            .expect_err("retirement age must be rejected");
        assert!(err.details()[0].contains("retirement age must be <="));

        let request = api_request_from_json(r#"{ "horizonAge": 110 }"#, valuation_day())
            .expect("the cap itself is accepted");
        assert_eq!(request.options.horizon_age, Some(MAX_PROJECTION_AGE));
    }

    #[test]
    fn malformed_json_is_an_invalid_payload() {
        let err = api_request_from_json(r#"{ "gender": "x" }"#, valuation_day())
            .expect_err("unknown gender must fail");
        assert!(matches!(err, ApiError::InvalidPayload(_)));
    }

    #[test]
    fn unknown_gender_string_maps_to_engine_error() {
        let err: ApiError = "other"
            .parse::<Gender>()
            .map_err(ApiError::from)
            .expect_err("must fail");
        assert!(matches!(
            err,
            ApiError::Engine(EngineError::InvalidGender(ref g)) if g == "other"
        ));
        assert_eq!(err.to_string(), "invalid gender: other");
    }

    #[test]
    fn plan_cache_serves_repeated_requests() {
        let state = AppState::new(Duration::from_secs(60));
        let request = api_request_from_json("{}", valuation_day()).expect("valid");
        let key = CacheKey::for_plan(
            &request.profile,
            &request.options.assumptions.assumption_set(),
            request.options.survivor_percentage,
        );
        assert!(state.cache.get(&key).is_none());

        let first = cached_plan(&state, &request).expect("plan builds");
        assert!(state.cache.get(&key).is_some());
        let second = cached_plan(&state, &request).expect("plan builds");
        assert_eq!(first, second);

        let uncached = AppState::new(Duration::ZERO);
        cached_plan(&uncached, &request).expect("plan builds");
        assert!(uncached.cache.get(&key).is_none());
    }

    #[test]
    fn plan_response_serialization_contains_expected_fields() {
        let state = AppState::new(Duration::ZERO);
        let request = api_request_from_json(r#"{ "registeredSavings": 200000 }"#, valuation_day())
            .expect("valid");
        let report = cached_plan(&state, &request).expect("plan builds");
        assert_eq!(
            report.strategies.iter().map(|s| s.strategy).collect::<Vec<_>>(),
            WithdrawalStrategy::ALL.to_vec()
        );

        let json = serde_json::to_string(&report).expect("report should serialize");
        assert!(json.contains("\"householdPlanningAge\""));
        assert!(json.contains("\"finalAnnualAmount\""));
        assert!(json.contains("\"sustainableMonthlySpending\""));
        assert!(json.contains("\"calendarYear\""));
        assert!(json.contains("\"genericBaseline\""));
        assert!(json.contains("\"self\""));
    }

    #[test]
    fn public_pension_response_uses_camel_case() {
        let request = api_request_from_json(r#"{ "universalPensionStartAge": 60 }"#, valuation_day())
            .expect("valid");
        let sources = income_sources(&request.profile, &request.plan_rules());
        let response = PublicPensionResponse {
            universal_pension: sources.universal_pension.unwrap_or_default(),
            old_age_security: sources.old_age_security.unwrap_or_default(),
        };
        assert_approx(response.universal_pension.annual_amount, 12_000.0 * 0.64);
        let json = serde_json::to_string(&response).expect("serializes");
        assert!(json.contains("\"universalPension\""));
        assert!(json.contains("\"netAnnualAmount\""));
    }

    #[test]
    fn run_plan_prints_json() {
        let args = ProfileArgs {
            valuation_date: Some(valuation_day()),
            ..default_args_for_api()
        };
        let output = run_plan(&args).expect("plan builds");
        let value: serde_json::Value = serde_json::from_str(&output).expect("valid JSON");
        assert!(value["projection"]["points"].is_array());
    }
}
