use std::fmt;
use std::str::FromStr;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::error::EngineError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[serde(alias = "m", alias = "homme")]
    Male,
    #[serde(alias = "f", alias = "femme")]
    Female,
}

impl FromStr for Gender {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" | "homme" => Ok(Gender::Male),
            "female" | "f" | "femme" => Ok(Gender::Female),
            other => Err(EngineError::InvalidGender(other.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    /// Tax-deferred registered savings (RRSP/RRIF-like).
    Registered,
    /// Tax-free savings (TFSA-like).
    TaxFree,
    NonRegistered,
    Cash,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Registered,
        AccountType::TaxFree,
        AccountType::NonRegistered,
        AccountType::Cash,
    ];

    /// Registered and tax-free accounts; the retirement drawdown is taken from these.
    pub fn is_tax_advantaged(self) -> bool {
        matches!(self, AccountType::Registered | AccountType::TaxFree)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsBalances {
    pub registered: f64,
    pub tax_free: f64,
    pub non_registered: f64,
    pub cash: f64,
}

impl SavingsBalances {
    pub fn balance(&self, account: AccountType) -> f64 {
        match account {
            AccountType::Registered => self.registered,
            AccountType::TaxFree => self.tax_free,
            AccountType::NonRegistered => self.non_registered,
            AccountType::Cash => self.cash,
        }
    }

    pub fn total(&self) -> f64 {
        AccountType::ALL.iter().map(|&a| self.balance(a)).sum()
    }

    pub fn tax_advantaged(&self) -> f64 {
        AccountType::ALL
            .iter()
            .filter(|a| a.is_tax_advantaged())
            .map(|&a| self.balance(a))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProfile {
    pub birth_date: Date,
    pub gender: Gender,
    pub annual_pension_income: f64,
}

/// Everything the engine needs to know about the planner, frozen at
/// `valuation_date`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonProfile {
    pub birth_date: Date,
    pub valuation_date: Date,
    pub gender: Gender,
    pub annual_salary: f64,
    pub monthly_expenses: f64,
    pub service_years: f64,
    pub full_time_fraction: f64,
    pub retirement_age: u32,
    pub savings: SavingsBalances,
    /// Government pension at 65 from the contributor statement, today's dollars.
    pub expected_universal_pension_at_65: f64,
    pub universal_pension_start_age: u32,
    pub retirement_taxable_income: Option<f64>,
    pub partner: Option<PartnerProfile>,
}

pub const MAX_SERVICE_YEARS: f64 = 35.0;
pub const MIN_EARLY_RETIREMENT_AGE: u32 = 55;
/// Oldest age a profile or projection may reach; projections stop here.
pub const MAX_PROJECTION_AGE: u32 = 110;

impl PersonProfile {
    pub fn age(&self) -> u32 {
        completed_years(self.birth_date, self.valuation_date).max(0) as u32
    }

    pub fn current_year(&self) -> i32 {
        i32::from(self.valuation_date.year())
    }

    pub fn partner_age(&self) -> Option<u32> {
        self.partner
            .as_ref()
            .map(|p| completed_years(p.birth_date, self.valuation_date).max(0) as u32)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if completed_years(self.birth_date, self.valuation_date) < 0 {
            errors.push("birth date must not be after the valuation date".to_string());
        }
        if !self.service_years.is_finite() || self.service_years < 0.0 {
            errors.push("service years must be >= 0".to_string());
        } else if self.service_years > MAX_SERVICE_YEARS {
            errors.push(format!("service years must be <= {MAX_SERVICE_YEARS}"));
        }
        if self.retirement_age < MIN_EARLY_RETIREMENT_AGE {
            errors.push(format!(
                "retirement age must be >= {MIN_EARLY_RETIREMENT_AGE}"
            ));
        } else if self.retirement_age > MAX_PROJECTION_AGE {
            errors.push(format!("retirement age must be <= {MAX_PROJECTION_AGE}"));
        }
        if completed_years(self.birth_date, self.valuation_date) > MAX_PROJECTION_AGE as i32 {
            errors.push(format!("age must be <= {MAX_PROJECTION_AGE}"));
        }
        if !(0.0..=1.0).contains(&self.full_time_fraction) || self.full_time_fraction == 0.0 {
            errors.push("full-time fraction must be in (0, 1]".to_string());
        }

        for (name, value) in [
            ("annual salary", self.annual_salary),
            ("monthly expenses", self.monthly_expenses),
            ("registered savings", self.savings.registered),
            ("tax-free savings", self.savings.tax_free),
            ("non-registered savings", self.savings.non_registered),
            ("cash savings", self.savings.cash),
            (
                "expected universal pension",
                self.expected_universal_pension_at_65,
            ),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be a finite amount >= 0"));
            }
        }

        if let Some(income) = self.retirement_taxable_income {
            if !income.is_finite() || income < 0.0 {
                errors.push("retirement taxable income must be >= 0".to_string());
            }
        }

        if let Some(partner) = &self.partner {
            if completed_years(partner.birth_date, self.valuation_date) < 0 {
                errors.push("partner birth date must not be after the valuation date".to_string());
            }
            if !partner.annual_pension_income.is_finite() || partner.annual_pension_income < 0.0 {
                errors.push("partner pension income must be >= 0".to_string());
            }
        }

        errors
    }
}

/// Whole years elapsed between `birth` and `on`; negative when `birth` is later.
pub fn completed_years(birth: Date, on: Date) -> i32 {
    let mut years = i32::from(on.year()) - i32::from(birth.year());
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MortalityResult {
    pub life_expectancy_years: f64,
    pub final_age: f64,
    pub recommended_planning_age: u32,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionScenario {
    pub retirement_age: u32,
    pub annual_amount: f64,
    pub lifetime_amount: f64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionCalculationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub credited_service_years: f64,
    pub base_annual_amount: f64,
    pub penalty_rate: f64,
    pub penalty_amount: f64,
    pub coordination_reduction: f64,
    pub final_annual_amount: f64,
    pub annual_amount_after_coordination_age: f64,
    pub survivor_annual_amount: f64,
    pub scenarios: Vec<PensionScenario>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversalPensionResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub start_age: u32,
    /// Negative when the pension is taken early, positive when deferred.
    pub adjustment_rate: f64,
    pub annual_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OldAgeSecurityResult {
    pub start_age: u32,
    pub deferral_bonus_rate: f64,
    pub gross_annual_amount: f64,
    pub recovery_tax: f64,
    pub net_annual_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementResult {
    pub eligible: bool,
    pub annual_amount: f64,
    pub reduction_rate: f64,
    pub income_threshold: f64,
    pub payable_from_age: u32,
}

/// Upstream calculator outputs merged into the projection; a missing entry
/// contributes nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomeSources {
    pub pension: Option<PensionCalculationResult>,
    pub universal_pension: Option<UniversalPensionResult>,
    pub old_age_security: Option<OldAgeSecurityResult>,
    pub supplement: Option<SupplementResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub age: u32,
    pub calendar_year: i32,
    pub capital: f64,
    pub annual_income: f64,
    pub annual_expenses: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MilestoneKind {
    Retirement,
    GoalReached,
    CapitalDepleted,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub age: u32,
    pub calendar_year: i32,
    pub label: String,
    pub kind: MilestoneKind,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionMetrics {
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub savings_rate: f64,
    pub capital_at_retirement: f64,
    pub target_annual_income: f64,
    pub readiness_score: f64,
    pub final_capital: f64,
    pub depletion_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub points: Vec<ProjectionPoint>,
    pub milestones: Vec<Milestone>,
    pub metrics: ProjectionMetrics,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithdrawalStrategy {
    FixedPercentage,
    Vpw,
    Guardrails,
    Bucket,
}

impl WithdrawalStrategy {
    pub const ALL: [WithdrawalStrategy; 4] = [
        WithdrawalStrategy::FixedPercentage,
        WithdrawalStrategy::Vpw,
        WithdrawalStrategy::Guardrails,
        WithdrawalStrategy::Bucket,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WithdrawalStrategy::FixedPercentage => "Fixed percentage (4% rule)",
            WithdrawalStrategy::Vpw => "Variable percentage withdrawal",
            WithdrawalStrategy::Guardrails => "Guardrails",
            WithdrawalStrategy::Bucket => "Bucket",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    pub strategy: WithdrawalStrategy,
    pub strategy_name: String,
    pub sustainable_annual_spending: f64,
    pub sustainable_monthly_spending: f64,
    pub assumptions: Vec<String>,
    pub notes: Vec<String>,
    pub risk_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub scenario_label: String,
    pub projected_capital: f64,
    pub monthly_income: f64,
    pub required_capital: f64,
    pub capital_shortfall: f64,
    pub recommended_planning_age: u32,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDeltas {
    pub capital_vs_generic: f64,
    pub capital_vs_generic_pct: f64,
    pub capital_vs_conservative: f64,
    pub capital_vs_conservative_pct: f64,
    pub monthly_income_vs_generic: f64,
    pub monthly_income_vs_generic_pct: f64,
    pub monthly_income_vs_conservative: f64,
    pub monthly_income_vs_conservative_pct: f64,
    pub planning_age_vs_generic: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    #[serde(rename = "self")]
    pub self_scenario: ComparisonResult,
    pub generic_baseline: ComparisonResult,
    pub conservative_baseline: ComparisonResult,
    pub deltas: ComparisonDeltas,
    pub advantages: Vec<String>,
}

/// Replaces NaN/infinite values with zero before they reach a result.
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
