use super::types::{PersonProfile, SupplementResult, finite_or_zero};

/// Income-tested supplement rules (GIS/SRG-style), annual amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupplementRules {
    pub qualifying_age: u32,
    pub max_annual_single: f64,
    pub max_annual_couple: f64,
    /// Qualifying income below this is ignored.
    pub income_threshold: f64,
    pub reduction_rate_single: f64,
    pub reduction_rate_couple: f64,
}

impl Default for SupplementRules {
    fn default() -> Self {
        Self {
            qualifying_age: 65,
            max_annual_single: 13_000.0,
            max_annual_couple: 7_800.0,
            income_threshold: 5_000.0,
            reduction_rate_single: 0.5,
            reduction_rate_couple: 0.25,
        }
    }
}

/// Evaluates the supplement payable once the planner is both retired and of
/// qualifying age. When the profile carries no explicit retirement income,
/// `estimated_income` is used for the income test.
pub fn evaluate_supplement(
    profile: &PersonProfile,
    estimated_income: f64,
    rules: &SupplementRules,
) -> SupplementResult {
    let income = profile.retirement_taxable_income.unwrap_or(estimated_income);
    let from_age = profile
        .age()
        .max(profile.retirement_age)
        .max(rules.qualifying_age);
    supplement_for_income(from_age, income, profile.partner.is_some(), rules)
}

pub fn supplement_for_income(
    age: u32,
    household_income: f64,
    has_partner: bool,
    rules: &SupplementRules,
) -> SupplementResult {
    let (max_amount, reduction_rate) = if has_partner {
        (rules.max_annual_couple, rules.reduction_rate_couple)
    } else {
        (rules.max_annual_single, rules.reduction_rate_single)
    };

    let income = finite_or_zero(household_income).max(0.0);
    let excess = (income - rules.income_threshold).max(0.0);
    let amount = (max_amount - excess * reduction_rate).max(0.0);
    let eligible = age >= rules.qualifying_age && amount > 0.0;

    SupplementResult {
        eligible,
        annual_amount: if eligible { amount } else { 0.0 },
        reduction_rate,
        income_threshold: rules.income_threshold,
        payable_from_age: age.max(rules.qualifying_age),
    }
}
