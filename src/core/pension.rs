use std::cmp::Ordering;

use super::types::{
    MAX_SERVICE_YEARS, MIN_EARLY_RETIREMENT_AGE, PensionCalculationResult, PensionScenario,
    PersonProfile,
};

/// Defined-benefit plan rules (RREGOP-style).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PensionRules {
    pub accrual_rate: f64,
    pub max_service_years: f64,
    pub min_early_retirement_age: u32,
    pub full_pension_age: u32,
    /// Age plus service needed to waive the penalty.
    pub points_threshold: f64,
    pub service_waiver_years: f64,
    pub penalty_per_year: f64,
    pub coordination_age: u32,
    pub coordination_offset: f64,
    pub scenario_end_age: u32,
    pub candidate_ages: [u32; 5],
    pub adequate_survivor_share: f64,
}

impl Default for PensionRules {
    fn default() -> Self {
        Self {
            accrual_rate: 0.02,
            max_service_years: MAX_SERVICE_YEARS,
            min_early_retirement_age: MIN_EARLY_RETIREMENT_AGE,
            full_pension_age: 61,
            points_threshold: 85.0,
            service_waiver_years: 30.0,
            penalty_per_year: 0.06,
            coordination_age: 65,
            coordination_offset: 5_000.0,
            scenario_end_age: 90,
            candidate_ages: [55, 58, 60, 61, 65],
            adequate_survivor_share: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PensionInput {
    pub current_age: u32,
    /// Service already credited at `current_age`.
    pub service_years: f64,
    pub pensionable_salary: f64,
    pub retirement_age: u32,
    pub full_time_fraction: f64,
    pub survivor_percentage: f64,
}

impl PensionInput {
    pub fn from_profile(profile: &PersonProfile, survivor_percentage: f64) -> Self {
        Self {
            current_age: profile.age(),
            service_years: profile.service_years,
            pensionable_salary: profile.annual_salary,
            retirement_age: profile.retirement_age,
            full_time_fraction: profile.full_time_fraction,
            survivor_percentage,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Breakdown {
    credited_service_years: f64,
    base: f64,
    penalty_rate: f64,
    penalty_amount: f64,
    coordination_reduction: f64,
    final_amount: f64,
    after_coordination_age: f64,
}

pub fn calculate_pension(input: &PensionInput, rules: &PensionRules) -> PensionCalculationResult {
    let errors = validate_input(input, rules);
    if !errors.is_empty() {
        tracing::debug!(?errors, "pension input rejected");
        return PensionCalculationResult {
            valid: false,
            errors,
            ..PensionCalculationResult::default()
        };
    }

    let breakdown = breakdown_at(input, rules, input.retirement_age);
    let survivor_annual_amount = breakdown.final_amount * input.survivor_percentage;
    let scenarios = build_scenarios(input, rules);
    let recommendations = build_recommendations(input, rules, &breakdown, &scenarios);

    tracing::debug!(
        retirement_age = input.retirement_age,
        credited = breakdown.credited_service_years,
        penalty_rate = breakdown.penalty_rate,
        final_amount = breakdown.final_amount,
        "pension calculated"
    );

    PensionCalculationResult {
        valid: true,
        errors: Vec::new(),
        credited_service_years: breakdown.credited_service_years,
        base_annual_amount: breakdown.base,
        penalty_rate: breakdown.penalty_rate,
        penalty_amount: breakdown.penalty_amount,
        coordination_reduction: breakdown.coordination_reduction,
        final_annual_amount: breakdown.final_amount,
        annual_amount_after_coordination_age: breakdown.after_coordination_age,
        survivor_annual_amount,
        scenarios,
        recommendations,
    }
}

fn validate_input(input: &PensionInput, rules: &PensionRules) -> Vec<String> {
    let mut errors = Vec::new();
    if !input.service_years.is_finite() || input.service_years <= 0.0 {
        errors.push("service years must be > 0".to_string());
    }
    if !input.pensionable_salary.is_finite() || input.pensionable_salary <= 0.0 {
        errors.push("pensionable salary must be > 0".to_string());
    }
    if input.retirement_age < rules.min_early_retirement_age {
        errors.push(format!(
            "retirement age must be >= {}",
            rules.min_early_retirement_age
        ));
    }
    if !input.full_time_fraction.is_finite()
        || input.full_time_fraction <= 0.0
        || input.full_time_fraction > 1.0
    {
        errors.push("full-time fraction must be in (0, 1]".to_string());
    }
    if !(0.0..=1.0).contains(&input.survivor_percentage) {
        errors.push("survivor percentage must be between 0 and 1".to_string());
    }
    errors
}

fn credited_service(input: &PensionInput, rules: &PensionRules, retirement_age: u32) -> f64 {
    let future_years = f64::from(retirement_age.saturating_sub(input.current_age));
    (input.service_years + future_years * input.full_time_fraction).min(rules.max_service_years)
}

fn penalty_rate(rules: &PensionRules, retirement_age: u32, credited: f64) -> f64 {
    let waived = retirement_age >= rules.full_pension_age
        || f64::from(retirement_age) + credited >= rules.points_threshold
        || credited >= rules.service_waiver_years;
    if waived {
        return 0.0;
    }
    let years_early = f64::from(rules.full_pension_age - retirement_age);
    (years_early * rules.penalty_per_year).min(1.0)
}

fn breakdown_at(input: &PensionInput, rules: &PensionRules, retirement_age: u32) -> Breakdown {
    let credited = credited_service(input, rules, retirement_age);
    let base = input.pensionable_salary * rules.accrual_rate * credited;
    let rate = penalty_rate(rules, retirement_age, credited);
    let penalized = base * (1.0 - rate);
    let after_coordination_age = (penalized - rules.coordination_offset).max(0.0);

    let (coordination_reduction, final_amount) = if retirement_age >= rules.coordination_age {
        (rules.coordination_offset, after_coordination_age)
    } else {
        (0.0, penalized)
    };

    Breakdown {
        credited_service_years: credited,
        base,
        penalty_rate: rate,
        penalty_amount: base - penalized,
        coordination_reduction,
        final_amount,
        after_coordination_age,
    }
}

fn build_scenarios(input: &PensionInput, rules: &PensionRules) -> Vec<PensionScenario> {
    let mut ages: Vec<u32> = rules
        .candidate_ages
        .iter()
        .copied()
        .filter(|&age| age >= input.current_age && age >= rules.min_early_retirement_age)
        .collect();
    if !ages.contains(&input.retirement_age) {
        ages.push(input.retirement_age);
    }

    let mut scenarios: Vec<PensionScenario> = ages
        .into_iter()
        .map(|age| scenario_at(input, rules, age))
        .collect();
    scenarios.sort_by(|a, b| {
        b.lifetime_amount
            .partial_cmp(&a.lifetime_amount)
            .unwrap_or(Ordering::Equal)
            .then(a.retirement_age.cmp(&b.retirement_age))
    });
    scenarios
}

fn scenario_at(input: &PensionInput, rules: &PensionRules, age: u32) -> PensionScenario {
    let b = breakdown_at(input, rules, age);
    let payment_years = rules.scenario_end_age.saturating_sub(age);
    let mut pros = Vec::new();
    let mut cons = Vec::new();

    if b.penalty_rate > 0.0 {
        cons.push(format!(
            "{:.0}% permanent early-retirement penalty",
            b.penalty_rate * 100.0
        ));
    } else {
        pros.push("No early-retirement penalty".to_string());
    }

    if b.coordination_reduction > 0.0 {
        cons.push(format!(
            "Coordination reduction of {:.0} per year from the start",
            b.coordination_reduction
        ));
    } else {
        pros.push("Full amount paid until the coordination age".to_string());
    }

    if b.credited_service_years >= rules.max_service_years {
        pros.push("Maximum credited service reached".to_string());
    } else {
        cons.push(format!(
            "{:.1} of {:.0} possible service years credited",
            b.credited_service_years, rules.max_service_years
        ));
    }
    pros.push(format!("{payment_years} years of expected payments"));

    PensionScenario {
        retirement_age: age,
        annual_amount: b.final_amount,
        lifetime_amount: b.final_amount * f64::from(payment_years),
        pros,
        cons,
    }
}

fn build_recommendations(
    input: &PensionInput,
    rules: &PensionRules,
    breakdown: &Breakdown,
    scenarios: &[PensionScenario],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if breakdown.penalty_rate > 0.0 {
        recommendations.push(format!(
            "Deferring retirement to {} removes the {:.0}% early-retirement penalty.",
            rules.full_pension_age,
            breakdown.penalty_rate * 100.0
        ));
    }
    if input.retirement_age < rules.coordination_age && rules.coordination_offset > 0.0 {
        recommendations.push(format!(
            "Plan for an income step-down of {:.0} per year at age {} when coordination with the government pension begins.",
            breakdown.final_amount - breakdown.after_coordination_age,
            rules.coordination_age
        ));
    }
    if input.survivor_percentage < rules.adequate_survivor_share {
        recommendations.push(format!(
            "A survivor benefit below {:.0}% may leave a surviving spouse with inadequate income.",
            rules.adequate_survivor_share * 100.0
        ));
    }
    if let Some(best) = scenarios.first() {
        if best.retirement_age != input.retirement_age {
            recommendations.push(format!(
                "Retiring at {} maximizes expected lifetime benefits.",
                best.retirement_age
            ));
        }
    }

    recommendations
}
