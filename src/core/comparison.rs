use super::assumptions::AssumptionSet;
use super::error::EngineResult;
use super::mortality::household_planning_age;
use super::projection::{ProjectionSettings, generate_projection};
use super::types::{
    ComparisonDeltas, ComparisonReport, ComparisonResult, IncomeSources, PersonProfile,
    finite_or_zero,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonSettings {
    /// Fixed horizon typical of calculators without a mortality model.
    pub generic_planning_age: u32,
    pub self_confidence: f64,
    pub generic_confidence: f64,
    pub conservative_confidence: f64,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            generic_planning_age: 90,
            self_confidence: 0.9,
            generic_confidence: 0.6,
            conservative_confidence: 0.75,
        }
    }
}

/// One assumption set, one horizon.
#[derive(Debug, Clone, Copy)]
pub struct Scenario<'a> {
    pub assumptions: &'a AssumptionSet,
    pub planning_age: u32,
    pub confidence: f64,
}

pub fn generate_comparison(
    profile: &PersonProfile,
    sources: &IncomeSources,
    settings: &ComparisonSettings,
    projection: &ProjectionSettings,
) -> EngineResult<ComparisonReport> {
    let planning_age = household_planning_age(profile)?;
    let standard = AssumptionSet::standard();
    let generic = AssumptionSet::generic();
    let conservative = AssumptionSet::conservative();

    let self_scenario = run_scenario(
        profile,
        sources,
        Scenario {
            assumptions: &standard,
            planning_age,
            confidence: settings.self_confidence,
        },
        projection,
    );
    let generic_baseline = run_scenario(
        profile,
        sources,
        Scenario {
            assumptions: &generic,
            planning_age: settings.generic_planning_age,
            confidence: settings.generic_confidence,
        },
        projection,
    );
    let conservative_baseline = run_scenario(
        profile,
        sources,
        Scenario {
            assumptions: &conservative,
            planning_age,
            confidence: settings.conservative_confidence,
        },
        projection,
    );

    let deltas = deltas(&self_scenario, &generic_baseline, &conservative_baseline);
    let advantages = advantages(&self_scenario, &generic_baseline, &conservative_baseline);

    tracing::debug!(
        capital_vs_generic = deltas.capital_vs_generic,
        capital_vs_conservative = deltas.capital_vs_conservative,
        planning_age_vs_generic = deltas.planning_age_vs_generic,
        "comparison generated"
    );

    Ok(ComparisonReport {
        self_scenario,
        generic_baseline,
        conservative_baseline,
        deltas,
        advantages,
    })
}

/// Projects the profile under one scenario and sizes the capital needed to
/// fund the retirement spending target until the planning age. Amounts are
/// in today's dollars.
pub fn run_scenario(
    profile: &PersonProfile,
    sources: &IncomeSources,
    scenario: Scenario<'_>,
    projection: &ProjectionSettings,
) -> ComparisonResult {
    let assumptions = scenario.assumptions;
    let result = generate_projection(
        profile,
        sources,
        assumptions,
        scenario.planning_age,
        projection,
    );

    let retirement_age = profile.retirement_age.max(profile.age());
    let years_to_retirement = retirement_age - profile.age();
    let price_index = (1.0 + assumptions.inflation).powi(years_to_retirement as i32);
    let projected_capital = finite_or_zero(result.metrics.capital_at_retirement / price_index);

    let months = scenario.planning_age.saturating_sub(retirement_age).max(1) * 12;
    let nominal = assumptions.portfolio_return(&assumptions.allocation_for_age(retirement_age));
    let rate = real_monthly_rate(nominal, assumptions.inflation);
    let factor = annuity_factor(rate, months);

    let guaranteed_monthly = guaranteed_annual_income(sources) / 12.0;
    let desired_monthly =
        finite_or_zero(profile.monthly_expenses).max(0.0) * projection.retirement_spending_ratio;
    let required_capital = (desired_monthly - guaranteed_monthly).max(0.0) * factor;

    ComparisonResult {
        scenario_label: assumptions.label.clone(),
        projected_capital,
        monthly_income: finite_or_zero(projected_capital / factor + guaranteed_monthly),
        required_capital: finite_or_zero(required_capital),
        capital_shortfall: finite_or_zero((required_capital - projected_capital).max(0.0)),
        recommended_planning_age: scenario.planning_age,
        confidence: scenario.confidence,
    }
}

pub fn real_monthly_rate(nominal_annual: f64, inflation: f64) -> f64 {
    ((1.0 + nominal_annual) / (1.0 + inflation)).powf(1.0 / 12.0) - 1.0
}

/// Present value of 1 paid at the end of each of `months` periods.
pub fn annuity_factor(monthly_rate: f64, months: u32) -> f64 {
    let n = f64::from(months);
    if monthly_rate.abs() < 1e-12 {
        return n;
    }
    (1.0 - (1.0 + monthly_rate).powf(-n)) / monthly_rate
}

/// Long-run guaranteed income once every source is in payment.
fn guaranteed_annual_income(sources: &IncomeSources) -> f64 {
    let pension = sources
        .pension
        .as_ref()
        .filter(|p| p.valid)
        .map_or(0.0, |p| p.annual_amount_after_coordination_age);
    let universal = sources
        .universal_pension
        .as_ref()
        .filter(|u| u.valid)
        .map_or(0.0, |u| u.annual_amount);
    let oas = sources
        .old_age_security
        .as_ref()
        .map_or(0.0, |o| o.net_annual_amount);
    let supplement = sources
        .supplement
        .as_ref()
        .filter(|s| s.eligible)
        .map_or(0.0, |s| s.annual_amount);

    [pension, universal, oas, supplement]
        .into_iter()
        .map(|amount| finite_or_zero(amount).max(0.0))
        .sum()
}

fn deltas(
    own: &ComparisonResult,
    generic: &ComparisonResult,
    conservative: &ComparisonResult,
) -> ComparisonDeltas {
    ComparisonDeltas {
        capital_vs_generic: own.projected_capital - generic.projected_capital,
        capital_vs_generic_pct: pct_change(own.projected_capital, generic.projected_capital),
        capital_vs_conservative: own.projected_capital - conservative.projected_capital,
        capital_vs_conservative_pct: pct_change(
            own.projected_capital,
            conservative.projected_capital,
        ),
        monthly_income_vs_generic: own.monthly_income - generic.monthly_income,
        monthly_income_vs_generic_pct: pct_change(own.monthly_income, generic.monthly_income),
        monthly_income_vs_conservative: own.monthly_income - conservative.monthly_income,
        monthly_income_vs_conservative_pct: pct_change(
            own.monthly_income,
            conservative.monthly_income,
        ),
        planning_age_vs_generic: own.recommended_planning_age as i32
            - generic.recommended_planning_age as i32,
    }
}

fn pct_change(value: f64, baseline: f64) -> f64 {
    if baseline.abs() > f64::EPSILON {
        finite_or_zero((value - baseline) / baseline * 100.0)
    } else {
        0.0
    }
}

fn advantages(
    own: &ComparisonResult,
    generic: &ComparisonResult,
    conservative: &ComparisonResult,
) -> Vec<String> {
    let mut advantages = vec![format!(
        "Returns and inflation follow published planning norms ({})",
        own.scenario_label
    )];

    if own.recommended_planning_age != generic.recommended_planning_age {
        advantages.push(format!(
            "Planning horizon of age {} comes from the mortality table instead of a fixed age {}",
            own.recommended_planning_age, generic.recommended_planning_age
        ));
    }
    if own.required_capital > generic.required_capital {
        advantages.push(format!(
            "Sizes capital for the full horizon: {:.0} more than the generic estimate",
            own.required_capital - generic.required_capital
        ));
    }
    if conservative.capital_shortfall > 0.0 {
        advantages.push(format!(
            "Stress-tested: pessimistic assumptions leave a shortfall of {:.0}",
            conservative.capital_shortfall
        ));
    } else {
        advantages.push("Plan stays funded under pessimistic assumptions".to_string());
    }

    advantages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{assert_approx, sample_profile};
    use crate::core::types::PensionCalculationResult;
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn higher_returns_give_more_capital() {
        let profile = sample_profile();
        let low = AssumptionSet::standard();
        let mut high = AssumptionSet::standard();
        high.equity.expected_return += 0.01;
        high.fixed_income.expected_return += 0.01;
        let run = |assumptions: &AssumptionSet| {
            run_scenario(
                &profile,
                &IncomeSources::default(),
                Scenario {
                    assumptions,
                    planning_age: 92,
                    confidence: 0.9,
                },
                &ProjectionSettings::default(),
            )
        };
        let high_result = run(&high);
        let low_result = run(&low);
        assert!(high_result.projected_capital > low_result.projected_capital);
        assert!(high_result.monthly_income > low_result.monthly_income);
    }

    #[test]
    fn annuity_factor_limits() {
        assert_approx(annuity_factor(0.0, 120), 120.0);
        // 1000/month for 12 months at 1%/month
        assert_approx(annuity_factor(0.01, 12) * 1_000.0, 11_255.077_473_484_8);
        assert_approx(real_monthly_rate(0.02, 0.02), 0.0);
    }

    #[test]
    fn shortfall_is_required_minus_projected() {
        let mut profile = sample_profile();
        profile.savings = Default::default();
        profile.annual_salary = 36_000.0;
        let result = run_scenario(
            &profile,
            &IncomeSources::default(),
            Scenario {
                assumptions: &AssumptionSet::standard(),
                planning_age: 95,
                confidence: 0.9,
            },
            &ProjectionSettings::default(),
        );
        assert!(result.required_capital > 0.0);
        assert_approx(
            result.capital_shortfall,
            (result.required_capital - result.projected_capital).max(0.0),
        );
    }

    #[test]
    fn guaranteed_income_reduces_required_capital() {
        let profile = sample_profile();
        let scenario = Scenario {
            assumptions: &AssumptionSet::standard(),
            planning_age: 92,
            confidence: 0.9,
        };
        let bare = run_scenario(
            &profile,
            &IncomeSources::default(),
            scenario,
            &ProjectionSettings::default(),
        );
        let sources = IncomeSources {
            pension: Some(PensionCalculationResult {
                valid: true,
                final_annual_amount: 12_000.0,
                annual_amount_after_coordination_age: 12_000.0,
                ..PensionCalculationResult::default()
            }),
            ..IncomeSources::default()
        };
        let covered = run_scenario(&profile, &sources, scenario, &ProjectionSettings::default());
        assert!(covered.required_capital < bare.required_capital);
    }

    #[test]
    fn report_uses_mortality_horizon_for_self_and_fixed_horizon_for_generic() {
        let profile = sample_profile();
        let report = generate_comparison(
            &profile,
            &IncomeSources::default(),
            &ComparisonSettings::default(),
            &ProjectionSettings::default(),
        )
        .expect("valid profile");

        let expected_age = household_planning_age(&profile).expect("valid profile");
        assert_eq!(report.self_scenario.recommended_planning_age, expected_age);
        assert_eq!(report.conservative_baseline.recommended_planning_age, expected_age);
        assert_eq!(report.generic_baseline.recommended_planning_age, 90);
        assert_eq!(
            report.deltas.planning_age_vs_generic,
            expected_age as i32 - 90
        );
        assert_approx(
            report.deltas.capital_vs_generic,
            report.self_scenario.projected_capital - report.generic_baseline.projected_capital,
        );
        assert!(!report.advantages.is_empty());
        assert_approx(report.self_scenario.confidence, 0.9);
        assert_approx(report.generic_baseline.confidence, 0.6);
    }

    #[test]
    fn report_serializes_self_key() {
        let report = generate_comparison(
            &sample_profile(),
            &IncomeSources::default(),
            &ComparisonSettings::default(),
            &ProjectionSettings::default(),
        )
        .expect("valid profile");
        let value = serde_json::to_value(&report).expect("serializes");
        assert!(value.get("self").is_some());
        assert!(value.get("genericBaseline").is_some());
        assert!(value["deltas"].get("capitalVsGenericPct").is_some());
    }

    proptest! {
        #[test]
        fn prop_annuity_factor_bounded_by_month_count(rate in 0.0f64..0.02, months in 1u32..600) {
            let factor = annuity_factor(rate, months);
            prop_assert!(factor > 0.0);
            prop_assert!(factor <= f64::from(months) + 1e-9);
        }
    }
}
