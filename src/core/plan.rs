use serde::Serialize;

use super::assumptions::AssumptionSet;
use super::comparison::{ComparisonSettings, generate_comparison};
use super::error::EngineResult;
use super::mortality::{household_planning_age, mortality};
use super::pension::{PensionInput, PensionRules, calculate_pension};
use super::projection::{ProjectionSettings, generate_projection};
use super::public_pension::{
    OldAgeSecurityRules, UniversalPensionRules, old_age_security, universal_pension,
};
use super::supplement::{SupplementRules, evaluate_supplement};
use super::types::{
    ComparisonReport, IncomeSources, MortalityResult, OldAgeSecurityResult,
    PensionCalculationResult, PersonProfile, ProjectionResult, StrategyResult, SupplementResult,
    UniversalPensionResult, finite_or_zero,
};
use super::withdrawal::{WithdrawalRules, evaluate_withdrawal_strategies};

/// Every rule set a full plan consults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanRules {
    pub pension: PensionRules,
    pub universal_pension: UniversalPensionRules,
    pub old_age_security: OldAgeSecurityRules,
    pub supplement: SupplementRules,
    pub projection: ProjectionSettings,
    pub withdrawal: WithdrawalRules,
    pub comparison: ComparisonSettings,
    pub survivor_percentage: f64,
    pub old_age_security_start_age: u32,
}

impl Default for PlanRules {
    fn default() -> Self {
        Self {
            pension: PensionRules::default(),
            universal_pension: UniversalPensionRules::default(),
            old_age_security: OldAgeSecurityRules::default(),
            supplement: SupplementRules::default(),
            projection: ProjectionSettings::default(),
            withdrawal: WithdrawalRules::default(),
            comparison: ComparisonSettings::default(),
            survivor_percentage: 0.6,
            old_age_security_start_age: 65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub mortality: MortalityResult,
    pub household_planning_age: u32,
    pub pension: PensionCalculationResult,
    pub universal_pension: UniversalPensionResult,
    pub old_age_security: OldAgeSecurityResult,
    pub supplement: SupplementResult,
    pub projection: ProjectionResult,
    pub strategies: Vec<StrategyResult>,
    pub comparison: ComparisonReport,
    pub profile_errors: Vec<String>,
}

/// Runs every calculator over one profile. Profile validation problems are
/// reported alongside the results rather than aborting the plan.
pub fn build_plan(
    profile: &PersonProfile,
    assumptions: &AssumptionSet,
    rules: &PlanRules,
) -> EngineResult<PlanReport> {
    let profile_errors = profile.validate();
    if !profile_errors.is_empty() {
        tracing::debug!(?profile_errors, "profile has validation errors");
    }

    let mortality = mortality(f64::from(profile.age()), profile.gender)?;
    let horizon = household_planning_age(profile)?;

    let sources = income_sources(profile, rules);
    let projection = generate_projection(profile, &sources, assumptions, horizon, &rules.projection);
    let strategies = evaluate_withdrawal_strategies(
        projection.metrics.capital_at_retirement,
        profile,
        &rules.withdrawal,
    );
    let comparison =
        generate_comparison(profile, &sources, &rules.comparison, &rules.projection)?;

    tracing::debug!(
        age = profile.age(),
        horizon,
        readiness = projection.metrics.readiness_score,
        "plan built"
    );

    let IncomeSources {
        pension,
        universal_pension,
        old_age_security,
        supplement,
    } = sources;

    Ok(PlanReport {
        mortality,
        household_planning_age: horizon,
        pension: pension.unwrap_or_default(),
        universal_pension: universal_pension.unwrap_or_default(),
        old_age_security: old_age_security.unwrap_or_default(),
        supplement: supplement.unwrap_or_default(),
        projection,
        strategies,
        comparison,
        profile_errors,
    })
}

/// Runs the benefit calculators that feed the projection.
pub fn income_sources(profile: &PersonProfile, rules: &PlanRules) -> IncomeSources {
    let pension = calculate_pension(
        &PensionInput::from_profile(profile, rules.survivor_percentage),
        &rules.pension,
    );
    let universal = universal_pension(
        profile.expected_universal_pension_at_65,
        profile.universal_pension_start_age,
        &rules.universal_pension,
    );

    let estimated_income = estimated_retirement_income(profile, &pension, &universal);
    let oas = old_age_security(
        rules.old_age_security_start_age,
        profile
            .retirement_taxable_income
            .unwrap_or(estimated_income),
        &rules.old_age_security,
    );
    let supplement = evaluate_supplement(profile, estimated_income, &rules.supplement);

    IncomeSources {
        pension: Some(pension),
        universal_pension: Some(universal),
        old_age_security: Some(oas),
        supplement: Some(supplement),
    }
}

/// Household taxable income once retired, before the income-tested benefits.
fn estimated_retirement_income(
    profile: &PersonProfile,
    pension: &PensionCalculationResult,
    universal: &UniversalPensionResult,
) -> f64 {
    let pension = if pension.valid {
        pension.annual_amount_after_coordination_age
    } else {
        0.0
    };
    let universal = if universal.valid {
        universal.annual_amount
    } else {
        0.0
    };
    let partner = profile
        .partner
        .as_ref()
        .map_or(0.0, |p| p.annual_pension_income);

    [pension, universal, partner]
        .into_iter()
        .map(|amount| finite_or_zero(amount).max(0.0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{assert_approx, sample_profile};
    use crate::core::types::WithdrawalStrategy;

    #[test]
    fn plan_wires_every_calculator() {
        let profile = sample_profile();
        let report =
            build_plan(&profile, &AssumptionSet::standard(), &PlanRules::default()).expect("valid");

        assert!(report.profile_errors.is_empty());
        assert!(report.pension.valid);
        assert!(report.universal_pension.valid);
        assert_eq!(
            report.household_planning_age,
            report.mortality.recommended_planning_age
        );
        assert_eq!(
            report.projection.points.last().map(|p| p.age),
            Some(report.household_planning_age)
        );
        assert_eq!(report.strategies.len(), 4);
        assert_eq!(report.strategies[0].strategy, WithdrawalStrategy::FixedPercentage);
        assert_approx(
            report.strategies[0].sustainable_annual_spending,
            report.projection.metrics.capital_at_retirement * 0.04,
        );
    }

    #[test]
    fn invalid_profile_still_produces_a_report() {
        let mut profile = sample_profile();
        profile.service_years = 40.0;
        profile.retirement_age = 50;
        let report =
            build_plan(&profile, &AssumptionSet::standard(), &PlanRules::default()).expect("report");
        assert_eq!(report.profile_errors.len(), 2);
        assert!(!report.pension.valid);
        assert!(report.projection.points.iter().all(|p| p.capital.is_finite()));
    }

    #[test]
    fn high_income_household_gets_no_supplement() {
        let report = build_plan(
            &sample_profile(),
            &AssumptionSet::standard(),
            &PlanRules::default(),
        )
        .expect("valid");
        // 43k pension after coordination plus 12k universal pension is far above the income test
        assert!(!report.supplement.eligible);
        assert_approx(report.old_age_security.recovery_tax, 0.0);
    }

    #[test]
    fn report_serializes_with_camel_case_keys() {
        let report = build_plan(
            &sample_profile(),
            &AssumptionSet::standard(),
            &PlanRules::default(),
        )
        .expect("valid");
        let value = serde_json::to_value(&report).expect("serializes");
        for key in [
            "mortality",
            "householdPlanningAge",
            "universalPension",
            "oldAgeSecurity",
            "profileErrors",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["projection"]["metrics"].get("readinessScore").is_some());
    }
}
