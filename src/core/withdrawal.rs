use super::types::{PersonProfile, StrategyResult, WithdrawalStrategy, finite_or_zero};

/// Variable-percentage step table: (age upper bound inclusive, rate).
pub const VPW_STEPS: [(u32, f64); 6] = [
    (60, 0.035),
    (65, 0.040),
    (70, 0.045),
    (75, 0.050),
    (80, 0.055),
    (85, 0.060),
];
pub const VPW_RATE_ABOVE_TABLE: f64 = 0.065;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalRules {
    pub fixed_rate: f64,
    pub guardrail_band: f64,
    /// Share of monthly expenses treated as essential spending.
    pub essential_share: f64,
    pub reserve_years: f64,
}

impl Default for WithdrawalRules {
    fn default() -> Self {
        Self {
            fixed_rate: 0.04,
            guardrail_band: 0.10,
            essential_share: 0.6,
            reserve_years: 3.0,
        }
    }
}

pub fn vpw_rate(age: u32) -> f64 {
    VPW_STEPS
        .iter()
        .find(|(upper, _)| age <= *upper)
        .map_or(VPW_RATE_ABOVE_TABLE, |&(_, rate)| rate)
}

/// Risk score on a 0-100 scale, lower is safer.
pub fn risk_score(strategy: WithdrawalStrategy) -> u8 {
    match strategy {
        WithdrawalStrategy::Bucket => 25,
        WithdrawalStrategy::Guardrails => 40,
        WithdrawalStrategy::Vpw => 50,
        WithdrawalStrategy::FixedPercentage => 60,
    }
}

/// Sustainable spending under each strategy, in `WithdrawalStrategy::ALL`
/// order.
pub fn evaluate_withdrawal_strategies(
    capital: f64,
    profile: &PersonProfile,
    rules: &WithdrawalRules,
) -> Vec<StrategyResult> {
    let capital = finite_or_zero(capital).max(0.0);
    let age = profile.age();
    let monthly_expenses = finite_or_zero(profile.monthly_expenses).max(0.0);

    WithdrawalStrategy::ALL
        .iter()
        .map(|&strategy| match strategy {
            WithdrawalStrategy::FixedPercentage => build(
                strategy,
                capital * rules.fixed_rate,
                vec![format!("{} of capital every year", percent(rules.fixed_rate))],
                vec!["Simple and predictable; ignores market conditions.".to_string()],
            ),
            WithdrawalStrategy::Vpw => {
                let rate = vpw_rate(age);
                build(
                    strategy,
                    capital * rate,
                    vec![format!("{} withdrawal rate at age {age}", percent(rate))],
                    vec!["Rate rises with age; spending follows the portfolio.".to_string()],
                )
            }
            WithdrawalStrategy::Guardrails => build(
                strategy,
                capital * rules.fixed_rate,
                vec![
                    format!("{} initial withdrawal rate", percent(rules.fixed_rate)),
                    format!(
                        "cut spending if the portfolio falls {} below its initial value",
                        percent(rules.guardrail_band)
                    ),
                    format!(
                        "raise spending if the portfolio grows {} above its initial value",
                        percent(rules.guardrail_band)
                    ),
                ],
                vec!["Single-point estimate: the baseline before any band adjustment.".to_string()],
            ),
            WithdrawalStrategy::Bucket => {
                let reserve = monthly_expenses * rules.essential_share * 12.0 * rules.reserve_years;
                let investable = (capital - reserve).max(0.0);
                build(
                    strategy,
                    investable * rules.fixed_rate,
                    vec![
                        format!(
                            "cash reserve of {reserve:.0} ({} years of essential spending)",
                            rules.reserve_years
                        ),
                        format!("{} of the remaining {investable:.0}", percent(rules.fixed_rate)),
                    ],
                    vec!["Reserve shields near-term spending from market drops.".to_string()],
                )
            }
        })
        .collect()
}

fn build(
    strategy: WithdrawalStrategy,
    annual: f64,
    assumptions: Vec<String>,
    notes: Vec<String>,
) -> StrategyResult {
    let annual = finite_or_zero(annual);
    StrategyResult {
        strategy,
        strategy_name: strategy.name().to_string(),
        sustainable_annual_spending: annual,
        sustainable_monthly_spending: annual / 12.0,
        assumptions,
        notes,
        risk_score: risk_score(strategy),
    }
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{assert_approx, sample_profile};
    use jiff::civil::date;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn profile_aged(age: i16) -> PersonProfile {
        let mut profile = sample_profile();
        profile.birth_date = date(2025 - age, 1, 1);
        profile
    }

    #[test]
    fn four_strategies_in_fixed_order() {
        let results =
            evaluate_withdrawal_strategies(1_000_000.0, &sample_profile(), &WithdrawalRules::default());
        let order: Vec<_> = results.iter().map(|r| r.strategy).collect();
        assert_eq!(order, WithdrawalStrategy::ALL.to_vec());
    }

    #[test]
    fn million_dollar_reference_values() {
        let mut profile = profile_aged(65);
        profile.monthly_expenses = 3_000.0;
        let results =
            evaluate_withdrawal_strategies(1_000_000.0, &profile, &WithdrawalRules::default());

        assert_approx(results[0].sustainable_annual_spending, 40_000.0);
        assert_approx(results[1].sustainable_annual_spending, 40_000.0);
        assert_approx(results[2].sustainable_annual_spending, 40_000.0);
        assert_approx(results[3].sustainable_annual_spending, 37_408.0);
        assert_approx(results[3].sustainable_monthly_spending, 37_408.0 / 12.0);
        assert!(results[2].assumptions.iter().any(|a| a.contains("10.0%")));
    }

    #[test]
    fn vpw_steps_are_inclusive_upper_bounds() {
        assert_approx(vpw_rate(55), 0.035);
        assert_approx(vpw_rate(60), 0.035);
        assert_approx(vpw_rate(61), 0.040);
        assert_approx(vpw_rate(65), 0.040);
        assert_approx(vpw_rate(85), 0.060);
        assert_approx(vpw_rate(86), 0.065);
    }

    #[test]
    fn risk_scores_rank_bucket_safest() {
        let results =
            evaluate_withdrawal_strategies(500_000.0, &sample_profile(), &WithdrawalRules::default());
        let score = |s| {
            results
                .iter()
                .find(|r| r.strategy == s)
                .map(|r| r.risk_score)
                .expect("strategy present")
        };
        assert!(score(WithdrawalStrategy::Bucket) < score(WithdrawalStrategy::Guardrails));
        assert!(score(WithdrawalStrategy::Guardrails) < score(WithdrawalStrategy::Vpw));
        assert!(score(WithdrawalStrategy::Vpw) < score(WithdrawalStrategy::FixedPercentage));
    }

    #[test]
    fn reserve_larger_than_capital_leaves_nothing_invested() {
        let results =
            evaluate_withdrawal_strategies(10_000.0, &sample_profile(), &WithdrawalRules::default());
        assert_approx(results[3].sustainable_annual_spending, 0.0);
    }

    #[test]
    fn non_finite_capital_is_treated_as_zero() {
        let results =
            evaluate_withdrawal_strategies(f64::NAN, &sample_profile(), &WithdrawalRules::default());
        assert!(results.iter().all(|r| r.sustainable_annual_spending == 0.0));
    }

    proptest! {
        #[test]
        fn prop_vpw_non_decreasing_with_age(age in 0u32..120) {
            prop_assert!(vpw_rate(age) <= vpw_rate(age + 1));
        }

        #[test]
        fn prop_spending_scales_with_capital(capital in 0.0f64..5_000_000.0) {
            let results = evaluate_withdrawal_strategies(capital, &sample_profile(), &WithdrawalRules::default());
            prop_assert_eq!(results.len(), 4);
            for result in &results {
                prop_assert!(result.sustainable_annual_spending >= 0.0);
                prop_assert!(result.sustainable_annual_spending <= capital * 0.065 + 1e-9);
            }
        }
    }
}
