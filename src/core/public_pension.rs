use super::types::{OldAgeSecurityResult, UniversalPensionResult};

/// Contributory government pension (RRQ/CPP-style) adjustment rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniversalPensionRules {
    pub standard_age: u32,
    pub earliest_age: u32,
    pub latest_age: u32,
    pub early_reduction_per_month: f64,
    pub late_increase_per_month: f64,
}

impl Default for UniversalPensionRules {
    fn default() -> Self {
        Self {
            standard_age: 65,
            earliest_age: 60,
            latest_age: 72,
            early_reduction_per_month: 0.006,
            late_increase_per_month: 0.007,
        }
    }
}

/// Non-contributory old-age pension (OAS/PSV-style).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OldAgeSecurityRules {
    pub eligibility_age: u32,
    pub max_deferral_age: u32,
    pub full_annual_amount: f64,
    pub deferral_bonus_per_month: f64,
    pub recovery_threshold: f64,
    pub recovery_rate: f64,
}

impl Default for OldAgeSecurityRules {
    fn default() -> Self {
        Self {
            eligibility_age: 65,
            max_deferral_age: 70,
            full_annual_amount: 8_700.0,
            deferral_bonus_per_month: 0.006,
            recovery_threshold: 93_454.0,
            recovery_rate: 0.15,
        }
    }
}

/// Adjusts the pension payable at the standard age for an earlier or later
/// start.
pub fn universal_pension(
    amount_at_standard_age: f64,
    start_age: u32,
    rules: &UniversalPensionRules,
) -> UniversalPensionResult {
    let mut errors = Vec::new();
    if !amount_at_standard_age.is_finite() || amount_at_standard_age < 0.0 {
        errors.push("pension amount at the standard age must be >= 0".to_string());
    }
    if !(rules.earliest_age..=rules.latest_age).contains(&start_age) {
        errors.push(format!(
            "start age must be between {} and {}",
            rules.earliest_age, rules.latest_age
        ));
    }
    if !errors.is_empty() {
        return UniversalPensionResult {
            valid: false,
            errors,
            start_age,
            ..UniversalPensionResult::default()
        };
    }

    let adjustment_rate = if start_age < rules.standard_age {
        let months = f64::from((rules.standard_age - start_age) * 12);
        -(months * rules.early_reduction_per_month)
    } else {
        let months = f64::from((start_age - rules.standard_age) * 12);
        months * rules.late_increase_per_month
    };

    UniversalPensionResult {
        valid: true,
        errors: Vec::new(),
        start_age,
        adjustment_rate,
        annual_amount: amount_at_standard_age * (1.0 + adjustment_rate),
    }
}

/// Old-age pension net of the recovery tax on `net_income`. The start age is
/// clamped to the deferral window.
pub fn old_age_security(
    start_age: u32,
    net_income: f64,
    rules: &OldAgeSecurityRules,
) -> OldAgeSecurityResult {
    let start_age = start_age.clamp(rules.eligibility_age, rules.max_deferral_age);
    let months_deferred = f64::from((start_age - rules.eligibility_age) * 12);
    let deferral_bonus_rate = months_deferred * rules.deferral_bonus_per_month;
    let gross = rules.full_annual_amount * (1.0 + deferral_bonus_rate);

    let income = if net_income.is_finite() {
        net_income.max(0.0)
    } else {
        0.0
    };
    let recovery_tax =
        ((income - rules.recovery_threshold).max(0.0) * rules.recovery_rate).min(gross);

    OldAgeSecurityResult {
        start_age,
        deferral_bonus_rate,
        gross_annual_amount: gross,
        recovery_tax,
        net_annual_amount: gross - recovery_tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::assert_approx;

    #[test]
    fn standard_age_is_unadjusted() {
        let result = universal_pension(12_000.0, 65, &UniversalPensionRules::default());
        assert!(result.valid);
        assert_approx(result.adjustment_rate, 0.0);
        assert_approx(result.annual_amount, 12_000.0);
    }

    #[test]
    fn starting_at_sixty_loses_thirty_six_percent() {
        let result = universal_pension(12_000.0, 60, &UniversalPensionRules::default());
        assert_approx(result.adjustment_rate, -0.36);
        assert_approx(result.annual_amount, 7_680.0);
    }

    #[test]
    fn deferring_to_seventy_two_adds_fifty_eight_point_eight_percent() {
        let result = universal_pension(10_000.0, 72, &UniversalPensionRules::default());
        assert_approx(result.adjustment_rate, 0.588);
        assert_approx(result.annual_amount, 15_880.0);
    }

    #[test]
    fn start_age_outside_window_is_invalid() {
        let result = universal_pension(10_000.0, 59, &UniversalPensionRules::default());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_approx(result.annual_amount, 0.0);
    }

    #[test]
    fn old_age_security_deferral_and_recovery() {
        let rules = OldAgeSecurityRules::default();
        let deferred = old_age_security(70, 0.0, &rules);
        assert_approx(deferred.deferral_bonus_rate, 0.36);
        assert_approx(deferred.net_annual_amount, 8_700.0 * 1.36);

        let clawed = old_age_security(65, 103_454.0, &rules);
        assert_approx(clawed.recovery_tax, 1_500.0);
        assert_approx(clawed.net_annual_amount, 7_200.0);

        let wiped = old_age_security(60, 500_000.0, &rules);
        assert_eq!(wiped.start_age, 65);
        assert_approx(wiped.net_annual_amount, 0.0);
    }
}
