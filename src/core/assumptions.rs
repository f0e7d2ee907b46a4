use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::EngineError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetClass {
    Equity,
    FixedIncome,
    Cash,
}

impl AssetClass {
    pub const ALL: [AssetClass; 3] = [
        AssetClass::Equity,
        AssetClass::FixedIncome,
        AssetClass::Cash,
    ];
}

impl FromStr for AssetClass {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" | "equities" | "stocks" => Ok(AssetClass::Equity),
            "fixed-income" | "fixed_income" | "fixedincome" | "bonds" => {
                Ok(AssetClass::FixedIncome)
            }
            "cash" | "short-term" => Ok(AssetClass::Cash),
            other => Err(EngineError::UnknownAssetClass(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetClassAssumption {
    /// Geometric (compound) nominal annual return.
    pub expected_return: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub equity: f64,
    pub fixed_income: f64,
    pub cash: f64,
}

impl Allocation {
    pub fn weight(&self, class: AssetClass) -> f64 {
        match class {
            AssetClass::Equity => self.equity,
            AssetClass::FixedIncome => self.fixed_income,
            AssetClass::Cash => self.cash,
        }
    }

    pub fn total(&self) -> f64 {
        self.equity + self.fixed_income + self.cash
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Macro-economic assumptions shared by every calculator. Values are annual
/// rates expressed as fractions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionSet {
    pub label: String,
    pub inflation: f64,
    /// Real wage growth on top of inflation.
    pub salary_growth_premium: f64,
    pub equity: AssetClassAssumption,
    pub fixed_income: AssetClassAssumption,
    pub cash: AssetClassAssumption,
    pub equity_safety_margin: f64,
    pub volatility_bounds: RateBounds,
    pub plausible_inflation: RateBounds,
    pub aggressive: Allocation,
    pub moderate: Allocation,
    pub conservative: Allocation,
}

const AGGRESSIVE: Allocation = Allocation {
    equity: 0.80,
    fixed_income: 0.15,
    cash: 0.05,
};
const MODERATE: Allocation = Allocation {
    equity: 0.60,
    fixed_income: 0.35,
    cash: 0.05,
};
const CONSERVATIVE: Allocation = Allocation {
    equity: 0.40,
    fixed_income: 0.50,
    cash: 0.10,
};

impl AssumptionSet {
    /// The planner's own projection norms (IPF-style, 2025 edition).
    pub fn standard() -> Self {
        Self {
            label: "IPF 2025 norms".to_string(),
            inflation: 0.021,
            salary_growth_premium: 0.01,
            equity: AssetClassAssumption {
                expected_return: 0.066,
                volatility: 0.16,
            },
            fixed_income: AssetClassAssumption {
                expected_return: 0.034,
                volatility: 0.06,
            },
            cash: AssetClassAssumption {
                expected_return: 0.024,
                volatility: 0.01,
            },
            equity_safety_margin: 0.005,
            volatility_bounds: RateBounds {
                min: 0.0,
                max: 0.35,
            },
            plausible_inflation: RateBounds {
                min: 0.0,
                max: 0.05,
            },
            aggressive: AGGRESSIVE,
            moderate: MODERATE,
            conservative: CONSERVATIVE,
        }
    }

    /// Round-number rates typical of generic online calculators.
    pub fn generic() -> Self {
        Self {
            label: "Generic calculator".to_string(),
            inflation: 0.02,
            salary_growth_premium: 0.0,
            equity: AssetClassAssumption {
                expected_return: 0.06,
                volatility: 0.15,
            },
            fixed_income: AssetClassAssumption {
                expected_return: 0.03,
                volatility: 0.05,
            },
            cash: AssetClassAssumption {
                expected_return: 0.02,
                volatility: 0.01,
            },
            ..Self::standard()
        }
    }

    pub fn conservative() -> Self {
        Self {
            label: "Conservative".to_string(),
            inflation: 0.025,
            salary_growth_premium: 0.005,
            equity: AssetClassAssumption {
                expected_return: 0.05,
                volatility: 0.18,
            },
            fixed_income: AssetClassAssumption {
                expected_return: 0.025,
                volatility: 0.06,
            },
            cash: AssetClassAssumption {
                expected_return: 0.015,
                volatility: 0.01,
            },
            ..Self::standard()
        }
    }

    pub fn asset(&self, class: AssetClass) -> &AssetClassAssumption {
        match class {
            AssetClass::Equity => &self.equity,
            AssetClass::FixedIncome => &self.fixed_income,
            AssetClass::Cash => &self.cash,
        }
    }

    pub fn rate_for(&self, class: AssetClass) -> f64 {
        self.asset(class).expected_return
    }

    /// String-keyed lookup for callers holding untyped class names.
    pub fn rate_for_key(&self, key: &str) -> Result<f64, EngineError> {
        Ok(self.rate_for(key.parse()?))
    }

    pub fn allocation_for_age(&self, age: u32) -> Allocation {
        if age < 40 {
            self.aggressive
        } else if age < 55 {
            self.moderate
        } else {
            self.conservative
        }
    }

    pub fn portfolio_return(&self, allocation: &Allocation) -> f64 {
        AssetClass::ALL
            .iter()
            .map(|&class| allocation.weight(class) * self.rate_for(class))
            .sum()
    }

    pub fn geometric_to_arithmetic(
        &self,
        geometric_rate: f64,
        volatility: f64,
        is_equity: bool,
    ) -> f64 {
        geometric_to_arithmetic(
            geometric_rate,
            volatility,
            is_equity,
            self.equity_safety_margin,
        )
    }

    pub fn salary_growth(&self) -> f64 {
        self.inflation + self.salary_growth_premium
    }

    pub fn validate(&self) -> AssumptionValidation {
        let mut errors = Vec::new();

        if self.equity.expected_return <= self.fixed_income.expected_return {
            errors.push("equity return must exceed fixed-income return".to_string());
        }
        if self.fixed_income.expected_return <= self.cash.expected_return {
            errors.push("fixed-income return must exceed cash return".to_string());
        }
        if !(self.plausible_inflation.min..=self.plausible_inflation.max).contains(&self.inflation)
        {
            errors.push(format!(
                "inflation {:.4} outside plausible band [{:.4}, {:.4}]",
                self.inflation, self.plausible_inflation.min, self.plausible_inflation.max
            ));
        }
        for class in AssetClass::ALL {
            let vol = self.asset(class).volatility;
            if !(self.volatility_bounds.min..=self.volatility_bounds.max).contains(&vol) {
                errors.push(format!("{class:?} volatility {vol:.4} outside bounds"));
            }
        }
        for (name, allocation) in [
            ("aggressive", &self.aggressive),
            ("moderate", &self.moderate),
            ("conservative", &self.conservative),
        ] {
            if (allocation.total() - 1.0).abs() > 1e-9 {
                errors.push(format!("{name} allocation weights must sum to 1"));
            }
        }

        AssumptionValidation {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Arithmetic mean return matching a geometric rate, for samplers that draw
/// single-period returns.
pub fn geometric_to_arithmetic(
    geometric_rate: f64,
    volatility: f64,
    is_equity: bool,
    equity_safety_margin: f64,
) -> f64 {
    let margin = if is_equity { equity_safety_margin } else { 0.0 };
    geometric_rate + volatility * volatility / 2.0 + margin
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::assert_approx;
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn presets_pass_validation() {
        for set in [
            AssumptionSet::standard(),
            AssumptionSet::generic(),
            AssumptionSet::conservative(),
        ] {
            let report = set.validate();
            assert!(report.is_valid, "{}: {:?}", set.label, report.errors);
        }
    }

    #[test]
    fn validate_reports_inverted_returns_and_inflation() {
        let mut set = AssumptionSet::standard();
        set.fixed_income.expected_return = 0.07;
        set.inflation = 0.09;
        let report = set.validate();
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("equity"));
        assert!(report.errors[1].contains("inflation"));
    }

    #[test]
    fn allocation_thresholds_are_exclusive_at_40_and_55() {
        let set = AssumptionSet::standard();
        assert_eq!(set.allocation_for_age(39), set.aggressive);
        assert_eq!(set.allocation_for_age(40), set.moderate);
        assert_eq!(set.allocation_for_age(54), set.moderate);
        assert_eq!(set.allocation_for_age(55), set.conservative);
    }

    #[test]
    fn portfolio_return_is_weighted_sum() {
        let set = AssumptionSet::standard();
        let allocation = Allocation {
            equity: 0.5,
            fixed_income: 0.3,
            cash: 0.2,
        };
        assert_approx(
            set.portfolio_return(&allocation),
            0.5 * 0.066 + 0.3 * 0.034 + 0.2 * 0.024,
        );
    }

    #[test]
    fn geometric_to_arithmetic_adds_half_variance_and_equity_margin() {
        let set = AssumptionSet::standard();
        assert_approx(
            set.geometric_to_arithmetic(0.066, 0.16, true),
            0.066 + 0.0128 + 0.005,
        );
        assert_approx(
            geometric_to_arithmetic(0.034, 0.06, false, 0.005),
            0.034 + 0.0018,
        );
    }

    #[test]
    fn rate_lookup_by_key_rejects_unknown_classes() {
        let set = AssumptionSet::standard();
        assert_approx(set.rate_for_key("bonds").expect("known class"), 0.034);
        assert_eq!(
            set.rate_for_key("crypto"),
            Err(EngineError::UnknownAssetClass("crypto".to_string()))
        );
    }

    proptest! {
        #[test]
        fn prop_allocations_sum_to_one(age in 0u32..120) {
            let set = AssumptionSet::standard();
            prop_assert!((set.allocation_for_age(age).total() - 1.0).abs() < 1e-12);
        }
    }
}
