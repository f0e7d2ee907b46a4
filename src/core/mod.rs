mod assumptions;
mod cache;
mod comparison;
mod error;
mod mortality;
mod pension;
mod plan;
mod projection;
mod public_pension;
mod supplement;
mod types;
mod withdrawal;

#[cfg(test)]
mod fixtures;

pub use assumptions::{
    Allocation, AssetClass, AssetClassAssumption, AssumptionSet, AssumptionValidation,
    RateBounds, geometric_to_arithmetic,
};
pub use cache::{CacheKey, NoCache, ResultCache, TtlCache};
pub use comparison::{
    ComparisonSettings, Scenario, annuity_factor, generate_comparison, real_monthly_rate,
    run_scenario,
};
pub use error::{EngineError, EngineResult};
pub use mortality::{
    CPM2014, MortalityTableEntry, TABLE_SOURCE, household_planning_age, life_expectancy,
    mortality, recommended_planning_age,
};
pub use pension::{PensionInput, PensionRules, calculate_pension};
pub use plan::{PlanReport, PlanRules, build_plan, income_sources};
pub use projection::{ProjectionSettings, ProjectionSteps, detect_milestones, generate_projection};
pub use public_pension::{
    OldAgeSecurityRules, UniversalPensionRules, old_age_security, universal_pension,
};
pub use supplement::{SupplementRules, evaluate_supplement, supplement_for_income};
pub use types::{
    AccountType, ComparisonDeltas, ComparisonReport, ComparisonResult, Gender, IncomeSources,
    MAX_PROJECTION_AGE, MAX_SERVICE_YEARS, MIN_EARLY_RETIREMENT_AGE, Milestone, MilestoneKind,
    MortalityResult, OldAgeSecurityResult, PartnerProfile, PensionCalculationResult,
    PensionScenario, PersonProfile, ProjectionMetrics, ProjectionPoint, ProjectionResult,
    SavingsBalances, StrategyResult, SupplementResult, UniversalPensionResult,
    WithdrawalStrategy, completed_years,
};
pub use withdrawal::{WithdrawalRules, evaluate_withdrawal_strategies, risk_score, vpw_rate};
