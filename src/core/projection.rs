use super::assumptions::AssumptionSet;
use super::types::{
    IncomeSources, MAX_PROJECTION_AGE, Milestone, MilestoneKind, PersonProfile, ProjectionMetrics,
    ProjectionPoint, ProjectionResult, finite_or_zero,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionSettings {
    /// Retirement spending as a share of working-age spending.
    pub retirement_spending_ratio: f64,
    /// Share of the remaining tax-advantaged balance drawn as income each
    /// retired year.
    pub drawdown_rate: f64,
    pub capital_target: f64,
    /// Reciprocal of the withdrawal rate behind the readiness heuristic.
    pub readiness_multiple: f64,
    pub coordination_age: u32,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            retirement_spending_ratio: 0.75,
            drawdown_rate: 0.05,
            capital_target: 1_000_000.0,
            readiness_multiple: 20.0,
            coordination_age: 65,
        }
    }
}

/// Retirement income streams in today's dollars, zeroed where the upstream
/// result is missing or invalid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RetirementStreams {
    pension_before_coordination: f64,
    pension_after_coordination: f64,
    universal_start_age: u32,
    universal_amount: f64,
    oas_start_age: u32,
    oas_amount: f64,
    supplement_from_age: u32,
    supplement_amount: f64,
}

impl RetirementStreams {
    fn from_sources(sources: &IncomeSources) -> Self {
        let mut streams = Self::default();

        if let Some(pension) = sources.pension.as_ref().filter(|p| p.valid) {
            streams.pension_before_coordination = non_negative(pension.final_annual_amount);
            streams.pension_after_coordination =
                non_negative(pension.annual_amount_after_coordination_age);
        }
        if let Some(universal) = sources.universal_pension.as_ref().filter(|u| u.valid) {
            streams.universal_start_age = universal.start_age;
            streams.universal_amount = non_negative(universal.annual_amount);
        }
        if let Some(oas) = &sources.old_age_security {
            streams.oas_start_age = oas.start_age;
            streams.oas_amount = non_negative(oas.net_annual_amount);
        }
        if let Some(supplement) = sources.supplement.as_ref().filter(|s| s.eligible) {
            streams.supplement_from_age = supplement.payable_from_age;
            streams.supplement_amount = non_negative(supplement.annual_amount);
        }

        streams
    }

    fn total_at(&self, age: u32, retirement_age: u32, coordination_age: u32) -> f64 {
        let mut total = 0.0;
        if age >= retirement_age {
            total += if age >= coordination_age {
                self.pension_after_coordination
            } else {
                self.pension_before_coordination
            };
        }
        if self.universal_amount > 0.0 && age >= self.universal_start_age {
            total += self.universal_amount;
        }
        if self.oas_amount > 0.0 && age >= self.oas_start_age {
            total += self.oas_amount;
        }
        if self.supplement_amount > 0.0 && age >= self.supplement_from_age {
            total += self.supplement_amount;
        }
        total
    }
}

/// Year-by-year trajectory from the current age to the horizon. Each point
/// carries the capital at the start of that year and the year's flows.
#[derive(Debug, Clone)]
pub struct ProjectionSteps<'a> {
    assumptions: &'a AssumptionSet,
    settings: ProjectionSettings,
    streams: RetirementStreams,
    current_age: u32,
    current_year: i32,
    retirement_age: u32,
    horizon_age: u32,
    salary: f64,
    annual_expenses: f64,
    next_age: u32,
    capital: f64,
    tax_advantaged: f64,
}

impl<'a> ProjectionSteps<'a> {
    pub fn new(
        profile: &PersonProfile,
        sources: &IncomeSources,
        assumptions: &'a AssumptionSet,
        horizon_age: u32,
        settings: ProjectionSettings,
    ) -> Self {
        let current_age = profile.age();
        let capital = non_negative(profile.savings.total());
        Self {
            assumptions,
            settings,
            streams: RetirementStreams::from_sources(sources),
            current_age,
            current_year: profile.current_year(),
            retirement_age: profile.retirement_age,
            horizon_age: horizon_age
                .max(profile.retirement_age)
                .max(current_age)
                .min(MAX_PROJECTION_AGE),
            salary: non_negative(profile.annual_salary),
            annual_expenses: non_negative(profile.monthly_expenses) * 12.0,
            next_age: current_age,
            capital,
            tax_advantaged: non_negative(profile.savings.tax_advantaged()).min(capital),
        }
    }
}

impl Iterator for ProjectionSteps<'_> {
    type Item = ProjectionPoint;

    fn next(&mut self) -> Option<ProjectionPoint> {
        if self.next_age > self.horizon_age {
            return None;
        }
        let age = self.next_age;
        let years = age - self.current_age;
        let price_index = (1.0 + self.assumptions.inflation).powi(years as i32);

        let (income, expenses, drawdown) = if age < self.retirement_age {
            let wage_index = (1.0 + self.assumptions.salary_growth()).powi(years as i32);
            (self.salary * wage_index, self.annual_expenses * price_index, 0.0)
        } else {
            let streams = self.streams.total_at(
                age,
                self.retirement_age,
                self.settings.coordination_age,
            ) * price_index;
            let drawdown = self.tax_advantaged * self.settings.drawdown_rate;
            let expenses =
                self.annual_expenses * self.settings.retirement_spending_ratio * price_index;
            (streams + drawdown, expenses, drawdown)
        };

        let point = ProjectionPoint {
            age,
            calendar_year: self.current_year + years as i32,
            capital: finite_or_zero(self.capital),
            annual_income: finite_or_zero(income),
            annual_expenses: finite_or_zero(expenses),
        };

        let growth = 1.0
            + self
                .assumptions
                .portfolio_return(&self.assumptions.allocation_for_age(age));
        let next_capital = self.capital * growth + (income - drawdown) - expenses;
        self.capital = finite_or_zero(next_capital).max(0.0);
        self.tax_advantaged = finite_or_zero(self.tax_advantaged * growth - drawdown)
            .max(0.0)
            .min(self.capital);
        self.next_age += 1;

        Some(point)
    }
}

pub fn generate_projection(
    profile: &PersonProfile,
    sources: &IncomeSources,
    assumptions: &AssumptionSet,
    horizon_age: u32,
    settings: &ProjectionSettings,
) -> ProjectionResult {
    let points: Vec<ProjectionPoint> =
        ProjectionSteps::new(profile, sources, assumptions, horizon_age, *settings).collect();
    let milestones = detect_milestones(&points, profile.retirement_age, settings);
    let metrics = summarize(profile, &points, &milestones, settings);

    tracing::debug!(
        points = points.len(),
        milestones = milestones.len(),
        capital_at_retirement = metrics.capital_at_retirement,
        readiness = metrics.readiness_score,
        "projection generated"
    );

    ProjectionResult {
        points,
        milestones,
        metrics,
    }
}

pub fn detect_milestones(
    points: &[ProjectionPoint],
    retirement_age: u32,
    settings: &ProjectionSettings,
) -> Vec<Milestone> {
    let mut milestones = Vec::new();

    if let Some(point) = points.iter().find(|p| p.age == retirement_age) {
        milestones.push(milestone(point, "Retirement", MilestoneKind::Retirement));
    }

    let target = settings.capital_target;
    if let Some(pair) = points
        .windows(2)
        .find(|pair| pair[0].capital < target && pair[1].capital >= target)
    {
        milestones.push(milestone(
            &pair[1],
            &format!("Capital reaches {target:.0}"),
            MilestoneKind::GoalReached,
        ));
    }

    if let Some(point) = points
        .iter()
        .find(|p| p.age >= retirement_age && p.annual_income < p.annual_expenses && p.capital > 0.0)
    {
        milestones.push(milestone(
            point,
            "Spending exceeds retirement income; capital is being drawn down",
            MilestoneKind::Warning,
        ));
    }

    if let Some(pair) = points
        .windows(2)
        .find(|pair| pair[0].capital > 0.0 && pair[1].capital <= 0.0)
    {
        milestones.push(milestone(
            &pair[1],
            "Capital depleted",
            MilestoneKind::CapitalDepleted,
        ));
    }

    milestones.sort_by_key(|m| m.age);
    milestones
}

fn milestone(point: &ProjectionPoint, label: &str, kind: MilestoneKind) -> Milestone {
    Milestone {
        age: point.age,
        calendar_year: point.calendar_year,
        label: label.to_string(),
        kind,
        amount: point.capital,
    }
}

fn summarize(
    profile: &PersonProfile,
    points: &[ProjectionPoint],
    milestones: &[Milestone],
    settings: &ProjectionSettings,
) -> ProjectionMetrics {
    let monthly_income = non_negative(profile.annual_salary) / 12.0;
    let monthly_expenses = non_negative(profile.monthly_expenses);
    let savings_rate = if monthly_income > 0.0 {
        (monthly_income - monthly_expenses) / monthly_income
    } else {
        0.0
    };

    let capital_at_retirement = points
        .iter()
        .find(|p| p.age >= profile.retirement_age)
        .or(points.last())
        .map_or(0.0, |p| p.capital);
    let target_annual_income = monthly_expenses * 12.0 * settings.retirement_spending_ratio;
    let readiness_score = if target_annual_income > 0.0 {
        (capital_at_retirement / (target_annual_income * settings.readiness_multiple) * 100.0)
            .min(100.0)
    } else {
        100.0
    };

    ProjectionMetrics {
        monthly_income,
        monthly_expenses,
        savings_rate: finite_or_zero(savings_rate),
        capital_at_retirement,
        target_annual_income: finite_or_zero(target_annual_income),
        readiness_score: finite_or_zero(readiness_score),
        final_capital: points.last().map_or(0.0, |p| p.capital),
        depletion_age: milestones
            .iter()
            .find(|m| m.kind == MilestoneKind::CapitalDepleted)
            .map(|m| m.age),
    }
}

fn non_negative(value: f64) -> f64 {
    finite_or_zero(value).max(0.0)
}
