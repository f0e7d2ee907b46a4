use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::assumptions::{Allocation, AssetClassAssumption, AssumptionSet};
use super::types::PersonProfile;

/// Memoization seam for callers that evaluate the same inputs repeatedly.
/// The engine never consults a cache itself.
pub trait ResultCache<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;
    fn set(&self, key: K, value: V);
    fn invalidate(&self, key: &K);
    fn clear(&self);
}

/// Keeps entries for a fixed time to live. Expired entries are dropped on
/// lookup and swept on every insert.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, (Instant, V)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> ResultCache<K, V> for TtlCache<K, V>
where
    K: Eq + Hash + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: K, value: V) {
        let mut entries = self.lock();
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), value));
    }

    fn invalidate(&self, key: &K) {
        self.lock().remove(key);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

/// Disabled cache: every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl<K, V> ResultCache<K, V> for NoCache {
    fn get(&self, _key: &K) -> Option<V> {
        None
    }

    fn set(&self, _key: K, _value: V) {}

    fn invalidate(&self, _key: &K) {}

    fn clear(&self) {}
}

/// 64-bit digest of every request input that influences a plan. Rule
/// constants are not part of the key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    pub fn for_plan(
        profile: &PersonProfile,
        assumptions: &AssumptionSet,
        survivor_percentage: f64,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        hash_profile(profile, &mut hasher);
        hash_assumptions(assumptions, &mut hasher);
        survivor_percentage.to_bits().hash(&mut hasher);
        CacheKey(hasher.finish())
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

fn hash_profile<H: Hasher>(profile: &PersonProfile, state: &mut H) {
    profile.birth_date.hash(state);
    profile.valuation_date.hash(state);
    profile.gender.hash(state);
    profile.retirement_age.hash(state);
    profile.universal_pension_start_age.hash(state);
    hash_f64s(
        state,
        &[
            profile.annual_salary,
            profile.monthly_expenses,
            profile.service_years,
            profile.full_time_fraction,
            profile.savings.registered,
            profile.savings.tax_free,
            profile.savings.non_registered,
            profile.savings.cash,
            profile.expected_universal_pension_at_65,
        ],
    );
    profile.retirement_taxable_income.map(f64::to_bits).hash(state);
    match &profile.partner {
        Some(partner) => {
            1u8.hash(state);
            partner.birth_date.hash(state);
            partner.gender.hash(state);
            partner.annual_pension_income.to_bits().hash(state);
        }
        None => 0u8.hash(state),
    }
}

fn hash_assumptions<H: Hasher>(assumptions: &AssumptionSet, state: &mut H) {
    assumptions.label.hash(state);
    hash_f64s(
        state,
        &[
            assumptions.inflation,
            assumptions.salary_growth_premium,
            assumptions.equity_safety_margin,
            assumptions.volatility_bounds.min,
            assumptions.volatility_bounds.max,
            assumptions.plausible_inflation.min,
            assumptions.plausible_inflation.max,
        ],
    );
    for asset in [&assumptions.equity, &assumptions.fixed_income, &assumptions.cash] {
        hash_asset(asset, state);
    }
    for allocation in [
        &assumptions.aggressive,
        &assumptions.moderate,
        &assumptions.conservative,
    ] {
        hash_allocation(allocation, state);
    }
}

fn hash_asset<H: Hasher>(asset: &AssetClassAssumption, state: &mut H) {
    hash_f64s(state, &[asset.expected_return, asset.volatility]);
}

fn hash_allocation<H: Hasher>(allocation: &Allocation, state: &mut H) {
    hash_f64s(
        state,
        &[allocation.equity, allocation.fixed_income, allocation.cash],
    );
}

fn hash_f64s<H: Hasher>(state: &mut H, values: &[f64]) {
    for value in values {
        value.to_bits().hash(state);
    }
}
