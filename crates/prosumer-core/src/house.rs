//! House economics and hourly profiles.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{check_finite, check_non_negative, check_positive, ConfigError, ConfigResult};

/// Economic and profile data of a single prosumer household.
///
/// Prices are per unit of capacity (PV, battery) or per unit of energy
/// (grid buy/sell). Investment prices are spread evenly over `lifetime`
/// periods, which gives the per-period costs used by the dispatch model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseParameters {
    /// Number of periods the investment is spread over.
    pub lifetime: u32,
    /// Price of one unit of PV capacity.
    pub pv_unit_price: f64,
    /// Price of one unit of battery capacity.
    pub battery_unit_price: f64,
    /// Price paid per unit of energy bought from the grid.
    pub buy_price: f64,
    /// Price received per unit of energy sold to the grid.
    pub sell_price: f64,
    /// Demand over the whole horizon; hourly demand is `share · total_demand`.
    pub total_demand: f64,
    /// Hourly share of `total_demand`.
    pub demand_shares: Vec<f64>,
    /// Hourly PV availability as a fraction of installed capacity.
    pub pv_availability: Vec<f64>,
}

impl HouseParameters {
    /// Builds parameters with the given profiles and zero prices.
    ///
    /// Mostly useful in tests together with struct update syntax.
    pub fn with_profiles(demand_shares: Vec<f64>, pv_availability: Vec<f64>) -> Self {
        Self {
            lifetime: 1,
            pv_unit_price: 0.0,
            battery_unit_price: 0.0,
            buy_price: 0.0,
            sell_price: 0.0,
            total_demand: 0.0,
            demand_shares,
            pv_availability,
        }
    }

    /// Number of hours in the planning horizon.
    pub fn hours(&self) -> usize {
        self.demand_shares.len()
    }

    /// Per-period cost of one unit of PV capacity.
    pub fn annualized_pv_cost(&self) -> f64 {
        self.pv_unit_price / self.lifetime as f64
    }

    /// Per-period cost of one unit of battery capacity.
    pub fn annualized_battery_cost(&self) -> f64 {
        self.battery_unit_price / self.lifetime as f64
    }

    /// Unperturbed demand at `hour`.
    pub fn demand(&self, hour: usize) -> f64 {
        self.demand_shares[hour] * self.total_demand
    }

    /// Unperturbed hourly demand profile.
    pub fn baseline_demand(&self) -> Vec<f64> {
        (0..self.hours()).map(|i| self.demand(i)).collect()
    }

    /// Demand profile after applying the perturbation fractions `delta`.
    pub fn perturbed_demand(&self, delta: &[f64]) -> Vec<f64> {
        (0..self.hours())
            .map(|i| self.demand(i) * (1.0 + delta.get(i).copied().unwrap_or(0.0)))
            .collect()
    }

    /// Checks profile lengths, prices and availability fractions.
    pub fn validate(&self) -> ConfigResult<()> {
        let demand = self.demand_shares.len();
        let pv = self.pv_availability.len();
        if demand != pv {
            return Err(ConfigError::LengthMismatch { demand, pv });
        }
        if demand == 0 {
            return Err(ConfigError::EmptyHorizon);
        }

        check_positive("lifetime", self.lifetime as f64)?;
        check_non_negative("pv_unit_price", self.pv_unit_price)?;
        check_non_negative("battery_unit_price", self.battery_unit_price)?;
        check_non_negative("buy_price", self.buy_price)?;
        check_non_negative("sell_price", self.sell_price)?;
        check_non_negative("total_demand", self.total_demand)?;

        for (hour, share) in self.demand_shares.iter().enumerate() {
            check_non_negative(&format!("demand_shares[{hour}]"), *share)?;
        }
        for (hour, &value) in self.pv_availability.iter().enumerate() {
            check_finite(&format!("pv_availability[{hour}]"), value)?;
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::AvailabilityOutOfRange { hour, value });
            }
        }

        if self.sell_price > self.buy_price {
            warn!(
                buy = self.buy_price,
                sell = self.sell_price,
                "sell price exceeds buy price; the dispatch model may be unbounded"
            );
        }
        let pv_revenue = self.sell_price * self.pv_availability.iter().sum::<f64>();
        if pv_revenue > self.annualized_pv_cost() {
            warn!(
                pv_revenue,
                pv_cost = self.annualized_pv_cost(),
                "selling PV output pays for PV capacity; the dispatch model is unbounded unless capacity_pv is fixed"
            );
        }
        Ok(())
    }
}
