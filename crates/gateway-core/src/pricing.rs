//! Pricing function.
//!
//! `cost(vendor, tokens_in, tokens_out) = round6((tokens_in + tokens_out) /
//! 1000 * rate[vendor])`, round-half-to-even at 6 decimal places. The table
//! is a runtime registry rather than two hardcoded constants: adding a
//! vendor's rate is a registration, not a code change, symmetric with the
//! vendor adapter registry in `gateway-vendor`.

use crate::entities::Vendor;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

/// The default USD-per-1000-tokens rates, wire-visible to clients through
/// the management plane verbatim.
pub fn default_rates() -> HashMap<Vendor, Decimal> {
    let mut rates = HashMap::new();
    rates.insert(Vendor::VendorA, Decimal::new(2, 3)); // 0.002
    rates.insert(Vendor::VendorB, Decimal::new(3, 3)); // 0.003
    rates
}

/// Programmer-error marker: a cost lookup was attempted for a vendor with
/// no registered rate. This fails loudly rather than defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no price registered for vendor {0}")]
pub struct UnknownVendor(pub Vendor);

/// Runtime-mutable rate registry. Immutable at request-processing time:
/// build once at startup, share via `Arc`, never mutate mid-flight.
#[derive(Debug, Clone)]
pub struct PricingTable {
    rates: HashMap<Vendor, Decimal>,
}

impl PricingTable {
    /// Builds the table with the documented default rates.
    pub fn with_defaults() -> Self {
        Self {
            rates: default_rates(),
        }
    }

    /// Registers (or overwrites) the USD-per-1000-tokens rate for a vendor.
    /// This is the "registration, not a code change" hook for a future
    /// vendorC.
    pub fn register(&mut self, vendor: Vendor, usd_per_1k_tokens: Decimal) {
        self.rates.insert(vendor, usd_per_1k_tokens);
    }

    pub fn rate(&self, vendor: Vendor) -> Result<Decimal, UnknownVendor> {
        self.rates.get(&vendor).copied().ok_or(UnknownVendor(vendor))
    }

    /// `cost(vendor, tokensIn, tokensOut)`: round-half-to-even at 6
    /// decimal places.
    pub fn cost(
        &self,
        vendor: Vendor,
        tokens_in: u64,
        tokens_out: u64,
    ) -> Result<Decimal, UnknownVendor> {
        let rate = self.rate(vendor)?;
        let total_tokens = Decimal::from(tokens_in + tokens_out);
        let raw = (total_tokens / Decimal::from(1000u32)) * rate;
        Ok(raw.round_dp_with_strategy(6, RoundingStrategy::MidpointNearestEven))
    }

    /// Convenience wrapper returning `f64`, for callers that serialize the
    /// cost straight into a JSON response envelope.
    pub fn cost_f64(
        &self,
        vendor: Vendor,
        tokens_in: u64,
        tokens_out: u64,
    ) -> Result<f64, UnknownVendor> {
        Ok(self
            .cost(vendor, tokens_in, tokens_out)?
            .to_f64()
            .unwrap_or(0.0))
    }

    /// The wire-visible pricing table: `{ vendorA: 0.002, vendorB: 0.003 }`.
    pub fn as_usd_per_1k_map(&self) -> HashMap<String, f64> {
        self.rates
            .iter()
            .map(|(v, r)| (v.as_str().to_string(), r.to_f64().unwrap_or(0.0)))
            .collect()
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
