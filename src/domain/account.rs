//! Cash balance and fee arithmetic.

/// Commission and slippage parameters shared by every fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub commission_rate: f64,
    /// Flat floor applied to the commission leg of every fill.
    pub min_commission: f64,
    /// Charged on exits only.
    pub slippage_rate: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            commission_rate: 0.0003,
            min_commission: 5.0,
            slippage_rate: 0.001,
        }
    }
}

/// Owns the cash balance. Settlement is atomic with the caller's share-count
/// change; the account itself never goes negative because every buy is
/// affordability-checked first.
#[derive(Debug, Clone, PartialEq)]
pub struct CapitalAccount {
    pub cash: f64,
    fees: FeeSchedule,
}

impl CapitalAccount {
    pub fn new(initial_capital: f64, fees: FeeSchedule) -> Self {
        CapitalAccount {
            cash: initial_capital,
            fees,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// fee = max(flat_min, notional * commission_rate)
    pub fn buy_fee(&self, notional: f64) -> f64 {
        (notional * self.fees.commission_rate).max(self.fees.min_commission)
    }

    /// Buy fee plus slippage on the full notional.
    pub fn sell_fee(&self, notional: f64) -> f64 {
        self.buy_fee(notional) + notional * self.fees.slippage_rate
    }

    pub fn can_afford(&self, notional: f64) -> bool {
        notional + self.buy_fee(notional) <= self.cash
    }

    /// Deducts notional + fee. Returns the fee charged.
    pub fn settle_buy(&mut self, notional: f64) -> f64 {
        let fee = self.buy_fee(notional);
        self.cash -= notional + fee;
        fee
    }

    /// Credits notional - fee. Returns the fee charged.
    pub fn settle_sell(&mut self, notional: f64) -> f64 {
        let fee = self.sell_fee(notional);
        self.cash += notional - fee;
        fee
    }
}
