use ethers::types::U256;

/// A candidate transaction may not declare a gas price above this multiple
/// of the current market price.
pub const ABUSE_MULTIPLIER: u64 = 50;

/// Tolerance applied on top of a transaction's required cost before a
/// funding request is refused, expressed as a percentage.
const TOLERANCE_PCT: u64 = 105;

/// Funding decision for a candidate transaction's sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingDecision {
    /// Balance already covers the transaction cost plus tolerance.
    AlreadyFunded { balance: U256, tolerance: U256 },
    /// Top the sender up by `amount` to reach 1.5x the required cost.
    Fund { amount: U256 },
}

/// A declared gas price is abusive iff it exceeds `ABUSE_MULTIPLIER` times
/// the market price. The boundary itself is not abusive.
pub fn is_abusive(gas_price: U256, market_price: U256) -> bool {
    gas_price > market_price * U256::from(ABUSE_MULTIPLIER)
}

/// Size a funding transfer for an address about to submit a transaction.
///
/// `required = gas_price * gas_limit` is the worst-case cost. If the
/// current balance already exceeds `required` plus a 5% tolerance, no
/// funds are sent. Otherwise the sender is topped up to 1.5x `required`.
pub fn funding_amount(gas_price: U256, gas_limit: U256, balance: U256) -> FundingDecision {
    let required = gas_price * gas_limit;
    let tolerance = required * U256::from(TOLERANCE_PCT) / U256::from(100);

    if balance > tolerance {
        return FundingDecision::AlreadyFunded { balance, tolerance };
    }

    let top_up_to = required * U256::from(3) / U256::from(2);
    FundingDecision::Fund {
        amount: top_up_to - balance,
    }
}
