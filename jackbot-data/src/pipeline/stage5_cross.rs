use crate::pipeline::{Aligned, CrossSignal};

/// Compute the cross-exchange arbitrage signal for one symbol's [`Aligned`]
/// record. Both exchanges are guaranteed present by construction - [`Aligned`]
/// only ever exists once both sides have reported.
///
/// A non-positive price on either side is substituted with `0` and flags
/// `price_invalid` rather than propagating a bogus diff silently; in that
/// case `price_diff_percent` is also zeroed, since there is no valid
/// denominator to divide by.
pub fn cross(aligned: &Aligned) -> CrossSignal {
    let binance_price = Some(aligned.binance.price).filter(|p| *p > 0.0);
    let okx_price = Some(aligned.okx.price).filter(|p| *p > 0.0);
    let price_invalid = binance_price.is_none() || okx_price.is_none();

    let binance_price = binance_price.unwrap_or(0.0);
    let okx_price = okx_price.unwrap_or(0.0);

    let price_diff = (binance_price - okx_price).abs();
    let price_diff_percent = if price_invalid {
        0.0
    } else {
        (price_diff / binance_price.min(okx_price)) * 100.0
    };

    let rate_diff = aligned.binance.funding_rate - aligned.okx.funding_rate;

    CrossSignal {
        symbol: aligned.symbol.clone(),
        price_diff,
        price_diff_percent,
        rate_diff,
        price_invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AlignedExchange;
    use jackbot_instrument::symbol::Symbol;

    fn leg(price: f64, funding_rate: f64) -> AlignedExchange {
        AlignedExchange {
            price,
            funding_rate,
            current_settlement_ts: None,
            current_settlement_human: None,
            next_settlement_ts: None,
            next_settlement_human: None,
        }
    }

    fn aligned(binance: AlignedExchange, okx: AlignedExchange) -> Aligned {
        Aligned {
            symbol: Symbol::normalize("BTCUSDT"),
            binance,
            okx,
        }
    }

    #[test]
    fn test_happy_path_price_and_rate_diff() {
        let record = aligned(leg(101.0, 0.0002), leg(100.0, 0.0001));
        let signal = cross(&record);
        assert_eq!(signal.price_diff, 1.0);
        assert!((signal.price_diff_percent - 1.0).abs() < 1e-9);
        assert!((signal.rate_diff - 0.0001).abs() < 1e-9);
        assert!(!signal.price_invalid);
    }

    #[test]
    fn test_diff_is_absolute_regardless_of_which_side_is_higher() {
        let higher_okx = cross(&aligned(leg(100.0, 0.0002), leg(101.0, 0.0001)));
        let higher_binance = cross(&aligned(leg(101.0, 0.0002), leg(100.0, 0.0001)));
        assert_eq!(higher_okx.price_diff, higher_binance.price_diff);
        assert_eq!(higher_okx.price_diff_percent, higher_binance.price_diff_percent);
    }

    #[test]
    fn test_percent_divides_by_the_smaller_leg() {
        // diff is 10, smaller leg is 100 -> 10%, not diff/okx_price (110) -> 9.09%
        let record = aligned(leg(110.0, 0.0), leg(100.0, 0.0));
        let signal = cross(&record);
        assert!((signal.price_diff_percent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_price_substitutes_zero_flags_and_zeroes_percent() {
        let record = aligned(leg(-1.0, 0.0002), leg(100.0, 0.0001));
        let signal = cross(&record);
        assert!(signal.price_invalid);
        assert_eq!(signal.price_diff, 100.0);
        assert_eq!(signal.price_diff_percent, 0.0);
    }

    #[test]
    fn test_no_cross_symbol_leakage() {
        let btc = aligned(leg(101.0, 0.0002), leg(100.0, 0.0001));
        let signal = cross(&btc);
        assert_eq!(signal.symbol.as_str(), "BTCUSDT");
    }
}
