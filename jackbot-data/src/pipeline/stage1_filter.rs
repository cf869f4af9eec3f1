use crate::observation::{DataType, Observation, Payload};
use crate::pipeline::Extracted;
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};

/// Result of filtering/extracting one [`Observation`].
pub enum FilterOutcome {
    /// Feeds Stage 2 fusion.
    Extracted(Extracted),
    /// A realised funding payment - enriches Stage 2's cached record without
    /// itself producing a fusion emission (see `stage2_fuse::fuse`).
    Settlement {
        exchange: ExchangeId,
        symbol: Symbol,
        funding_rate: f64,
        settlement_ts: i64,
    },
}

/// Static dispatch table on `(exchange, data_type)`, driven by the shape of
/// [`Payload`] already recorded on ingress rather than a runtime match on
/// raw strings.
pub fn filter(observation: Observation) -> FilterOutcome {
    let Observation {
        exchange,
        symbol,
        data_type,
        payload,
        ingress_timestamp,
    } = observation;

    match (data_type, payload) {
        (DataType::Ticker, Payload::Ticker { price }) => FilterOutcome::Extracted(Extracted {
            exchange,
            symbol,
            price: Some(price),
            funding_rate: None,
            current_settlement_ts: None,
            next_settlement_ts: None,
            last_settlement_ts: None,
            ingress_timestamp,
        }),
        (
            DataType::MarkPrice,
            Payload::MarkPrice {
                funding_rate,
                current_settlement_ts,
            },
        ) => FilterOutcome::Extracted(Extracted {
            exchange,
            symbol,
            price: None,
            funding_rate: Some(funding_rate),
            current_settlement_ts: Some(current_settlement_ts),
            next_settlement_ts: None,
            last_settlement_ts: None,
            ingress_timestamp,
        }),
        (
            DataType::FundingRate,
            Payload::FundingRate {
                funding_rate,
                current_settlement_ts,
                next_settlement_ts,
            },
        ) => FilterOutcome::Extracted(Extracted {
            exchange,
            symbol,
            price: None,
            funding_rate: Some(funding_rate),
            current_settlement_ts: Some(current_settlement_ts),
            next_settlement_ts: Some(next_settlement_ts),
            last_settlement_ts: None,
            ingress_timestamp,
        }),
        (
            DataType::FundingSettlement,
            Payload::FundingSettlement {
                funding_rate,
                settlement_ts,
            },
        ) => FilterOutcome::Settlement {
            exchange,
            symbol,
            funding_rate,
            settlement_ts,
        },
        // A data_type/payload mismatch can't occur through the normal
        // exchange parsers (they always pair them correctly) - fall back to
        // a price-only extraction rather than panicking on a malformed or
        // future payload shape.
        (_, Payload::Ticker { price }) => FilterOutcome::Extracted(Extracted {
            exchange,
            symbol,
            price: Some(price),
            funding_rate: None,
            current_settlement_ts: None,
            next_settlement_ts: None,
            last_settlement_ts: None,
            ingress_timestamp,
        }),
        (_, Payload::MarkPrice { funding_rate, current_settlement_ts }) => FilterOutcome::Extracted(Extracted {
            exchange,
            symbol,
            price: None,
            funding_rate: Some(funding_rate),
            current_settlement_ts: Some(current_settlement_ts),
            next_settlement_ts: None,
            last_settlement_ts: None,
            ingress_timestamp,
        }),
        (_, Payload::FundingRate { funding_rate, current_settlement_ts, next_settlement_ts }) => {
            FilterOutcome::Extracted(Extracted {
                exchange,
                symbol,
                price: None,
                funding_rate: Some(funding_rate),
                current_settlement_ts: Some(current_settlement_ts),
                next_settlement_ts: Some(next_settlement_ts),
                last_settlement_ts: None,
                ingress_timestamp,
            })
        }
        (_, Payload::FundingSettlement { funding_rate, settlement_ts }) => FilterOutcome::Settlement {
            exchange,
            symbol,
            funding_rate,
            settlement_ts,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_extracts_price_only() {
        let observation = Observation {
            exchange: ExchangeId::BinanceFuturesUsd,
            symbol: Symbol::normalize("BTCUSDT"),
            data_type: DataType::Ticker,
            payload: Payload::Ticker { price: 100.0 },
            ingress_timestamp: 1,
        };
        let FilterOutcome::Extracted(extracted) = filter(observation) else {
            panic!("expected Extracted")
        };
        assert_eq!(extracted.price, Some(100.0));
        assert_eq!(extracted.funding_rate, None);
    }

    #[test]
    fn test_funding_settlement_does_not_extract() {
        let observation = Observation {
            exchange: ExchangeId::BinanceFuturesUsd,
            symbol: Symbol::normalize("BTCUSDT"),
            data_type: DataType::FundingSettlement,
            payload: Payload::FundingSettlement {
                funding_rate: 0.0001,
                settlement_ts: 1700000000000,
            },
            ingress_timestamp: 1,
        };
        assert!(matches!(filter(observation), FilterOutcome::Settlement { .. }));
    }

    #[test]
    fn test_okx_funding_rate_carries_both_settlement_times() {
        let observation = Observation {
            exchange: ExchangeId::Okx,
            symbol: Symbol::normalize("BTCUSDT"),
            data_type: DataType::FundingRate,
            payload: Payload::FundingRate {
                funding_rate: 0.00005,
                current_settlement_ts: 1_700_000_000_000,
                next_settlement_ts: 1_700_028_800_000,
            },
            ingress_timestamp: 1,
        };
        let FilterOutcome::Extracted(extracted) = filter(observation) else {
            panic!("expected Extracted")
        };
        assert_eq!(extracted.current_settlement_ts, Some(1_700_000_000_000));
        assert_eq!(extracted.next_settlement_ts, Some(1_700_028_800_000));
    }
}
