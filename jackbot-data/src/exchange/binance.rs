//! Exchange module for Binance USDⓈ-M Futures (EX-A). Implements [`Connector`]
//! and re-exports the rate limiter.

use super::{Connector, ParseOutcome};
use crate::observation::{DataType, Observation, Payload};
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use jackbot_integration::protocol::websocket::WsMessage;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Rate limiting for Binance REST and WebSocket usage.
pub mod rate_limit;

const BASE_URL_BINANCE_FUTURES_USD: &str = "wss://fstream.binance.com/ws";

/// Binance USDⓈ-M Futures execution.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Binance;

impl Connector for Binance {
    const ID: ExchangeId = ExchangeId::BinanceFuturesUsd;
    const HEARTBEAT_SYMBOL: &'static str = "BTCUSDT";

    fn url() -> Url {
        Url::parse(BASE_URL_BINANCE_FUTURES_USD).expect("static Binance URL is valid")
    }

    fn ping_interval() -> Duration {
        Duration::from_secs(20)
    }

    fn subscribe_request(symbols: &[Symbol]) -> WsMessage {
        let params = symbols
            .iter()
            .flat_map(|symbol| {
                let lower = symbol.as_str().to_lowercase();
                [format!("{lower}@ticker"), format!("{lower}@markPrice")]
            })
            .collect::<Vec<_>>();

        WsMessage::text(
            serde_json::json!({
                "method": "SUBSCRIBE",
                "params": params,
                "id": 1,
            })
            .to_string(),
        )
    }

    fn unsubscribe_request(symbols: &[Symbol]) -> WsMessage {
        let params = symbols
            .iter()
            .flat_map(|symbol| {
                let lower = symbol.as_str().to_lowercase();
                [format!("{lower}@ticker"), format!("{lower}@markPrice")]
            })
            .collect::<Vec<_>>();

        WsMessage::text(
            serde_json::json!({
                "method": "UNSUBSCRIBE",
                "params": params,
                "id": 2,
            })
            .to_string(),
        )
    }

    fn parse(raw: &str) -> ParseOutcome {
        parse_binance(raw)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "e")]
enum BinanceEvent {
    #[serde(rename = "24hrTicker")]
    Ticker {
        #[serde(rename = "s")]
        symbol: String,
        #[serde(rename = "c")]
        close: String,
    },
    #[serde(rename = "markPriceUpdate")]
    MarkPrice {
        #[serde(rename = "s")]
        symbol: String,
        #[serde(rename = "r")]
        funding_rate: String,
        #[serde(rename = "T")]
        next_funding_time: i64,
    },
}

fn parse_binance(raw: &str) -> ParseOutcome {
    // Control frames (subscribe acks) have no `e` field: `{"result":null,"id":1}`.
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        warn!(raw, "failed to parse Binance frame as JSON");
        return ParseOutcome::Unrecognized;
    };

    if value.get("e").is_none() {
        debug!(raw, "swallowing Binance control frame");
        return ParseOutcome::Control;
    }

    let event = match serde_json::from_value::<BinanceEvent>(value) {
        Ok(event) => event,
        Err(error) => {
            warn!(?error, raw, "unrecognised Binance event type");
            return ParseOutcome::Unrecognized;
        }
    };

    let now = chrono::Utc::now().timestamp_millis();

    let observation = match event {
        BinanceEvent::Ticker { symbol, close } => {
            let Ok(price) = close.parse::<f64>() else {
                warn!(symbol, close, "unparsable Binance ticker price");
                return ParseOutcome::Unrecognized;
            };
            Observation {
                exchange: ExchangeId::BinanceFuturesUsd,
                symbol: Symbol::normalize(&symbol),
                data_type: DataType::Ticker,
                payload: Payload::Ticker { price },
                ingress_timestamp: now,
            }
        }
        BinanceEvent::MarkPrice {
            symbol,
            funding_rate,
            next_funding_time,
        } => {
            let Ok(funding_rate) = funding_rate.parse::<f64>() else {
                warn!(symbol, funding_rate, "unparsable Binance funding rate");
                return ParseOutcome::Unrecognized;
            };
            Observation {
                exchange: ExchangeId::BinanceFuturesUsd,
                symbol: Symbol::normalize(&symbol),
                data_type: DataType::MarkPrice,
                payload: Payload::MarkPrice {
                    funding_rate,
                    current_settlement_ts: next_funding_time,
                },
                ingress_timestamp: now,
            }
        }
    };

    ParseOutcome::Data(observation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticker() {
        let raw = r#"{"e":"24hrTicker","s":"BTCUSDT","c":"100"}"#;
        let ParseOutcome::Data(obs) = parse_binance(raw) else {
            panic!("expected Data")
        };
        assert_eq!(obs.symbol.as_str(), "BTCUSDT");
        assert_eq!(obs.data_type, DataType::Ticker);
        match obs.payload {
            Payload::Ticker { price } => assert_eq!(price, 100.0),
            _ => panic!("expected Ticker payload"),
        }
    }

    #[test]
    fn test_parse_mark_price() {
        let raw = r#"{"e":"markPriceUpdate","s":"BTCUSDT","r":"0.0001","T":1700000000000}"#;
        let ParseOutcome::Data(obs) = parse_binance(raw) else {
            panic!("expected Data")
        };
        assert_eq!(obs.data_type, DataType::MarkPrice);
        match obs.payload {
            Payload::MarkPrice {
                funding_rate,
                current_settlement_ts,
            } => {
                assert_eq!(funding_rate, 0.0001);
                assert_eq!(current_settlement_ts, 1_700_000_000_000);
            }
            _ => panic!("expected MarkPrice payload"),
        }
    }

    #[test]
    fn test_control_frame_swallowed() {
        let raw = r#"{"result":null,"id":1}"#;
        assert!(matches!(parse_binance(raw), ParseOutcome::Control));
    }

    #[test]
    fn test_subscribe_request_batches_ticker_and_mark_price() {
        let symbols = [Symbol::normalize("BTCUSDT"), Symbol::normalize("ETHUSDT")];
        let WsMessage::Text(text) = Binance::subscribe_request(&symbols) else {
            panic!("expected text message")
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let params = value["params"].as_array().unwrap();
        assert_eq!(params.len(), 4);
        assert!(params.iter().any(|p| p == "btcusdt@ticker"));
        assert!(params.iter().any(|p| p == "btcusdt@markPrice"));
    }
}
