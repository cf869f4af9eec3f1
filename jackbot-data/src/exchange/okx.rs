//! Exchange module for OKX (EX-B). Implements [`Connector`].

use super::{Connector, ParseOutcome};
use crate::observation::{DataType, Observation, Payload};
use jackbot_instrument::{exchange::ExchangeId, symbol::Symbol};
use jackbot_integration::protocol::websocket::WsMessage;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const BASE_URL_OKX: &str = "wss://wsaws.okx.com:8443/ws/v5/public";

/// OKX execution.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Okx;

impl Connector for Okx {
    const ID: ExchangeId = ExchangeId::Okx;
    const HEARTBEAT_SYMBOL: &'static str = "BTC-USDT-SWAP";

    fn url() -> Url {
        Url::parse(BASE_URL_OKX).expect("static OKX URL is valid")
    }

    fn ping_interval() -> Duration {
        Duration::from_secs(29)
    }

    fn subscribe_request(symbols: &[Symbol]) -> WsMessage {
        let args = symbols
            .iter()
            .flat_map(|symbol| {
                let inst_id = to_inst_id(symbol);
                [
                    json!({"channel": "tickers", "instId": inst_id}),
                    json!({"channel": "funding-rate", "instId": inst_id}),
                ]
            })
            .collect::<Vec<_>>();

        WsMessage::text(json!({"op": "subscribe", "args": args}).to_string())
    }

    fn unsubscribe_request(symbols: &[Symbol]) -> WsMessage {
        let args = symbols
            .iter()
            .flat_map(|symbol| {
                let inst_id = to_inst_id(symbol);
                [
                    json!({"channel": "tickers", "instId": inst_id}),
                    json!({"channel": "funding-rate", "instId": inst_id}),
                ]
            })
            .collect::<Vec<_>>();

        WsMessage::text(json!({"op": "unsubscribe", "args": args}).to_string())
    }

    fn parse(raw: &str) -> ParseOutcome {
        parse_okx(raw)
    }
}

/// `BTCUSDT` -> `BTC-USDT-SWAP`. Inverse of [`Symbol::normalize`] for the
/// symbols this system deals in (all USDT-margined swaps).
fn to_inst_id(symbol: &Symbol) -> String {
    let native = symbol.as_str();
    let Some(split) = native.strip_suffix("USDT") else {
        return format!("{native}-SWAP");
    };
    format!("{split}-USDT-SWAP")
}

#[derive(Debug, Deserialize)]
struct OkxEnvelope {
    #[serde(default)]
    arg: Option<OkxArg>,
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    event: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OkxArg {
    channel: String,
}

#[derive(Debug, Deserialize)]
struct OkxTicker {
    #[serde(rename = "instId")]
    inst_id: String,
    last: String,
}

#[derive(Debug, Deserialize)]
struct OkxFundingRate {
    #[serde(rename = "instId")]
    inst_id: String,
    #[serde(rename = "fundingRate")]
    funding_rate: String,
    #[serde(rename = "fundingTime")]
    funding_time: String,
    #[serde(rename = "nextFundingTime")]
    next_funding_time: String,
}

fn parse_okx(raw: &str) -> ParseOutcome {
    let Ok(envelope) = serde_json::from_str::<OkxEnvelope>(raw) else {
        warn!(raw, "failed to parse OKX frame as JSON");
        return ParseOutcome::Unrecognized;
    };

    // Subscribe acks/errors: {"event":"subscribe","arg":{...}} or {"event":"error",...}.
    if envelope.event.is_some() {
        debug!(raw, "swallowing OKX control frame");
        return ParseOutcome::Control;
    }

    let Some(arg) = envelope.arg else {
        return ParseOutcome::Unrecognized;
    };
    let Some(first) = envelope.data.into_iter().next() else {
        return ParseOutcome::Unrecognized;
    };

    let now = chrono::Utc::now().timestamp_millis();

    let observation = match arg.channel.as_str() {
        "tickers" => {
            let Ok(ticker) = serde_json::from_value::<OkxTicker>(first) else {
                warn!(raw, "malformed OKX ticker payload");
                return ParseOutcome::Unrecognized;
            };
            let Ok(price) = ticker.last.parse::<f64>() else {
                warn!(raw, "unparsable OKX ticker price");
                return ParseOutcome::Unrecognized;
            };
            Observation {
                exchange: ExchangeId::Okx,
                symbol: Symbol::normalize(&ticker.inst_id),
                data_type: DataType::Ticker,
                payload: Payload::Ticker { price },
                ingress_timestamp: now,
            }
        }
        "funding-rate" => {
            let Ok(funding) = serde_json::from_value::<OkxFundingRate>(first) else {
                warn!(raw, "malformed OKX funding-rate payload");
                return ParseOutcome::Unrecognized;
            };
            let (Ok(rate), Ok(current_ts), Ok(next_ts)) = (
                funding.funding_rate.parse::<f64>(),
                funding.funding_time.parse::<i64>(),
                funding.next_funding_time.parse::<i64>(),
            ) else {
                warn!(raw, "unparsable OKX funding-rate fields");
                return ParseOutcome::Unrecognized;
            };
            Observation {
                exchange: ExchangeId::Okx,
                symbol: Symbol::normalize(&funding.inst_id),
                data_type: DataType::FundingRate,
                payload: Payload::FundingRate {
                    funding_rate: rate,
                    current_settlement_ts: current_ts,
                    next_settlement_ts: next_ts,
                },
                ingress_timestamp: now,
            }
        }
        other => {
            debug!(channel = other, "unrecognised OKX channel");
            return ParseOutcome::Unrecognized;
        }
    };

    ParseOutcome::Data(observation)
}
