use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Canonical, exchange-agnostic symbol used as the cross-exchange join key
/// (eg/ `BTCUSDT`).
///
/// Exchange-native forms are normalised on ingress via [`Symbol::normalize`]:
/// - Binance sends symbols already uppercase (`BTCUSDT`).
/// - OKX sends `instId`s of shape `BTC-USDT-SWAP`.
///
/// [`Symbol::normalize`] is idempotent: `normalize(normalize(s)) == normalize(s)`
/// for every exchange-native form above.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, Constructor,
)]
#[serde(transparent)]
pub struct Symbol(pub SmolStr);

impl Symbol {
    /// Normalise an exchange-native symbol into its canonical form.
    ///
    /// Strips a trailing `-SWAP` suffix, removes remaining hyphens, and
    /// upper-cases the result.
    pub fn normalize(native: &str) -> Self {
        let upper = native.to_ascii_uppercase();
        let without_swap = upper.strip_suffix("-SWAP").unwrap_or(&upper);
        let joined: String = without_swap.chars().filter(|c| *c != '-').collect();
        Self(SmolStr::new(joined))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_binance_native_is_noop() {
        assert_eq!(Symbol::normalize("BTCUSDT").as_str(), "BTCUSDT");
    }

    #[test]
    fn test_normalize_okx_strips_swap_and_hyphens() {
        assert_eq!(Symbol::normalize("BTC-USDT-SWAP").as_str(), "BTCUSDT");
        assert_eq!(Symbol::normalize("eth-usdt-swap").as_str(), "ETHUSDT");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for native in ["BTCUSDT", "BTC-USDT-SWAP", "ethusdt", "ETH-USDT-SWAP"] {
            let once = Symbol::normalize(native);
            let twice = Symbol::normalize(once.as_str());
            assert_eq!(once, twice);
        }
    }
}
