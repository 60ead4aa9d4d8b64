//! Instrument identity
//!
//! An instrument is one tradable contract on one venue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A market data venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Binance,
    Bybit,
    Mexc,
    Bitget,
    Gateio,
}

impl Venue {
    pub const ALL: [Venue; 5] = [
        Venue::Binance,
        Venue::Bybit,
        Venue::Mexc,
        Venue::Bitget,
        Venue::Gateio,
    ];

    /// Lowercase venue name as used in config and store records
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Bybit => "bybit",
            Venue::Mexc => "mexc",
            Venue::Bitget => "bitget",
            Venue::Gateio => "gateio",
        }
    }

    /// Link to the venue's futures trading page for a symbol like "BTCUSDT"
    pub fn trade_url(&self, symbol: &str) -> String {
        let symbol = symbol.to_uppercase();
        let base = symbol.strip_suffix("USDT").unwrap_or(&symbol);
        match self {
            Venue::Binance => format!("https://www.binance.com/en/futures/{}", symbol),
            Venue::Bybit => format!("https://www.bybit.com/trade/usdt/{}", symbol),
            Venue::Mexc => format!("https://futures.mexc.com/exchange/{}_USDT", base),
            Venue::Bitget => format!("https://www.bitget.com/futures/usdt/{}", symbol),
            Venue::Gateio => format!("https://www.gate.io/futures/USDT/{}_USDT", base),
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Ok(Venue::Binance),
            "bybit" => Ok(Venue::Bybit),
            "mexc" => Ok(Venue::Mexc),
            "bitget" => Ok(Venue::Bitget),
            "gateio" | "gate" => Ok(Venue::Gateio),
            other => anyhow::bail!("Unknown venue: {}", other),
        }
    }
}

/// Unique identifier of one instrument on one venue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    symbol: String,
    venue: Venue,
}

impl InstrumentKey {
    /// Create a key; the symbol is normalised to uppercase ("BTCUSDT")
    pub fn new(symbol: impl AsRef<str>, venue: Venue) -> Self {
        Self {
            symbol: symbol.as_ref().trim().to_uppercase(),
            venue,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.venue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_from_str() {
        assert_eq!("binance".parse::<Venue>().unwrap(), Venue::Binance);
        assert_eq!(" MEXC ".parse::<Venue>().unwrap(), Venue::Mexc);
        assert_eq!("gate".parse::<Venue>().unwrap(), Venue::Gateio);
        assert!("kraken".parse::<Venue>().is_err());
    }

    #[test]
    fn test_venue_serde_lowercase() {
        let json = serde_json::to_string(&Venue::Bitget).unwrap();
        assert_eq!(json, "\"bitget\"");
        let venue: Venue = serde_json::from_str("\"gateio\"").unwrap();
        assert_eq!(venue, Venue::Gateio);
    }

    #[test]
    fn test_instrument_key_normalises_symbol() {
        let key = InstrumentKey::new("btcusdt", Venue::Binance);
        assert_eq!(key.symbol(), "BTCUSDT");
        assert_eq!(key, InstrumentKey::new("BTCUSDT", Venue::Binance));
        assert_ne!(key, InstrumentKey::new("BTCUSDT", Venue::Mexc));
        assert_eq!(key.to_string(), "BTCUSDT:binance");
    }

    #[test]
    fn test_trade_url() {
        assert_eq!(
            Venue::Binance.trade_url("solusdt"),
            "https://www.binance.com/en/futures/SOLUSDT"
        );
        assert_eq!(
            Venue::Mexc.trade_url("SOLUSDT"),
            "https://futures.mexc.com/exchange/SOL_USDT"
        );
        assert_eq!(
            Venue::Gateio.trade_url("ORDIUSDT"),
            "https://www.gate.io/futures/USDT/ORDI_USDT"
        );
    }
}
