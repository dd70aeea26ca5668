//! Run fingerprinting — deterministic identification of data, strategy and output.
//!
//! - `dataset_hash`: BLAKE3 over every bar field, in order.
//! - `strategy_hash`: BLAKE3 over the canonical JSON of a `StrategyConfig`.
//! - `trade_log_digest`: BLAKE3 over the serialized trade log; equal digests
//!   mean byte-identical logs.

use serde::Serialize;
use shockflip_core::domain::{Bar, Trade};
use shockflip_core::StrategyConfig;

pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.open_time.timestamp_millis().to_le_bytes());
        hasher.update(&bar.close_time.timestamp_millis().to_le_bytes());
        for v in [
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.buy_volume,
            bar.sell_volume,
            bar.volume,
        ] {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Struct field order is fixed, so the JSON is canonical.
pub fn strategy_hash(config: &StrategyConfig) -> Result<String, serde_json::Error> {
    json_digest(config).map(|(_, hex)| hex)
}

/// Serialized trade log and its digest.
pub fn trade_log_digest(trades: &[Trade]) -> Result<(Vec<u8>, String), serde_json::Error> {
    json_digest(trades)
}

fn json_digest<T: Serialize + ?Sized>(value: &T) -> Result<(Vec<u8>, String), serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    let hex = blake3::hash(&bytes).to_hex().to_string();
    Ok((bytes, hex))
}
