//! Look-ahead contamination tests for indicators, features and events.
//!
//! No value at bar t may depend on bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..300) and the full series
//! (bars 0..600). Values for bars 0..300 must be identical between the two
//! runs; any difference means future data leaked into the past.

use chrono::{Duration, TimeZone, Utc};
use shockflip_core::config::{FlowSource, StrategyConfig, ThresholdPolicy};
use shockflip_core::detector::detect_events;
use shockflip_core::domain::Bar;
use shockflip_core::features::compute_features;
use shockflip_core::indicators::*;
use shockflip_core::run_batch;

/// N bars of deterministic random-walk prices with noisy aggressor flow and
/// an occasional one-sided burst.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        // deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
        let open = price;
        price = (price + change * 0.4).max(10.0);
        let close = price;

        let mut buy = 40.0 + ((seed >> 17) % 20) as f64;
        let mut sell = 40.0 + ((seed >> 7) % 20) as f64;
        if i % 97 == 60 {
            sell *= 8.0;
        } else if i % 131 == 90 {
            buy *= 8.0;
        }

        let open_time = base + Duration::minutes(i as i64);
        bars.push(Bar {
            open_time,
            close_time: open_time + Duration::minutes(1),
            open,
            high: open.max(close) + 0.2,
            low: open.min(close) - 0.2,
            close,
            buy_volume: buy,
            sell_volume: sell,
            volume: buy + sell,
        });
    }

    bars
}

/// Assert that the indicator produces identical values for bars
/// 0..truncated_len whether computed on a truncated or full series.
fn assert_no_lookahead(indicator: &mut dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated = &full_bars[..truncated_len];
    let full_result = indicator.compute(full_bars);
    let truncated_result = indicator.compute(truncated);

    assert_eq!(
        truncated_result.len(),
        truncated_len,
        "{}: truncated result length mismatch",
        indicator.name()
    );
    assert_eq!(full_result.len(), full_bars.len());

    for i in 0..truncated_len {
        assert_eq!(
            truncated_result[i],
            full_result[i],
            "{}: look-ahead contamination at bar {i}",
            indicator.name()
        );
    }
    assert!(
        full_result[indicator.lookback()].is_some(),
        "{}: undefined after lookback",
        indicator.name()
    );
}

fn research_config() -> StrategyConfig {
    let mut cfg = StrategyConfig::default();
    cfg.features.z_window = 30;
    cfg.features.atr_window = 14;
    cfg.features.donchian_window = 20;
    cfg.features.rel_volume_window = 20;
    cfg.detector.threshold = ThresholdPolicy::Static { z_band: 2.0 };
    cfg.detector.jump_band = 1.5;
    cfg.detector.persistence_bars = 3;
    cfg.detector.persistence_ratio = 0.34;
    cfg.cooldown_bars = 5;
    cfg
}

#[test]
fn lookahead_flow_zscore() {
    let bars = make_test_bars(600);
    for source in [FlowSource::Imbalance, FlowSource::Delta] {
        assert_no_lookahead(&mut FlowZScore::new(30, source), &bars, 300);
        assert_no_lookahead(&mut FlowZScore::new(240, source), &bars, 300);
    }
}

#[test]
fn lookahead_atr() {
    let bars = make_test_bars(600);
    assert_no_lookahead(&mut Atr::new(14), &bars, 300);
    assert_no_lookahead(&mut Atr::new(60), &bars, 300);
}

#[test]
fn lookahead_donchian() {
    let bars = make_test_bars(600);
    assert_no_lookahead(&mut Donchian::upper(20), &bars, 300);
    assert_no_lookahead(&mut Donchian::lower(20), &bars, 300);
    assert_no_lookahead(&mut Donchian::upper(120), &bars, 300);
    assert_no_lookahead(&mut Donchian::lower(120), &bars, 300);
}

#[test]
fn lookahead_relative_volume() {
    let bars = make_test_bars(600);
    assert_no_lookahead(&mut RelativeVolume::new(20), &bars, 300);
}

#[test]
fn lookahead_feature_vectors() {
    let bars = make_test_bars(600);
    let mut cfg = research_config();
    for source in [FlowSource::Imbalance, FlowSource::Delta] {
        cfg.features.source = source;
        for policy in [
            cfg.detector.threshold.clone(),
            ThresholdPolicy::dynamic_for(30, 1.5),
        ] {
            let full = compute_features(&bars, &cfg.features, &policy).unwrap();
            let truncated = compute_features(&bars[..300], &cfg.features, &policy).unwrap();
            assert_eq!(&full[..300], &truncated[..]);
        }
    }
}

#[test]
fn lookahead_events() {
    let bars = make_test_bars(600);
    let cfg = research_config();
    let full = compute_features(&bars, &cfg.features, &cfg.detector.threshold).unwrap();
    let full_events = detect_events(&full, &cfg);

    let truncated = compute_features(&bars[..300], &cfg.features, &cfg.detector.threshold).unwrap();
    let truncated_events = detect_events(&truncated, &cfg);

    let prefix: Vec<_> = full_events
        .into_iter()
        .filter(|e| e.confirm_index < 300)
        .collect();
    assert_eq!(prefix, truncated_events);
}

#[test]
fn trades_closed_before_cut_are_unchanged() {
    let bars = make_test_bars(600);
    let cfg = research_config();
    let full = run_batch(&bars, &cfg).unwrap();
    let truncated = run_batch(&bars[..300], &cfg).unwrap();

    let closed_early: Vec<_> = full.trades.iter().filter(|t| t.exit_index < 299).collect();
    let truncated_closed: Vec<_> = truncated
        .trades
        .iter()
        .filter(|t| t.exit_index < 299)
        .collect();
    assert_eq!(closed_early, truncated_closed);
}
