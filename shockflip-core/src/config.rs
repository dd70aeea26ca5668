//! Strategy configuration.
//!
//! One immutable value, built (or deserialized) once and passed by reference
//! into every component constructor. Modes that used to be scattered boolean
//! flags are tagged enums resolved once per bar.
//!
//! `validate()` must be called before any simulation; it is the only place
//! configuration errors are raised.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Side};
use crate::error::{CoreError, CoreResult};

/// Complete configuration for one (instrument, strategy) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub features: FeatureConfig,
    pub detector: DetectorConfig,
    pub barrier: BarrierConfig,
    /// Bars suppressed after an event (detector) and after an exit (ledger).
    pub cooldown_bars: usize,
    pub position_policy: PositionPolicy,
    pub costs: CostConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            detector: DetectorConfig::default(),
            barrier: BarrierConfig::default(),
            cooldown_bars: 10,
            position_policy: PositionPolicy::SingleOpen,
            costs: CostConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Eager validation. Returns the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        self.features.validate()?;
        self.detector.validate()?;
        self.barrier.validate()?;
        self.costs.validate()
    }
}

// ── Features ─────────────────────────────────────────────────────────

/// Which per-bar flow series the z-score is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowSource {
    /// (Q+ − Q−) / (Q+ + Q−), scale free.
    #[default]
    Imbalance,
    /// Raw Q+ − Q−; shocks scale with traded size.
    Delta,
}

impl FlowSource {
    pub fn value(self, bar: &Bar) -> f64 {
        match self {
            FlowSource::Imbalance => bar.imbalance(),
            FlowSource::Delta => bar.delta(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Series driving `z`, `z_jump` and the dynamic threshold.
    pub source: FlowSource,
    pub z_window: usize,
    pub atr_window: usize,
    pub donchian_window: usize,
    pub rel_volume_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            source: FlowSource::Imbalance,
            z_window: 240,
            atr_window: 60,
            donchian_window: 120,
            rel_volume_window: 60,
        }
    }
}

impl FeatureConfig {
    fn validate(&self) -> CoreResult<()> {
        // a single-sample z window has zero variance by construction
        if self.z_window < 2 {
            return Err(CoreError::invalid("features.z_window", "must be >= 2"));
        }
        positive_window("features.atr_window", self.atr_window)?;
        positive_window("features.donchian_window", self.donchian_window)?;
        positive_window("features.rel_volume_window", self.rel_volume_window)
    }
}

// ── Detector ─────────────────────────────────────────────────────────

/// How the per-bar z threshold is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdPolicy {
    /// Fixed |z| band.
    Static { z_band: f64 },
    /// Rolling `percentile` of |z| over the last `window` defined values
    /// (current bar included), floored at `min_band`. Undefined until
    /// `min_periods` values are available.
    DynamicPercentile {
        window: usize,
        min_periods: usize,
        percentile: f64,
        min_band: f64,
    },
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Static { z_band: 2.5 }
    }
}

impl ThresholdPolicy {
    /// The research default: 99th percentile of |z| over 4 × `z_window`,
    /// needing one full z window of history.
    pub fn dynamic_for(z_window: usize, min_band: f64) -> Self {
        ThresholdPolicy::DynamicPercentile {
            window: z_window * 4,
            min_periods: z_window,
            percentile: 0.99,
            min_band,
        }
    }

    fn validate(&self) -> CoreResult<()> {
        match *self {
            ThresholdPolicy::Static { z_band } => {
                positive("detector.threshold.z_band", z_band)
            }
            ThresholdPolicy::DynamicPercentile {
                window,
                min_periods,
                percentile,
                min_band,
            } => {
                positive_window("detector.threshold.window", window)?;
                if min_periods == 0 || min_periods > window {
                    return Err(CoreError::invalid(
                        "detector.threshold.min_periods",
                        format!("must be in 1..={window}"),
                    ));
                }
                if !(percentile > 0.0 && percentile <= 1.0) {
                    return Err(CoreError::invalid(
                        "detector.threshold.percentile",
                        "must be in (0, 1]",
                    ));
                }
                positive("detector.threshold.min_band", min_band)
            }
        }
    }
}

/// Where the confirmation bar's close must sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationFilter {
    /// No location requirement.
    Any,
    /// Long needs close at the Donchian window low, short at the window high.
    #[default]
    DonchianExtreme,
}

/// Which flow sign maps to which trade side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowPolarity {
    /// Selling shock (z ≤ −threshold) → long; buying shock → short.
    #[default]
    Exhaustion,
    /// Buying shock (z ≥ threshold) → long; selling shock → short.
    Absorption,
}

impl FlowPolarity {
    /// True if `z` is a shock in the direction that arms `side`.
    pub fn satisfies(self, side: Side, z: f64, threshold: f64) -> bool {
        let signed = match self {
            FlowPolarity::Exhaustion => -side.sign() * z,
            FlowPolarity::Absorption => side.sign() * z,
        };
        signed >= threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub threshold: ThresholdPolicy,
    /// Minimum |z_t − z_{t−1}| on the trigger bar.
    pub jump_band: f64,
    pub persistence_bars: usize,
    pub persistence_ratio: f64,
    pub location: LocationFilter,
    pub polarity: FlowPolarity,
    /// Minimum relative volume on the confirmation bar.
    pub min_rel_volume: Option<f64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdPolicy::default(),
            jump_band: 3.0,
            persistence_bars: 6,
            persistence_ratio: 0.6,
            location: LocationFilter::DonchianExtreme,
            polarity: FlowPolarity::Exhaustion,
            min_rel_volume: None,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> CoreResult<()> {
        self.threshold.validate()?;
        positive("detector.jump_band", self.jump_band)?;
        positive_window("detector.persistence_bars", self.persistence_bars)?;
        if !(0.0..=1.0).contains(&self.persistence_ratio) {
            return Err(CoreError::invalid(
                "detector.persistence_ratio",
                "must be in [0, 1]",
            ));
        }
        if let Some(v) = self.min_rel_volume {
            positive("detector.min_rel_volume", v)?;
        }
        Ok(())
    }

    /// Bars in the persistence window that must satisfy the side condition.
    pub fn persistence_required(&self) -> usize {
        (self.persistence_ratio * self.persistence_bars as f64 - 1e-9)
            .ceil()
            .max(0.0) as usize
    }
}

// ── Barrier ──────────────────────────────────────────────────────────

/// ATR multipliers for one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideBarrier {
    pub tp_mult: f64,
    pub sl_mult: f64,
}

/// Move the stop to entry once MFE reaches `be_at_r`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakevenConfig {
    pub be_at_r: f64,
}

/// Trail the stop `gap_r` behind the best price once MFE reaches
/// `arm_threshold_r`, never below `entry + floor_r`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingConfig {
    pub arm_threshold_r: f64,
    pub floor_r: f64,
    pub gap_r: f64,
}

/// Exit price used when the zombie time-stop fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZombieFallback {
    #[default]
    Close,
    Breakeven,
}

/// Close trades that have not reached `mfe_threshold_r` after `horizon_bars`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZombieConfig {
    pub horizon_bars: usize,
    pub mfe_threshold_r: f64,
    #[serde(default)]
    pub fallback: ZombieFallback,
}

/// Order in which the stop overlays are evaluated on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverlayOrder {
    #[default]
    BreakevenFirst,
    TrailingFirst,
}

/// What wins when the zombie horizon and a barrier touch fall on the same bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitPrecedence {
    #[default]
    TouchFirst,
    TimeoutFirst,
}

/// Fill price for a stop that the bar opened through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapPolicy {
    #[default]
    FillAtLevel,
    FillAtOpen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrierConfig {
    pub long: SideBarrier,
    pub short: SideBarrier,
    pub breakeven: Option<BreakevenConfig>,
    pub trailing: Option<TrailingConfig>,
    pub zombie: Option<ZombieConfig>,
    pub overlay_order: OverlayOrder,
    pub exit_precedence: ExitPrecedence,
    pub gap_policy: GapPolicy,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            long: SideBarrier {
                tp_mult: 27.5,
                sl_mult: 9.0,
            },
            short: SideBarrier {
                tp_mult: 15.0,
                sl_mult: 6.5,
            },
            breakeven: None,
            trailing: None,
            zombie: None,
            overlay_order: OverlayOrder::BreakevenFirst,
            exit_precedence: ExitPrecedence::TouchFirst,
            gap_policy: GapPolicy::FillAtLevel,
        }
    }
}

impl BarrierConfig {
    pub fn for_side(&self, side: Side) -> SideBarrier {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }

    fn validate(&self) -> CoreResult<()> {
        positive("barrier.long.tp_mult", self.long.tp_mult)?;
        positive("barrier.long.sl_mult", self.long.sl_mult)?;
        positive("barrier.short.tp_mult", self.short.tp_mult)?;
        positive("barrier.short.sl_mult", self.short.sl_mult)?;

        if let Some(be) = self.breakeven {
            positive("barrier.breakeven.be_at_r", be.be_at_r)?;
        }
        if let Some(tr) = self.trailing {
            positive("barrier.trailing.arm_threshold_r", tr.arm_threshold_r)?;
            positive("barrier.trailing.gap_r", tr.gap_r)?;
            if !tr.floor_r.is_finite() {
                return Err(CoreError::invalid("barrier.trailing.floor_r", "must be finite"));
            }
            if tr.floor_r > tr.arm_threshold_r {
                return Err(CoreError::invalid(
                    "barrier.trailing.floor_r",
                    "must not exceed arm_threshold_r",
                ));
            }
        }
        if let Some(z) = self.zombie {
            positive_window("barrier.zombie.horizon_bars", z.horizon_bars)?;
            if !z.mfe_threshold_r.is_finite() {
                return Err(CoreError::invalid(
                    "barrier.zombie.mfe_threshold_r",
                    "must be finite",
                ));
            }
        }
        Ok(())
    }
}

// ── Ledger / costs ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionPolicy {
    /// At most one open trade; `cooldown_bars` must pass after each exit.
    #[default]
    SingleOpen,
    /// Every event opens its own independent trade.
    Unrestricted,
}

/// Per-leg trading costs in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub taker_bp: f64,
    pub slippage_bp: f64,
}

impl CostConfig {
    /// Round-trip cost as a fraction of notional.
    pub fn round_trip(&self) -> f64 {
        2.0 * (self.taker_bp + self.slippage_bp) / 10_000.0
    }

    fn validate(&self) -> CoreResult<()> {
        if !(self.taker_bp >= 0.0 && self.slippage_bp >= 0.0) {
            return Err(CoreError::invalid("costs", "basis points must be >= 0"));
        }
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn positive(field: &'static str, v: f64) -> CoreResult<()> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(CoreError::invalid(field, format!("must be > 0 (got {v})")))
    }
}

fn positive_window(field: &'static str, n: usize) -> CoreResult<()> {
    if n == 0 {
        Err(CoreError::invalid(field, "must be >= 1"))
    } else {
        Ok(())
    }
}
