//! Criterion benchmarks for runner hot paths.
//!
//! Run with: `cargo bench -p shockflip-runner`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shockflip_core::StrategyConfig;
use shockflip_runner::{
    dataset_hash, generate_bars, run_event_study, run_parity, EventStudyConfig, ParamGrid,
    ParamSweep, SyntheticSpec, TradeSummary,
};

fn spec(bars: usize) -> SyntheticSpec {
    SyntheticSpec {
        bars,
        shock_probability: 0.01,
        ..SyntheticSpec::default()
    }
}

fn bench_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthetic_bars");
    for size in [10_000usize, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            let spec = spec(n);
            b.iter(|| generate_bars(black_box(&spec)));
        });
    }
    group.finish();
}

fn bench_dataset_hash(c: &mut Criterion) {
    let bars = generate_bars(&spec(100_000));
    c.bench_function("dataset_hash_100k", |b| {
        b.iter(|| dataset_hash(black_box(&bars)))
    });
}

fn bench_sweep(c: &mut Criterion) {
    let bars = generate_bars(&spec(20_000));
    let base = StrategyConfig::default();
    let grid = ParamGrid::default();

    let mut group = c.benchmark_group("micro_grid_sweep_20k");
    group.sample_size(10);
    for parallel in [false, true] {
        group.bench_with_input(
            BenchmarkId::from_parameter(if parallel { "parallel" } else { "sequential" }),
            &parallel,
            |b, &parallel| {
                let sweep = ParamSweep::new().with_parallelism(parallel);
                b.iter(|| sweep.sweep(&grid, &base, black_box(&bars)))
            },
        );
    }
    group.finish();
}

fn bench_parity(c: &mut Criterion) {
    let bars = generate_bars(&spec(50_000));
    let cfg = StrategyConfig::default();
    let mut group = c.benchmark_group("parity");
    group.sample_size(10);
    group.bench_function("batch_vs_streaming_50k", |b| {
        b.iter(|| run_parity(black_box(&bars), &cfg))
    });
    group.finish();
}

fn bench_event_study(c: &mut Criterion) {
    let bars = generate_bars(&spec(50_000));
    let mut cfg = StrategyConfig::default();
    cfg.features.z_window = 60;
    cfg.detector.persistence_ratio = 0.34;
    let study = EventStudyConfig::default();
    let mut group = c.benchmark_group("event_study");
    group.sample_size(10);
    group.bench_function("default_horizons_50k", |b| {
        b.iter(|| run_event_study(black_box(&bars), &cfg, &study))
    });
    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let bars = generate_bars(&spec(100_000));
    let mut cfg = StrategyConfig::default();
    cfg.features.z_window = 60;
    cfg.detector.persistence_ratio = 0.34;
    let trades = match shockflip_core::run_batch(&bars, &cfg) {
        Ok(output) => output.trades,
        Err(_) => Vec::new(),
    };
    c.bench_function("trade_summary", |b| {
        b.iter(|| TradeSummary::compute(black_box(&trades)))
    });
}

criterion_group!(
    benches,
    bench_synthetic,
    bench_dataset_hash,
    bench_sweep,
    bench_parity,
    bench_event_study,
    bench_summary
);
criterion_main!(benches);
