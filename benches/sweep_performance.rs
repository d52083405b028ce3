//! Performance benchmarks for sweeps
//!
//! Every model is closed-form, so the interesting cost is the number of
//! evaluations a sweep performs and the overhead around each one.
//!
//! # What We're Measuring
//!
//! 1. **Collector sweep**: the Tufenkji–Elimelech correlation over a
//!    logarithmic particle-size range (fluid properties, five dimensionless
//!    groups and three power laws per sample)
//! 2. **Registry comparison**: `evaluate_all` on one record (eight linear
//!    expressions, parallel with the `parallel` feature)
//! 3. **Two-site profile**: concentration profile along the bed depth
//!
//! # Expected Results
//!
//! Time should scale linearly with the number of sweep points. With the
//! `parallel` feature, sweeps above the parallel threshold should scale
//! with the number of cores until allocation dominates.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all sweep benchmarks
//! cargo bench --bench sweep_performance
//!
//! # Only the collector sweep
//! cargo bench --bench sweep_performance collector
//!
//! # With rayon
//! cargo bench --bench sweep_performance --features parallel
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use ssf_rs::models::collector::{sweep_over_variable, CollectorInputs, CollectorVariable};
use ssf_rs::models::registry::evaluate_all;
use ssf_rs::models::two_site::concentration_profile;
use ssf_rs::physics::{Parameter, ParameterRecord};
use ssf_rs::sweep::{SweepConfiguration, SweepRange};

// =================================================================================================
// Benchmark Functions
// =================================================================================================

/// Collector efficiency over particle size
///
/// # Test Configuration
///
/// - **Points**: 100, 1 000, 10 000 (log-spaced, 0.01 to 10 µm)
/// - **Inputs**: default clean-bed operating point
fn benchmark_collector_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("Collector Sweep");

    for points in [100, 1_000, 10_000].iter() {
        let config = SweepConfiguration::new(SweepRange::logarithmic(0.01, 10.0, *points));
        let inputs = CollectorInputs::default();

        group.throughput(Throughput::Elements(*points as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), points, |b, _| {
            b.iter(|| {
                sweep_over_variable(
                    black_box(CollectorVariable::ParticleDiameter),
                    black_box(&config),
                    black_box(&inputs),
                )
                .unwrap()
            });
        });
    }

    group.finish();
}

/// Cross-model comparison on a fully populated record
fn benchmark_registry(c: &mut Criterion) {
    let record = ParameterRecord::empty()
        .with(Parameter::Protein, 185.0)
        .with(Parameter::Carbohydrate, 390.0)
        .with(Parameter::Biomass, 1.0e9)
        .with(Parameter::SchmutzdeckeAge, 730.0)
        .with(Parameter::GrainSize, 0.3)
        .with_flag(Parameter::Inoculated, true);

    c.bench_function("Registry evaluate_all", |b| {
        b.iter(|| evaluate_all(black_box(&record)));
    });
}

/// Concentration profile over the bed depth
///
/// Rates representative of a mature filter: λ = 2 d⁻¹ at 0.2 m/h (4.8 m/d).
fn benchmark_two_site_profile(c: &mut Criterion) {
    let mut group = c.benchmark_group("Two-Site Profile");
    group.measurement_time(Duration::from_secs(10));

    for points in [101, 1_001, 10_001].iter() {
        let depth = SweepRange::linear(0.0, 1.2, *points);

        group.throughput(Throughput::Elements(*points as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), points, |b, _| {
            b.iter(|| concentration_profile(black_box(4.8), black_box(0.01), black_box(2.0), black_box(&depth)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_collector_sweep,
    benchmark_registry,
    benchmark_two_site_profile,
);

criterion_main!(benches);
