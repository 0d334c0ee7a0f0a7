//! Benchmarks for position planning and frame sampling.
//!
//! Run with: cargo bench
//!
//! The decode benchmarks require fixture files from
//! `tests/fixtures/generate_fixtures.sh` and are skipped without them.

use std::{hint::black_box, path::Path};

use criterion::{BenchmarkId, Criterion};
use vidsift::{
    FfmpegLogLevel, FrameSampler, FrameSource, SampleOptions, SamplingPolicy, VideoSource,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn benchmark_position_planning(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("plan positions");
    for policy in [SamplingPolicy::EvenSpacing, SamplingPolicy::FixedInterval] {
        for (total, count) in [(150_u64, 7_u64), (10_000_000, 1_000)] {
            group.bench_with_input(
                BenchmarkId::new(policy.to_string(), format!("{count}/{total}")),
                &(total, count),
                |bencher, &(total, count)| {
                    bencher.iter(|| policy.positions(black_box(total), black_box(count)));
                },
            );
        }
    }
    group.finish();
}

fn benchmark_single_decode(criterion: &mut Criterion) {
    vidsift::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    criterion.bench_function("decode first frame", |bencher| {
        bencher.iter(|| {
            let mut source = VideoSource::open(SAMPLE_VIDEO).unwrap();
            let _frame = source.decode_frame(0).unwrap();
        });
    });

    criterion.bench_function("decode mid-video frame", |bencher| {
        bencher.iter(|| {
            let mut source = VideoSource::open(SAMPLE_VIDEO).unwrap();
            let _frame = source.decode_frame(75).unwrap();
        });
    });
}

fn benchmark_sampling(criterion: &mut Criterion) {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let output = tempfile::tempdir().unwrap();
    let mut group = criterion.benchmark_group("sample to jpeg");
    group.sample_size(10);

    for count in [1_u64, 7, 20] {
        let sampler = FrameSampler::new(SampleOptions::new().with_count(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &sampler, |bencher, sampler| {
            bencher.iter(|| sampler.sample(SAMPLE_VIDEO, output.path()).unwrap());
        });
    }

    let downscaled = FrameSampler::new(SampleOptions::new().with_max_dimension(Some(320)));
    group.bench_function("7 downscaled to 320", |bencher| {
        bencher.iter(|| downscaled.sample(SAMPLE_VIDEO, output.path()).unwrap());
    });

    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_position_planning,
    benchmark_single_decode,
    benchmark_sampling,
);
criterion::criterion_main!(benches);
