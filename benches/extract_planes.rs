use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use raw2fits_rs::image_pipeline::{
    BayerArrangement, RawFrame, extract_plane, resolve_offsets,
};

fn generate_mock_frame(width: usize, height: usize) -> RawFrame {
    let data = (0..width * height)
        .map(|i| ((i % width + i / width) % 16384) as u32)
        .collect();
    RawFrame::from_samples(width, height, data)
}

fn benchmark_binning_factors(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_by_binning");
    let frame = generate_mock_frame(2000, 2000);

    for binning in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(binning), &binning, |b, &binning| {
            b.iter(|| {
                for filter in 0..3 {
                    let offsets = resolve_offsets(BayerArrangement::Rggb, "RGBG", filter)
                        .expect("canonical arrangement");
                    let _ = extract_plane(black_box(&frame), filter, offsets, binning);
                }
            });
        });
    }

    group.finish();
}

fn benchmark_frame_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_green_by_size");
    let offsets = resolve_offsets(BayerArrangement::Rggb, "RGBG", 1).expect("canonical arrangement");

    for (width, height, label) in [(500, 500, "500x500"), (2000, 2000, "2000x2000"), (6000, 4000, "6000x4000")] {
        let frame = generate_mock_frame(width, height);
        group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |b, frame| {
            b.iter(|| extract_plane(black_box(frame), 1, offsets, 1));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_binning_factors, benchmark_frame_sizes);
criterion_main!(benches);
