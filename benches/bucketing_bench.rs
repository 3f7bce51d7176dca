use criterion::{black_box, criterion_group, criterion_main, Criterion};
use yt_transcript_rust::transcript::{parse_timestamp, parse_transcript_lines, CaptionSegment};
use yt_transcript_rust::{BucketPolicy, TimestampStyle, TranscriptDocument};

fn segments(count: u64, spacing: u64) -> Vec<CaptionSegment> {
    (0..count)
        .filter_map(|i| CaptionSegment::new(i * spacing, &format!("caption line number {} with some words", i)))
        .collect()
}

fn bench_bucketing(c: &mut Criterion) {
    let policy = BucketPolicy::default();

    let short = segments(120, 3);
    c.bench_function("bucket_short_video", |b| {
        b.iter(|| {
            let width = policy.width_for(black_box(360.0));
            black_box(TranscriptDocument::from_segments(&short, width))
        })
    });

    let long = segments(2_000, 2);
    c.bench_function("bucket_long_video", |b| {
        b.iter(|| {
            let width = policy.width_for(black_box(4_000.0));
            black_box(TranscriptDocument::from_segments(&long, width))
        })
    });
}

fn bench_rendering(c: &mut Criterion) {
    let document = TranscriptDocument::from_segments(&segments(2_000, 2), 60);

    c.bench_function("render_minutes", |b| {
        b.iter(|| black_box(document.render(TimestampStyle::Minutes)))
    });

    c.bench_function("render_hours", |b| {
        b.iter(|| black_box(document.render(TimestampStyle::Hours)))
    });

    let rendered = document.render(TimestampStyle::Minutes);
    c.bench_function("parse_rendered_lines", |b| {
        b.iter(|| black_box(parse_transcript_lines(&rendered)))
    });
}

fn bench_timestamps(c: &mut Criterion) {
    c.bench_function("parse_timestamps", |b| {
        b.iter(|| {
            black_box(parse_timestamp("0:05"));
            black_box(parse_timestamp("12:34"));
            black_box(parse_timestamp("1:02:03"));
            black_box(parse_timestamp("not a time"));
        })
    });
}

criterion_group!(benches, bench_bucketing, bench_rendering, bench_timestamps);
criterion_main!(benches);
