use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lingotube::planner::plan;
use lingotube::transcription::orchestrator::{fold_segment, SegmentResult, TrackAccumulator};
use lingotube::transcription::{format_timestamp, parse_timestamp, SubtitleTrack};

fn sample_srt(cues: u64) -> String {
    let mut raw = String::new();
    for i in 0..cues {
        raw.push_str(&format!(
            "{}\n{} --> {}\nLine {} of the conversation\n\n",
            i + 1,
            format_timestamp(i * 3_000),
            format_timestamp(i * 3_000 + 2_500),
            i + 1
        ));
    }
    raw
}

fn bench_timecode(c: &mut Criterion) {
    c.bench_function("timestamp_parse", |b| {
        b.iter(|| black_box(parse_timestamp(black_box("01:23:45,678"))))
    });

    c.bench_function("timestamp_format", |b| {
        b.iter(|| black_box(format_timestamp(black_box(5_025_678))))
    });
}

fn bench_subtitle_parsing(c: &mut Criterion) {
    let small = sample_srt(10);
    let large = sample_srt(1_000);

    c.bench_function("srt_parse_small", |b| {
        b.iter(|| black_box(SubtitleTrack::parse(black_box(&small))))
    });

    c.bench_function("srt_parse_large", |b| {
        b.iter(|| black_box(SubtitleTrack::parse(black_box(&large))))
    });

    let track = SubtitleTrack::parse(&large);
    c.bench_function("srt_serialize_large", |b| b.iter(|| black_box(track.serialize())));
}

fn bench_merge(c: &mut Criterion) {
    // Two hours of audio in ten-minute segments, 200 cues each
    let boundaries = plan(7_200.0, 600).unwrap_or_default();
    let raw = sample_srt(200);

    c.bench_function("merge_twelve_segments", |b| {
        b.iter(|| {
            let acc = boundaries.iter().fold(TrackAccumulator::new(), |acc, boundary| {
                fold_segment(
                    acc,
                    SegmentResult::Transcribed {
                        boundary: *boundary,
                        raw_timed_text: raw.clone(),
                    },
                )
            });
            black_box(acc.finish())
        })
    });
}

criterion_group!(benches, bench_timecode, bench_subtitle_parsing, bench_merge);
criterion_main!(benches);
