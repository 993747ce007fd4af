use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use sc3_engine::cursor::Cursor;
use sc3_engine::{
    ActiveValue, Domain, FormatOptions, Game, ParseOptions, ScriptFile, TokenFormatter,
};

fn literal(value: u16) -> Vec<u8> {
    vec![0xa0 | (value >> 8) as u8, value as u8, 0x00]
}

/// `mem[address] = value`, terminated.
fn av_store(address: u16, value: u16) -> Vec<u8> {
    let mut out = vec![0x28, 0x00];
    out.extend(literal(address));
    out.extend([0x14, 0x00]);
    out.extend(literal(value));
    out.push(0x00);
    out
}

/// One event chunk of `count` memops and a closing end, plus a conversation
/// chunk of `count` acknowledged lines.
fn sample_script(count: usize) -> Vec<u8> {
    let mut event = Vec::new();
    for i in 0..count {
        event.push(0xfe);
        event.extend(av_store((i % 2000) as u16 + 16, i as u16 & 0x0fff));
    }
    event.extend([0x00, 0x06]);
    let mut conv = Vec::new();
    for i in 0..count {
        conv.extend(format!("Line number {i}").bytes());
        conv.push(0x02);
    }

    let mut out = b"SC3\0".to_vec();
    out.extend([0u8; 8]);
    out.extend(16u32.to_le_bytes());
    out.extend(&event);
    let off_cs_list = out.len() as u32;
    out.extend((off_cs_list + 4).to_le_bytes());
    out.extend(&conv);
    out[4..8].copy_from_slice(&off_cs_list.to_le_bytes());
    out[8..12].copy_from_slice(&(off_cs_list + 4).to_le_bytes());
    out
}

fn parse(bytes: &[u8]) -> ScriptFile {
    ScriptFile::parse(
        Domain::new(bytes.to_vec()),
        "bench.scr",
        Game::Ever17,
        ParseOptions::default(),
    )
    .expect("parse")
}

fn bench_av_parse(c: &mut Criterion) {
    let domain = Domain::new(av_store(1200, 3000));
    c.bench_function("av_parse_store", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(domain.clone());
            ActiveValue::parse(&mut cursor).expect("av")
        })
    });
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for size in [16usize, 256, 2048] {
        let bytes = sample_script(size);
        group.bench_function(format!("event_{size}"), |b| {
            b.iter_batched(
                || parse(&bytes),
                |script| script.tokenize_event(0, false).expect("tokens"),
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("conv_{size}"), |b| {
            b.iter_batched(
                || parse(&bytes),
                |script| script.tokenize_conv(0, false).expect("tokens"),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_formatter(c: &mut Criterion) {
    let bytes = sample_script(512);
    let options = FormatOptions {
        token_frequency: true,
        follow_frequency: true,
        element_lengths: true,
        ..FormatOptions::default()
    };
    c.bench_function("format_summary", |b| {
        b.iter_batched(
            || (parse(&bytes), TokenFormatter::new(options.clone())),
            |(script, mut formatter)| {
                formatter.process_event_chunks(&script).expect("events");
                formatter.process_conv_chunks(&script).expect("convs");
                formatter.summary("bench")
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(core_benches, bench_av_parse, bench_tokenize, bench_formatter);
criterion_main!(core_benches);
