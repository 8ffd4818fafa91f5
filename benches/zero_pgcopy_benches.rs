use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use zero_pgcopy::copy::line::{decode_copy_line, escape_field_into};
use zero_pgcopy::encoding::EncodingGroup;
use zero_pgcopy::RowBuffer;

fn make_line(fields: usize, field_len: usize) -> Vec<u8> {
    let mut line = Vec::new();
    for i in 0..fields {
        if i > 0 {
            line.push(b'\t');
        }
        for j in 0..field_len {
            line.push(b'a' + ((i + j) % 26) as u8);
        }
    }
    line
}

fn bench_decode(c: &mut Criterion) {
    let line = make_line(10, 40);
    let mut group = c.benchmark_group("decode_copy_line");
    for enc in [EncodingGroup::Monobyte, EncodingGroup::Utf8, EncodingGroup::Sjis] {
        let scanner = enc.scanner();
        let mut row = RowBuffer::new();
        group.bench_function(enc.name(), |b| {
            b.iter(|| {
                decode_copy_line(scanner, black_box(&line), &mut row).unwrap();
                black_box(row.row().len())
            })
        });
    }
    group.finish();
}

fn bench_find_ascii_char(c: &mut Criterion) {
    // SJIS text interleaving two-byte characters whose trail bytes look
    // like backslashes, with one real tab near the end.
    let mut haystack = Vec::new();
    for _ in 0..200 {
        haystack.extend_from_slice(b"\x81\x5cab");
    }
    haystack.push(b'\t');
    let scanner = EncodingGroup::Sjis.scanner();
    c.bench_function("find_ascii_char/sjis", |b| {
        b.iter(|| {
            scanner
                .find_ascii_char(black_box(&haystack), b"\t\\", 0)
                .unwrap()
        })
    });
}

fn bench_escape(c: &mut Criterion) {
    let data = make_line(1, 200);
    let scanner = EncodingGroup::Utf8.scanner();
    let mut out = Vec::new();
    c.bench_function("escape_field_into", |b| {
        b.iter(|| {
            out.clear();
            escape_field_into(scanner, black_box(&data), &mut out).unwrap();
            black_box(out.len())
        })
    });
}

criterion_group!(benches, bench_decode, bench_find_ascii_char, bench_escape);
criterion_main!(benches);
