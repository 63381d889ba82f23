//! Benchmarks for line decoding and event parsing.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio_util::codec::Decoder;

use perch_irc::{parse_line, LineCodec};

/// Simple PING line
const SIMPLE_PING: &str = "PING :irc.example.org";

/// Channel message from a full prefix
const PRIVMSG: &str = ":nick!user@host PRIVMSG #channel :Hello, world!";

/// NAMES reply with mode glyphs
const NAMES_REPLY: &str = ":irc.server.net 353 perch = #channel :@oper +voiced plain another @second";

/// Per-user mode delta
const USER_MODES: &str = ":oper!o@host MODE #channel +ov nick1 nick2";

/// Welcome numeric
const WELCOME: &str = ":irc.server.net 001 perch :Welcome to the IRC Network perch!user@host";

fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Event Parsing");

    group.bench_function("simple_ping", |b| {
        b.iter(|| black_box(parse_line(black_box(SIMPLE_PING), "perch")))
    });

    group.bench_function("privmsg", |b| {
        b.iter(|| black_box(parse_line(black_box(PRIVMSG), "perch")))
    });

    group.bench_function("names_reply", |b| {
        b.iter(|| black_box(parse_line(black_box(NAMES_REPLY), "perch")))
    });

    group.bench_function("user_modes", |b| {
        b.iter(|| black_box(parse_line(black_box(USER_MODES), "perch")))
    });

    group.bench_function("welcome_numeric", |b| {
        b.iter(|| black_box(parse_line(black_box(WELCOME), "perch")))
    });

    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("Line Codec");

    let burst: Vec<u8> = std::iter::repeat(format!("{PRIVMSG}\r\n"))
        .take(50)
        .collect::<String>()
        .into_bytes();

    group.bench_function("utf8_burst", |b| {
        let mut codec = LineCodec::new();
        b.iter(|| {
            let mut buf = BytesMut::from(&burst[..]);
            while let Ok(Some(line)) = codec.decode(&mut buf) {
                black_box(line);
            }
        })
    });

    let latin1 = b"PRIVMSG #channel :caf\xe9 au lait\r\n".to_vec();
    group.bench_function("latin1_fallback", |b| {
        let mut codec = LineCodec::new();
        b.iter(|| {
            let mut buf = BytesMut::from(&latin1[..]);
            black_box(codec.decode(&mut buf).unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_parsing, benchmark_codec);
criterion_main!(benches);
