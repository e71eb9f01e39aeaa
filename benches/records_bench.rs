use chrono::NaiveDate;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};

use sensorlink::model::{LogRecord, Payload, PeerOutcome, SensorReading, TelemetryResponse};
use sensorlink::{servant, wire};

fn poll_rows(peers: u8) -> String {
    let taken_at = NaiveDate::from_ymd_opt(2025, 8, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let mut text = String::new();
    for peer in 1..=peers {
        // every other unit is out of range
        let outcome = if peer % 2 == 1 {
            PeerOutcome::Delivered(SensorReading {
                peer,
                values: servant::synthetic(peer, 0),
                taken_at,
            })
        } else {
            PeerOutcome::Unavailable
        };
        for record in LogRecord::for_outcome(taken_at, peer, &outcome) {
            text.push_str(&record.to_string());
            text.push('\n');
        }
    }
    text
}

fn bench_records(c: &mut Criterion) {
    for peers in [4u8, 32] {
        c.bench_with_input(BenchmarkId::new("format_poll", peers), &peers, |b, &p| {
            b.iter(|| poll_rows(p))
        });
    }

    let frame = wire::encode_response(&TelemetryResponse {
        action: wire::ActionKind::SensorData,
        payload: Payload::Readings(servant::synthetic(1, 0)),
    });
    c.bench_function("decode_sensor_frame", |b| b.iter(|| wire::decode(&frame)));
}

criterion_group!(benches, bench_records);
criterion_main!(benches);
