#[macro_use]
extern crate criterion;

use criterion::Criterion;

extern crate chrono;
extern crate meterbuf;

use chrono::{TimeZone, Utc};
use meterbuf::consumer::Consumer;
use meterbuf::metric::{Metric, Reading};
use meterbuf::producer::{Producer, ProducerConfig};

fn experiment(metrics: &[Metric]) {
    let consumer = Consumer::new();
    let (snd, handle) = consumer.spawn();
    for m in metrics {
        snd.send(m.clone()).unwrap();
    }
    drop(snd);
    handle.join().unwrap();
    assert_eq!(8, consumer.flush().len());
}

fn benchmark(c: &mut Criterion) {
    let producer = Producer::new(ProducerConfig {
        metric_prefix: "bench".into(),
        metric_tags: vec!["env:bench".into()],
        ..Default::default()
    });
    let mut metrics = Vec::new();
    for sec in 0..128i64 {
        for series in 0..8 {
            let ts = Utc.timestamp(sec / 2, 0);
            metrics.push(producer.produce(
                &format!("series.{}", series),
                Reading::at(ts, sec as f64),
                vec![],
            ));
        }
    }

    c.bench_function("consume_merge", move |b| {
        b.iter(|| experiment(&metrics));
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
