use std::io::Cursor;

use criterion::{
    black_box, criterion_group, criterion_main, Criterion, Throughput,
};
use imagesupply::{ByteSupply, Pulled, StreamEnd, StreamOptions};

fn generate_image_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Streams `data` through a supply and pulls until the sentinel,
/// returning how many bytes came through.
fn fetch_and_pull(data: Vec<u8>, chunk_size: usize) -> usize {
    let mut supply = ByteSupply::start_with(
        Cursor::new(data),
        StreamOptions {
            chunk_size,
            expected_len: None,
        },
    )
    .expect("the cursor always has bytes");

    let mut total = 0;
    loop {
        match supply.pull() {
            Pulled::Bytes(chunk) => total += chunk.len(),
            Pulled::Empty => std::hint::spin_loop(),
            Pulled::Finished(StreamEnd::Clean) => return total,
            Pulled::Finished(StreamEnd::Failed(e)) => {
                panic!("stream failed: {}", e)
            }
        }
    }
}

fn stream_throughput(c: &mut Criterion) {
    let inputs = [
        ("stream_small", 64 * 1024),
        ("stream_medium", 1024 * 1024),
        ("stream_large", 8 * 1024 * 1024),
    ];

    for (name, size) in inputs.iter() {
        let data = generate_image_data(*size);
        let mut group = c.benchmark_group(name.to_string());
        group.throughput(Throughput::Bytes(*size as u64));
        group.measurement_time(std::time::Duration::from_secs(5));

        group.bench_function("fetch_and_pull", move |b| {
            b.iter(|| fetch_and_pull(black_box(data.clone()), 4096));
        });

        group.finish();
    }
}

criterion_group!(benches, stream_throughput);
criterion_main!(benches);
