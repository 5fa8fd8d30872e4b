use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use svf_protocol::{
    RegisterName, ShiftSpec, TapState,
    codec::{from_hex, to_hex},
    tap::RouteTable,
};

fn build_routes(c: &mut Criterion) {
    c.bench_function("route table build", |b| {
        b.iter(|| RouteTable::build().unwrap())
    });

    let table = RouteTable::build().unwrap();
    c.bench_function("route lookup", |b| {
        b.iter(|| {
            table
                .route_to_stable(black_box(TapState::IrPause), black_box(TapState::DrShift))
                .unwrap()
                .len()
        })
    });
}

fn patterns(c: &mut Criterion) {
    let text = "DEADBEEF".repeat(512);
    c.bench_function("hex decode 2 KiB", |b| b.iter(|| from_hex(black_box(&text)).unwrap()));

    let bytes = vec![0xA5_u8; 2048];
    c.bench_function("hex encode 2 KiB", |b| b.iter(|| to_hex(black_box(&bytes))));

    let delta = ShiftSpec::new(2048 * 8).with_tdi(bytes.clone()).with_mask(bytes.clone());
    c.bench_function("register merge 2 KiB", |b| {
        b.iter(|| {
            let mut sdr = ShiftSpec::default();
            sdr.merge(black_box(&delta), RegisterName::Sdr).unwrap();
            sdr
        })
    });
}

criterion_group!(benches, build_routes, patterns);
criterion_main!(benches);
