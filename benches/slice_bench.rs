//! Criterion benchmark untuk Slice, adapters, dan loop step
//!
//! Run dengan: cargo bench

use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use uscall::hook::{loop_step, HandleRegistry, LoopParams};
use uscall::network::{read_slice, write_cslice, OsBackend};
use uscall::{Slice, SliceBuf, StorageKind};

fn bench_slice(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice");

    for capacity in [64u32, 1024, 65536].iter() {
        group.throughput(Throughput::Bytes(*capacity as u64));

        group.bench_function(format!("allocate_heap_{}", capacity), |b| {
            b.iter(|| Slice::allocate(black_box(*capacity)).unwrap());
        });

        group.bench_function(format!("reset_{}", capacity), |b| {
            let mut slice = Slice::allocate(*capacity).unwrap();
            b.iter(|| {
                slice.set_len(black_box(*capacity));
                slice.reset();
            });
        });
    }

    group.bench_function("allocate_mapped_65536", |b| {
        b.iter(|| Slice::allocate_with(StorageKind::Mapped, black_box(65536)).unwrap());
    });

    group.bench_function("derive_child", |b| {
        let parent = Slice::allocate(4096).unwrap();
        b.iter(|| {
            let child = parent.child(black_box(512), black_box(1024)).unwrap();
            black_box(child.capacity())
        });
    });

    group.finish();
}

fn bench_adapters(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapters");

    for size in [64usize, 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        // write_cslice → peer read → peer write → read_slice
        group.bench_function(format!("socketpair_round_trip_{}", size), |b| {
            let (mut peer, local) = UnixStream::pair().unwrap();
            let fd = local.as_raw_fd();

            let out = Slice::with_len(*size as u32, *size as u32).unwrap();
            let mut input = Slice::allocate(*size as u32).unwrap();
            let mut scratch = vec![0u8; *size];

            b.iter(|| {
                write_cslice(&OsBackend, fd, &out).unwrap();
                peer.read_exact(&mut scratch).unwrap();
                peer.write_all(&scratch).unwrap();

                input.set_len(0);
                while input.len() < *size as u32 {
                    read_slice(&OsBackend, fd, &mut input).unwrap();
                }
                black_box(input.len())
            });
        });
    }

    group.finish();
}

fn bench_loop_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop_step");
    group.throughput(Throughput::Elements(1));

    group.bench_function("empty_handles", |b| {
        let params = LoopParams::default();
        let mut registry = HandleRegistry::new();
        b.iter(|| loop_step(black_box(&params), &mut registry));
    });

    group.bench_function("bound_handles", |b| {
        let mut registry = HandleRegistry::new();
        let mut params = LoopParams::default();
        params.bind_begin(&mut registry, || 0);
        params.bind_end(&mut registry, || 0);
        params.bind_proc(&mut registry, || 0);

        b.iter(|| loop_step(black_box(&params), &mut registry));
    });

    group.finish();
}

criterion_group!(benches, bench_slice, bench_adapters, bench_loop_step);
criterion_main!(benches);
