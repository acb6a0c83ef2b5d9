//! Benchmarks for metadata decoding and context construction.
//!
//! Uses a synthetic application of a few hundred types, each with fields, methods and one
//! generic method instantiated for several argument types:
//! - Decoding the metadata blob
//! - Building the structural graph only
//! - Building the full graph with concrete generic methods and the address index
//! - Looking up types and methods in a built graph

extern crate il2scope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use il2scope::{
    metadata::MethodAttributes,
    prelude::*,
    test::MetadataBuilder,
};
use std::hint::black_box;

const TYPES: usize = 400;

fn synthetic_application() -> MetadataBuilder {
    let mut builder = MetadataBuilder::new(MetadataVersion::new(29.0));
    let corlib = builder.corlib();
    let game = builder.assembly("Game", "Game.dll");

    let types: Vec<i32> = (0..TYPES)
        .map(|index| builder.type_def(game, "Game.Entities", &format!("Entity{index}")))
        .collect();
    let (containers, parameters): (Vec<_>, Vec<_>) = (0..TYPES)
        .map(|_| builder.method_generic_parameters(&["T"]))
        .unzip();

    let flags = (MethodAttributes::PUBLIC | MethodAttributes::STATIC).bits();
    let arguments = [corlib.int32, corlib.string, corlib.object, corlib.double];

    for (index, &ty) in types.iter().enumerate() {
        builder.set_parent(ty, corlib.object);
        let t = builder.generic_parameter_type(parameters[index][0]);

        let update = builder.method(ty, "Update", &[("delta", corlib.single)]);
        builder.method(ty, "Reset", &[]);
        let convert = builder.method_full(ty, "Convert", t, &[("value", t)], flags, containers[index]);

        let body = builder.code_block(&[0x55, 0x48, 0x89, 0xE5, 0x5D, 0xC3]);
        builder.method_pointer(update, body);
        for &argument in &arguments {
            let shared = builder.code_block(&[0x48, 0x89, 0xC8, 0xC3]);
            builder.method_spec(convert, &[], &[argument], shared);
        }

        builder.field(ty, "id", corlib.int32, 0);
        builder.field(ty, "name", corlib.string, 0);
    }
    builder
}

fn bench_metadata_decode(c: &mut Criterion) {
    let builder = synthetic_application();
    let data = builder.encode();

    let mut group = c.benchmark_group("metadata");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| {
            let metadata =
                GlobalMetadata::from_mem(black_box(data.clone()), Some(builder.version())).unwrap();
            black_box(metadata)
        });
    });
    group.finish();
}

fn bench_context_build(c: &mut Criterion) {
    let builder = synthetic_application();

    let mut group = c.benchmark_group("context");
    group.sample_size(20);
    group.bench_function("build_minimal", |b| {
        b.iter(|| {
            let app = builder.build_context(LoadOptions::minimal()).unwrap();
            black_box(app)
        });
    });
    group.bench_function("build_full", |b| {
        b.iter(|| {
            let app = builder.build_context(LoadOptions::default()).unwrap();
            black_box(app)
        });
    });
    group.finish();
}

fn bench_lookups(c: &mut Criterion) {
    let app = synthetic_application()
        .build_context(LoadOptions::default())
        .unwrap();
    let game = app.get_assembly_by_name("Game").unwrap();
    let addresses = app.method_addresses();

    c.bench_function("type_by_full_name", |b| {
        b.iter(|| black_box(game.get_type_by_full_name(black_box("Game.Entities.Entity250"))));
    });

    c.bench_function("methods_by_address", |b| {
        b.iter(|| {
            for address in &addresses {
                black_box(app.methods_by_address(*address));
            }
        });
    });
}

criterion_group!(benches, bench_metadata_decode, bench_context_build, bench_lookups);
criterion_main!(benches);
