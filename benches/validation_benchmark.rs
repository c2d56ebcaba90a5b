use account_api::user::Lookup;
use account_api::validation::{DEFAULT_BLOCKLIST, Validator};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn username_benchmark(c: &mut Criterion) {
    let validator = Validator::new(DEFAULT_BLOCKLIST);

    c.bench_function("username valid", |b| {
        b.iter(|| validator.username(black_box("maker_2014")))
    });
    c.bench_function("username reserved character", |b| {
        b.iter(|| validator.username(black_box("maker.2014")))
    });
}

fn lookup_benchmark(c: &mut Criterion) {
    c.bench_function("classify email token", |b| {
        b.iter(|| Lookup::candidates(black_box("abc1@email.com")))
    });
    c.bench_function("classify id token", |b| {
        b.iter(|| {
            Lookup::candidates(black_box("67e55044-10b1-426f-9247-bb680e5fe0c8"))
        })
    });
}

criterion_group!(benches, username_benchmark, lookup_benchmark);
criterion_main!(benches);
