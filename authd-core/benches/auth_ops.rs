//! Benchmarks for the hot cryptographic operations

use authd_core::testutil::*;
use authd_core::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;

fn bench_hash_password(c: &mut Criterion) {
    c.bench_function("hash_password", |b| {
        b.iter(|| hash_password(black_box("testpasswd"), black_box("authID")))
    });
}

fn bench_digest_compare(c: &mut Criterion) {
    let stored = hash_password("testpasswd", "authID");
    let supplied = hash_password("testpasswd", "authID");

    c.bench_function("digest_compare", |b| {
        b.iter(|| black_box(&supplied).matches(black_box(&stored)))
    });
}

fn bench_issue(c: &mut Criterion) {
    let authority = TokenAuthority::new(Arc::new(test_key_manager()));
    let subject = UserId::new("authID").unwrap();

    c.bench_function("token_issue", |b| {
        b.iter(|| authority.issue(black_box(&subject), Duration::from_secs(3600)))
    });
}

fn bench_verify(c: &mut Criterion) {
    let authority = TokenAuthority::new(Arc::new(test_key_manager()));
    let subject = UserId::new("authID").unwrap();
    let token = authority.issue(&subject, Duration::from_secs(3600)).unwrap();

    c.bench_function("token_verify", |b| {
        b.iter(|| authority.verify(black_box(&token)))
    });
}

criterion_group!(
    benches,
    bench_hash_password,
    bench_digest_compare,
    bench_issue,
    bench_verify
);
criterion_main!(benches);
