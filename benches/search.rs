//! Benchmarks for the resumable search engines

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hashcrack::hash::Digest;
use hashcrack::hint::HintSolver;
use hashcrack::password::PasswordSolver;
use hashcrack::permutation::HeapPermutations;
use std::time::Duration;

fn bench_digest(c: &mut Criterion) {
    let candidate: Vec<char> = "GGGFGFFFFG".chars().collect();
    let mut scratch = String::new();

    c.bench_function("digest_of_chars", |b| {
        b.iter(|| Digest::of_chars(black_box(&candidate), &mut scratch))
    });
}

fn bench_permutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_permutations");

    for n in [5usize, 7, 8] {
        let total: u64 = (1..=n as u64).product();
        group.throughput(Throughput::Elements(total));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut cursor = HeapPermutations::new(('A'..).take(n).collect::<Vec<char>>());
                let mut count = 0u64;
                while let Some(p) = cursor.next_permutation() {
                    black_box(p);
                    count += 1;
                }
                count
            });
        });
    }

    group.finish();
}

fn bench_hint_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("hint_solver");
    group.sample_size(10);

    for n in [5usize, 6, 7] {
        let alphabet: Vec<char> = ('A'..).take(n).collect();
        // Worst case: the last character is the one left out.
        let hint: String = alphabet[..n - 1].iter().rev().collect();
        let target = Digest::of(&hint);

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut solver = HintSolver::new(&alphabet, [(0, target)]);
                solver.solve()
            });
        });
    }

    group.finish();
}

fn bench_password_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("password_solver");
    group.sample_size(10);

    for (alphabet, length) in [("FG", 10usize), ("ABC", 8), ("ABCD", 7)] {
        let alphabet: Vec<char> = alphabet.chars().collect();
        let last: String = std::iter::repeat(alphabet[alphabet.len() - 1])
            .take(length)
            .collect();
        let target = Digest::of(&last);
        let space = (alphabet.len() as u64).pow(length as u32);
        group.throughput(Throughput::Elements(space));

        group.bench_with_input(
            BenchmarkId::new("full_scan", format!("{}^{}", alphabet.len(), length)),
            &length,
            |b, &length| {
                b.iter(|| {
                    let mut solver = PasswordSolver::new(&alphabet, length, target);
                    solver.solve()
                });
            },
        );
    }

    group.finish();
}

fn bench_time_slicing(c: &mut Criterion) {
    let alphabet: Vec<char> = "ABCD".chars().collect();
    let target = Digest::of("DDDDDDD");

    c.bench_function("password_solver_1ms_slices", |b| {
        b.iter(|| {
            let mut solver = PasswordSolver::new(&alphabet, 7, target);
            let mut slices = 0u32;
            while solver.resume(Duration::from_millis(1)).is_yielded() {
                slices += 1;
            }
            slices
        });
    });
}

criterion_group!(
    benches,
    bench_digest,
    bench_permutations,
    bench_hint_solver,
    bench_password_solver,
    bench_time_slicing
);
criterion_main!(benches);
