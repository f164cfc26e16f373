use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use uuid::Uuid;
use wallet_eng::{Currency, Money, Wallet};

fn usd(amount: i64) -> Money {
    Money::new(Decimal::from(amount), Currency::USD)
}

/// Deposit + approve cycles: the staged funding path.
fn bench_staged_deposits(c: &mut Criterion) {
    let mut group = c.benchmark_group("staged_deposits");

    for count in [1_000u32, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut wallet = Wallet::new(Uuid::new_v4(), Currency::USD);
                for _ in 0..count {
                    let id = wallet.deposit(usd(100), None, None).unwrap();
                    wallet.approve_deposit(id, "ops").unwrap();
                }
                black_box(wallet)
            });
        });
    }

    group.finish();
}

/// Reserve + settle cycles: the two-phase purchase path.
fn bench_reservations(c: &mut Criterion) {
    let mut group = c.benchmark_group("reservations");

    for count in [1_000u32, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("reserve_complete", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut wallet = Wallet::new(Uuid::new_v4(), Currency::USD);
                    let id = wallet.deposit(usd(1_000_000), None, None).unwrap();
                    wallet.approve_deposit(id, "ops").unwrap();
                    for _ in 0..count {
                        let ticket = wallet
                            .reserve_for_purchase(usd(60), usd(5), "bench", "ACME", "card")
                            .unwrap();
                        wallet.complete_purchase(ticket.reservation, "ops").unwrap();
                    }
                    black_box(wallet)
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("reserve_cancel", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut wallet = Wallet::new(Uuid::new_v4(), Currency::USD);
                    let id = wallet.deposit(usd(1_000_000), None, None).unwrap();
                    wallet.approve_deposit(id, "ops").unwrap();
                    for _ in 0..count {
                        let ticket = wallet
                            .reserve_for_purchase(usd(60), usd(5), "bench", "ACME", "card")
                            .unwrap();
                        wallet
                            .cancel_purchase(ticket.reservation, "released", "ops")
                            .unwrap();
                    }
                    black_box(wallet)
                });
            },
        );
    }

    group.finish();
}

/// Instant spends against a funded wallet.
fn bench_instant_spends(c: &mut Criterion) {
    let mut group = c.benchmark_group("instant_spends");

    for count in [10_000u32, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut wallet = Wallet::new(Uuid::new_v4(), Currency::USD);
                let id = wallet
                    .deposit(usd(count as i64 * 10), None, None)
                    .unwrap();
                wallet.approve_deposit(id, "ops").unwrap();
                for i in 0..count {
                    if i % 2 == 0 {
                        wallet.withdraw(usd(3), None).unwrap();
                    } else {
                        wallet.charge_service_fee(usd(1), "bench fee").unwrap();
                    }
                }
                black_box(wallet)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_staged_deposits,
    bench_reservations,
    bench_instant_spends
);
criterion_main!(benches);
