use checkout::CheckoutOrchestrator;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CartLine, CategoryId, CustomerId, Money, Product};
use store::InMemoryStore;

fn seeded_orchestrator(
    rt: &tokio::runtime::Runtime,
    products: usize,
) -> CheckoutOrchestrator<InMemoryStore> {
    let store = InMemoryStore::new();
    rt.block_on(async {
        for i in 0..products {
            store
                .insert_product(Product::new(
                    format!("SKU-{i:04}"),
                    "Widget",
                    Money::from_cents(999 + i as i64),
                    u32::MAX,
                    CategoryId::new("general"),
                ))
                .await;
        }
    });
    CheckoutOrchestrator::new(store)
}

fn bench_checkout_single_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let orchestrator = seeded_orchestrator(&rt, 1);
    let lines = vec![CartLine::new("SKU-0000", 1)];

    c.bench_function("checkout/single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                orchestrator
                    .checkout(CustomerId::new(), "1 Main St", &lines)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_checkout_ten_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let orchestrator = seeded_orchestrator(&rt, 10);
    let lines: Vec<CartLine> = (0..10)
        .rev()
        .map(|i| CartLine::new(format!("SKU-{i:04}"), 2))
        .collect();

    c.bench_function("checkout/ten_lines_reverse_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                orchestrator
                    .checkout(CustomerId::new(), "1 Main St", &lines)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_checkout_single_line, bench_checkout_ten_lines);
criterion_main!(benches);
