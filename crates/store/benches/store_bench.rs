use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CategoryId, CustomerId, Money, OrderAssembler, Product, ProductId, ReservedLine};
use store::{InMemoryStore, Store};

async fn seeded_store(products: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    for i in 0..products {
        store
            .insert_product(Product::new(
                format!("SKU-{i:04}"),
                "Widget",
                Money::from_cents(999),
                u32::MAX,
                CategoryId::new("general"),
            ))
            .await;
    }
    store
}

fn bench_lock_and_rollback(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(seeded_store(10));
    let ids: Vec<ProductId> = (0..10).map(|i| ProductId::new(format!("SKU-{i:04}"))).collect();

    c.bench_function("store/lock_10_rows_and_rollback", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut tx = store.begin().await.unwrap();
                tx.lock_products(&ids).await.unwrap();
                tx.rollback().await.unwrap();
            });
        });
    });
}

fn bench_full_write_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(seeded_store(3));
    let ids: Vec<ProductId> = (0..3).map(|i| ProductId::new(format!("SKU-{i:04}"))).collect();

    c.bench_function("store/reserve_3_lines_and_commit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut tx = store.begin().await.unwrap();
                tx.lock_products(&ids).await.unwrap();

                let mut reserved = Vec::with_capacity(ids.len());
                for id in &ids {
                    let p = tx.product_for_update(id).await.unwrap().unwrap();
                    tx.set_stock(id, p.stock - 1).await.unwrap();
                    reserved.push(ReservedLine::new(id.clone(), 1, p.unit_price));
                }

                let assembled =
                    OrderAssembler::assemble(CustomerId::new(), "1 Main St", &reserved).unwrap();
                tx.insert_order(&assembled.order).await.unwrap();
                tx.insert_order_lines(&assembled.lines).await.unwrap();
                tx.commit().await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_lock_and_rollback, bench_full_write_commit);
criterion_main!(benches);
