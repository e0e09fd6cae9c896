use std::sync::Arc;

use cart::{CartStore, NewCartLine};
use common::{Identity, Money, ProductId, Size};
use criterion::{Criterion, criterion_group, criterion_main};
use local_store::InMemoryLocalStore;

fn line(product: i64, size: u32) -> NewCartLine {
    NewCartLine::new(
        ProductId::new(product),
        Size::new(size),
        format!("Product {product}"),
        format!("https://cdn.example/{product}.jpg"),
        Money::from_minor(100_000 + product),
    )
    .with_max_quantity(100)
}

fn bench_add_items(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("cart/add_100_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let storage = Arc::new(InMemoryLocalStore::new());
                let mut cart = CartStore::open(storage, Identity::Guest).await;
                for product in 1..=100 {
                    cart.add_item(line(product, 42)).await;
                }
            });
        });
    });
}

fn bench_total_price(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let storage = Arc::new(InMemoryLocalStore::new());
    let mut cart = rt.block_on(CartStore::open(storage, Identity::Guest));
    rt.block_on(async {
        for product in 1..=100 {
            cart.add_item(line(product, 42).with_quantity(3)).await;
        }
    });

    c.bench_function("cart/total_price_100_lines", |b| {
        b.iter(|| cart.total_price());
    });
}

fn bench_merge_existing_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let storage = Arc::new(InMemoryLocalStore::new());
    let mut cart = rt.block_on(CartStore::open(storage, Identity::Guest));
    rt.block_on(async {
        for product in 1..=100 {
            cart.add_item(line(product, 42)).await;
        }
    });

    c.bench_function("cart/merge_into_existing_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                cart.add_item(line(50, 42)).await;
            });
        });
    });
}

criterion_group!(
    benches,
    bench_add_items,
    bench_total_price,
    bench_merge_existing_line,
);
criterion_main!(benches);
