use checkout::CheckoutCoordinator;
use common::{Money, StoreId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::CartService;
use store::{Account, InMemoryStore, Product};

fn bench_checkout(c: &mut Criterion, name: &str, line_count: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let shop = StoreId::new();
    let products: Vec<Product> = (0..line_count)
        .map(|i| Product::new(shop, format!("product-{i}"), Money::from_cents(100), u32::MAX))
        .collect();
    let account = Account::new("bench", Money::from_units(1_000_000_000));

    rt.block_on(async {
        store.insert_account(account.clone()).await;
        for product in &products {
            store.insert_product(product.clone()).await;
        }
    });

    let carts = CartService::new(store.clone());
    let coordinator = CheckoutCoordinator::new(store);

    c.bench_function(name, |b| {
        b.iter(|| {
            rt.block_on(async {
                for product in &products {
                    carts.add_item(account.user_id, product.id, 1).await.unwrap();
                }
                coordinator.checkout(account.user_id).await.unwrap();
            });
        });
    });
}

fn bench_checkout_single_line(c: &mut Criterion) {
    bench_checkout(c, "checkout/single_line", 1);
}

fn bench_checkout_10_lines(c: &mut Criterion) {
    bench_checkout(c, "checkout/10_lines", 10);
}

criterion_group!(benches, bench_checkout_single_line, bench_checkout_10_lines);
criterion_main!(benches);
