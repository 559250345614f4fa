use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use common::StoreId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    CapacityConstraint, InboundLot, InventorySnapshot, ScopeKey, Sku, StoreDemand, StoreInventory,
};
use engine::{CancellationToken, CapacityLedger, CrossDock, EngineConfig, ReceiptInspection, RuleEngine};
use repository::{
    CapacityRepository, CatalogRepository, DemandRepository, InMemoryCapacityRepository,
    InMemoryRepositories,
};

const SKU: &str = "SKU-5892";

fn demands(count: u32) -> Vec<StoreDemand> {
    (0..count)
        .map(|i| {
            StoreDemand::new(
                format!("ORD-{i:04}"),
                SKU,
                format!("ST-{:03}", i % 40),
                10 + i % 15,
                Utc::now() + ChronoDuration::days(i64::from(i % 14)),
                (i % 5) as u8 + 1,
            )
        })
        .collect()
}

async fn seeded_dock(stores: u32) -> (InMemoryRepositories, CrossDock) {
    let repos = InMemoryRepositories::new();
    let dock = CrossDock::new((&repos).into(), EngineConfig::default()).unwrap();

    repos
        .catalog
        .upsert_sku(Sku::new(SKU, "Premium Widget XL", "Widgets"))
        .await
        .unwrap();
    repos
        .capacity
        .register(CapacityConstraint::new(
            "CAP-STORAGE",
            ScopeKey::storage("STORAGE-MAIN"),
            u32::MAX,
        ))
        .await
        .unwrap();
    for i in 0..stores {
        let store = StoreId::new(format!("ST-{i:03}"));
        repos
            .capacity
            .register(CapacityConstraint::new(
                format!("CAP-{store}"),
                ScopeKey::outbound_lane(&store),
                500,
            ))
            .await
            .unwrap();
    }
    for demand in demands(stores * 5) {
        repos.demands.create(demand).await.unwrap();
    }
    (repos, dock)
}

fn bench_rule_evaluation(c: &mut Criterion) {
    let engine = RuleEngine::default();
    let sku = Sku::new(SKU, "Premium Widget XL", "Widgets");
    let lot = InboundLot::arrived("LOT-BENCH", SKU, 240, "DOCK-1", Utc::now());
    let demands = demands(500);
    let inventory: InventorySnapshot = (0..40)
        .map(|i| StoreInventory {
            store: StoreId::new(format!("ST-{i:03}")),
            sku: SKU.into(),
            on_hand: i * 3,
            weekly_forecast: 40.0,
            target_weeks_of_supply: 2.0,
        })
        .collect();

    c.bench_function("engine/evaluate_500_demands", |b| {
        b.iter(|| {
            engine
                .evaluate(&lot, Some(&sku), &demands, &inventory, Utc::now())
                .unwrap()
        });
    });
}

fn bench_reserve(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let repo = InMemoryCapacityRepository::new();
    let scope = ScopeKey::storage("STORAGE-MAIN");
    rt.block_on(async {
        repo.register(CapacityConstraint::new("CAP-STORAGE", scope.clone(), u32::MAX))
            .await
            .unwrap();
    });
    let ledger = CapacityLedger::new(Arc::new(repo), Duration::from_secs(2), 3);

    c.bench_function("engine/reserve_and_release", |b| {
        b.iter(|| {
            rt.block_on(async {
                let granted = ledger.reserve_up_to(&scope, 12).await.unwrap();
                ledger.release(&scope, granted).await.unwrap();
            });
        });
    });
}

fn bench_process_lot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("engine/receive_and_process_lot", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (_repos, dock) = seeded_dock(40).await;
                let outcome = dock
                    .receive(ReceiptInspection::clean("LOT-BENCH", SKU, 240, "DOCK-1"))
                    .await
                    .unwrap();
                dock.process_lot(&outcome.lot.id, Utc::now(), &CancellationToken::new())
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_rule_evaluation, bench_reserve, bench_process_lot);
criterion_main!(benches);
