use crate::{
    document::{CollectionSchema, DerivedField, Document},
    profile::{DistributionSnapshot, Profiler},
    random::{RandomSource, SeededRandom},
    store::MemoryStore,
    value::Timestamp,
};

const COUNTRIES: [&str; 8] = ["PT", "PT", "PT", "ES", "ES", "FR", "DE", "IT"];
const PLANS: [&str; 4] = ["free", "free", "pro", "team"];
const DOMAINS: [&str; 3] = ["mail.org", "corp.org", "uni.org"];

/// Schema of the `users` fixture collection.
pub(crate) fn users_schema() -> CollectionSchema {
    CollectionSchema::new("users")
        .numeric("age")
        .numeric("score")
        .categorical("country")
        .categorical("plan")
        .derived(DerivedField::new("email_domain", "email", "@", 1))
        .boolean("active")
        .timestamp("created")
}

/// Deterministic `users` collection of `n` documents.
pub(crate) fn users_fixture(n: usize) -> MemoryStore {
    let mut rng = SeededRandom::new(0x5eed);
    let docs = (0..n).map(|i| {
        Document::new(format!("u{i:06}"))
            .with("age", 18 + rng.below(63) as i64)
            .with("score", rng.next_f64() * 1_000.0)
            .with("country", COUNTRIES[rng.below(COUNTRIES.len())])
            .with("plan", PLANS[rng.below(PLANS.len())])
            .with("active", rng.chance(0.7))
            .with("email", format!("u{i}@{}", DOMAINS[rng.below(DOMAINS.len())]))
            .with(
                "created",
                Timestamp::from_millis(1_600_000_000_000 + rng.below(1_000_000_000) as i64),
            )
    });

    let store = MemoryStore::new();
    store.insert_many("users", docs.collect::<Vec<_>>());
    store
}

/// `scores` collection whose only field is `score = i` for `i in 0..n`, so
/// any range matches exactly the integers it covers.
pub(crate) fn linear_fixture(n: usize) -> (MemoryStore, CollectionSchema) {
    let store = MemoryStore::new();
    store.insert_many(
        "scores",
        (0..n)
            .map(|i| Document::new(format!("s{i:06}")).with("score", i as f64))
            .collect::<Vec<_>>(),
    );

    (store, CollectionSchema::new("scores").numeric("score"))
}

/// Profile a fixture store directly.
pub(crate) async fn snapshot_for(store: &MemoryStore) -> DistributionSnapshot {
    let profiler = Profiler::new(store, users_schema());

    profiler
        .profile()
        .await
        .expect("fixture profile should succeed")
        .as_ref()
        .clone()
}
