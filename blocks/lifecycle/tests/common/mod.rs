#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use brigade_atoms::store::memory::{MemoryObjectStore, MemoryStore};
use brigade_atoms::store::DataStore;
use brigade_atoms::time::{Clock, ManualClock};
use brigade_atoms::users::model::{CreateUserPayload, Role};
use brigade_atoms::users::service::create_user;
use lifecycle_block::{EngineConfig, LifecycleEngine};

pub const COMPANY: &str = "c1";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub engine: LifecycleEngine,
}

/// Engine over a fresh memory store with a manager (`m1`) and two
/// employees (`u1`, `u2`) seeded. Clock starts 2024-05-01 09:00 UTC.
pub async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    ));

    for (id, name, role) in [
        ("m1", "Mika", Role::Manager),
        ("u1", "Sam", Role::Employee),
        ("u2", "Ava", Role::Employee),
    ] {
        create_user(
            store.as_ref(),
            clock.as_ref(),
            id,
            CreateUserPayload {
                user_name: name.to_string(),
                company_id: COMPANY.to_string(),
                role,
            },
        )
        .await
        .unwrap();
    }

    let data: Arc<dyn DataStore> = store.clone();
    let time: Arc<dyn Clock> = clock.clone();
    let engine = LifecycleEngine::spawn(
        data,
        Arc::new(MemoryObjectStore::new()),
        time,
        EngineConfig::default(),
        COMPANY,
    )
    .await
    .unwrap();

    Harness {
        store,
        clock,
        engine,
    }
}

/// Poll until `check` holds or ~1s passes; feed application is
/// asynchronous relative to commands.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
