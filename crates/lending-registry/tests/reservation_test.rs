//! Integration tests for reservation races and auto-expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;

use lending_core::error::ErrorKind;
use lending_core::types::id::{ItemId, MemberId};
use lending_entity::item::{ItemStatus, NewItem};
use lending_entity::member::NewMember;
use lending_registry::{LibraryManager, Registry, seed_sample_data};

const TTL: Duration = Duration::from_secs(5);

async fn seeded() -> Registry {
    let registry = Registry::new(TTL);
    seed_sample_data(&registry).await;
    registry
}

fn item(id: u64) -> ItemId {
    ItemId::new(id)
}

fn member(id: u64) -> MemberId {
    MemberId::new(id)
}

async fn race_reservations(contenders: u64) {
    let registry = Registry::new(TTL);
    registry.add_item(NewItem::new(7, "Contested", "Anon")).await;
    for id in 0..contenders {
        registry
            .add_member(NewMember::new(100 + id, format!("SimMember-{}", 100 + id)))
            .await
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(contenders as usize));
    let handles = (0..contenders).map(|id| {
        let registry = registry.clone();
        let barrier = Arc::clone(&barrier);
        tokio::spawn(async move {
            barrier.wait().await;
            registry.reserve(item(7), member(100 + id)).await
        })
    });

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind == ErrorKind::Conflict))
        .count();
    assert_eq!(winners, 1, "exactly one reservation must win");
    assert_eq!(conflicts as u64, contenders - 1);

    let holder = registry.get_item(item(7)).await.unwrap().reserved_by();
    assert!(holder.is_some());
    assert_eq!(registry.stats().await.pending_expiries, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_contenders_one_winner() {
    race_reservations(2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_five_contenders_one_winner() {
    race_reservations(5).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_twenty_contenders_one_winner() {
    race_reservations(20).await;
}

#[tokio::test]
async fn test_reserve_conflict_then_borrow_scenario() {
    let registry = seeded().await;

    registry.reserve(item(1), member(1)).await.unwrap();
    let err = registry.reserve(item(1), member(2)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    registry.borrow(item(1), member(1)).await.unwrap();

    let available = registry.list_available().await;
    assert!(available.iter().all(|i| i.id != item(1)));

    let borrowed = registry.list_borrowed_by(member(1)).await.unwrap();
    assert_eq!(borrowed.len(), 1);
    assert_eq!(borrowed[0].id, item(1));
    assert_eq!(borrowed[0].title, "1984");
}

#[tokio::test(start_paused = true)]
async fn test_unconverted_reservation_expires() {
    let registry = seeded().await;

    registry.reserve(item(1), member(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(
        registry.get_item(item(1)).await.unwrap().reserved_by(),
        Some(member(1)),
        "reservation must survive until the TTL elapses"
    );

    tokio::time::sleep(Duration::from_secs(2)).await;

    let available = registry.list_available().await;
    let restored = available.iter().find(|i| i.id == item(1)).unwrap();
    assert!(!restored.is_reserved());

    let stats = registry.stats().await;
    assert_eq!(stats.reserved, 0);
    assert_eq!(stats.pending_expiries, 0);

    registry.reserve(item(1), member(2)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_borrow_before_expiry_survives_timer() {
    let registry = seeded().await;

    registry.reserve(item(1), member(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    registry.borrow(item(1), member(1)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    let borrowed = registry.get_item(item(1)).await.unwrap();
    assert_eq!(borrowed.status, ItemStatus::Borrowed);
    assert_eq!(
        registry.list_borrowed_by(member(1)).await.unwrap()[0].id,
        item(1)
    );
}

#[tokio::test(start_paused = true)]
async fn test_old_timer_does_not_cut_new_cycle_short() {
    let registry = seeded().await;

    registry.reserve(item(2), member(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    registry.cancel_reservation(item(2), member(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    registry.reserve(item(2), member(1)).await.unwrap();

    // First cycle would have fired at t=5; the second fires at t=8.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(
        registry.get_item(item(2)).await.unwrap().reserved_by(),
        Some(member(1))
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!registry.get_item(item(2)).await.unwrap().is_reserved());
}

#[tokio::test(start_paused = true)]
async fn test_return_does_not_revive_reservation() {
    let registry = seeded().await;

    registry.reserve(item(3), member(2)).await.unwrap();
    registry.borrow(item(3), member(2)).await.unwrap();
    registry.return_item(item(3), member(2)).await.unwrap();

    let returned = registry.get_item(item(3)).await.unwrap();
    assert!(returned.is_available());
    assert!(!returned.is_reserved());

    tokio::time::sleep(Duration::from_secs(6)).await;
    registry.reserve(item(3), member(1)).await.unwrap();
}
