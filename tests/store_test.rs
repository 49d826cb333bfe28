mod common;

use murmur::store::StoreError;

// ---------------------------------------------------------------------------
// append
// ---------------------------------------------------------------------------

#[tokio::test]
async fn append_twice_with_same_key_writes_one_row() {
    let state = common::test_state().await;
    let store = state.chat.store();
    let prefix = common::key_prefix();
    let key = format!("{prefix}-retry");

    let first = store.append(&key, "hello").await.expect("first append");
    assert_eq!(first.idempotency_key, key);
    assert_eq!(first.content, "hello");

    // A retried send reports DuplicateKey and mutates nothing, even with a
    // different payload.
    let second = store.append(&key, "hello again").await;
    assert_eq!(second.unwrap_err(), StoreError::DuplicateKey);

    let rows = store.read_from(first.id - 1).await.expect("read");
    let ours: Vec<_> = rows
        .iter()
        .filter(|m| m.idempotency_key.starts_with(&prefix))
        .collect();
    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0].content, "hello");

    common::cleanup_messages(&state.db, &prefix).await;
}

#[tokio::test]
async fn sequence_ids_are_strictly_increasing() {
    let state = common::test_state().await;
    let store = state.chat.store();
    let prefix = common::key_prefix();

    let mut last = 0;
    for i in 0..5 {
        let message = store
            .append(&format!("{prefix}-{i}"), &format!("msg {i}"))
            .await
            .expect("append");
        assert!(message.id > last, "ids must never decrease or repeat");
        last = message.id;
    }

    common::cleanup_messages(&state.db, &prefix).await;
}

#[tokio::test]
async fn duplicate_key_does_not_consume_a_sequence_slot_observable_order() {
    let state = common::test_state().await;
    let store = state.chat.store();
    let prefix = common::key_prefix();

    let a = store.append(&format!("{prefix}-a"), "a").await.expect("a");
    let _ = store.append(&format!("{prefix}-a"), "a retry").await;
    let b = store.append(&format!("{prefix}-b"), "b").await.expect("b");

    // Replay between the two real rows shows only the second; the rejected
    // retry left no row behind.
    let between: Vec<_> = store
        .read_from(a.id)
        .await
        .expect("read")
        .into_iter()
        .filter(|m| m.idempotency_key.starts_with(&prefix))
        .collect();
    assert_eq!(between.len(), 1);
    assert_eq!(between[0].id, b.id);

    common::cleanup_messages(&state.db, &prefix).await;
}

// ---------------------------------------------------------------------------
// read_from
// ---------------------------------------------------------------------------

#[tokio::test]
async fn read_from_returns_everything_after_the_offset_in_order() {
    let state = common::test_state().await;
    let store = state.chat.store();
    let prefix = common::key_prefix();

    let mut ids = Vec::new();
    for i in 0..5 {
        let message = store
            .append(&format!("{prefix}-{i}"), &format!("msg {i}"))
            .await
            .expect("append");
        ids.push(message.id);
    }

    // read_from(second id) yields exactly the last three, ascending.
    let tail: Vec<i64> = store
        .read_from(ids[1])
        .await
        .expect("read")
        .into_iter()
        .filter(|m| m.idempotency_key.starts_with(&prefix))
        .map(|m| m.id)
        .collect();
    assert_eq!(tail, ids[2..].to_vec());

    // read_from(last id) yields nothing of ours.
    let empty: Vec<i64> = store
        .read_from(ids[4])
        .await
        .expect("read")
        .into_iter()
        .filter(|m| m.idempotency_key.starts_with(&prefix))
        .map(|m| m.id)
        .collect();
    assert!(empty.is_empty());

    common::cleanup_messages(&state.db, &prefix).await;
}

#[tokio::test]
async fn read_from_is_a_restartable_snapshot() {
    let state = common::test_state().await;
    let store = state.chat.store();
    let prefix = common::key_prefix();

    let first = store
        .append(&format!("{prefix}-1"), "one")
        .await
        .expect("append");

    let scan1: Vec<i64> = store
        .read_from(first.id - 1)
        .await
        .expect("read")
        .into_iter()
        .filter(|m| m.idempotency_key.starts_with(&prefix))
        .map(|m| m.id)
        .collect();
    assert_eq!(scan1, vec![first.id]);

    // A later scan from the same offset sees the newer state of the log.
    let second = store
        .append(&format!("{prefix}-2"), "two")
        .await
        .expect("append");
    let scan2: Vec<i64> = store
        .read_from(first.id - 1)
        .await
        .expect("read")
        .into_iter()
        .filter(|m| m.idempotency_key.starts_with(&prefix))
        .map(|m| m.id)
        .collect();
    assert_eq!(scan2, vec![first.id, second.id]);

    common::cleanup_messages(&state.db, &prefix).await;
}
