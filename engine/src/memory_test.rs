use super::*;
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn fresh_cell_holds_placeholder() {
    let cell = InMemoryCell::new();
    assert_eq!(cell.read().await.unwrap(), "{}");
}

#[tokio::test]
async fn cell_write_overwrites_and_notifies() {
    let cell = InMemoryCell::new();
    let mut changes = cell.changes();

    cell.write(r#"{"objects":[],"version":"1.0"}"#.to_string()).await.unwrap();
    assert_eq!(cell.read().await.unwrap(), r#"{"objects":[],"version":"1.0"}"#);

    let notified = timeout(Duration::from_millis(200), changes.recv())
        .await
        .expect("change notification timed out")
        .expect("change channel closed");
    assert_eq!(notified, r#"{"objects":[],"version":"1.0"}"#);
}

#[tokio::test]
async fn cell_last_write_wins() {
    let cell = InMemoryCell::new();
    cell.write("\"a\"".to_string()).await.unwrap();
    cell.write("\"b\"".to_string()).await.unwrap();
    assert_eq!(cell.read().await.unwrap(), "\"b\"");
}

#[tokio::test]
async fn board_store_round_trip() {
    let store = InMemoryBoardStore::new();
    let id = store.create_board("Planning", "{}").await;

    let record = store.fetch_board(id).await.unwrap().expect("board exists");
    assert_eq!(record.name, "Planning");
    assert_eq!(record.data, "{}");

    store.update_board_data(id, r#"{"objects":[],"version":"1.0"}"#).await.unwrap();
    let record = store.fetch_board(id).await.unwrap().unwrap();
    assert_eq!(record.data, r#"{"objects":[],"version":"1.0"}"#);
    assert!(record.updated_at >= record.created_at);
}

#[tokio::test]
async fn board_store_missing_board() {
    let store = InMemoryBoardStore::new();
    assert!(store.fetch_board(Uuid::new_v4()).await.unwrap().is_none());
    assert!(matches!(
        store.update_board_data(Uuid::new_v4(), "{}").await,
        Err(RemoteError::Store(_))
    ));
}

#[tokio::test]
async fn presence_hub_fans_out_to_peers() {
    let hub = Arc::new(InMemoryPresenceHub::new());
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let chan_a = hub.connect(a);
    let chan_b = hub.connect(b);
    let mut peers_of_b = chan_b.peers();

    chan_a
        .publish(PresenceRecord::new("A", "#FF6B6B").at(3.0, 4.0))
        .await
        .unwrap();

    let event = timeout(Duration::from_millis(200), peers_of_b.recv())
        .await
        .expect("peer event timed out")
        .expect("peer channel closed");
    match event {
        PeerEvent::Update { client_id, record } => {
            assert_eq!(client_id, a);
            assert_eq!(record.name, "A");
        }
        PeerEvent::Left { .. } => panic!("expected update"),
    }
}

#[tokio::test]
async fn presence_disconnect_announces_departure() {
    let hub = Arc::new(InMemoryPresenceHub::new());
    let a = Uuid::new_v4();
    let chan_a = hub.connect(a);
    let chan_b = hub.connect(Uuid::new_v4());
    let mut peers_of_b = chan_b.peers();

    chan_a.disconnect().await.unwrap();

    let event = timeout(Duration::from_millis(200), peers_of_b.recv())
        .await
        .expect("peer event timed out")
        .expect("peer channel closed");
    assert_eq!(event, PeerEvent::Left { client_id: a });
}
