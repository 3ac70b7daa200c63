use super::*;
use crate::state::test_helpers;

#[test]
fn env_parse_falls_back_on_missing_or_garbage() {
    assert_eq!(env_parse("SKETCHBOARD_TEST_UNSET_VAR", 42_u64), 42);

    // SAFETY: test-local variable name, single-threaded mutation.
    unsafe { std::env::set_var("SKETCHBOARD_TEST_GARBAGE_VAR", "not-a-number") };
    assert_eq!(env_parse("SKETCHBOARD_TEST_GARBAGE_VAR", 7_u64), 7);

    unsafe { std::env::set_var("SKETCHBOARD_TEST_VALID_VAR", "250") };
    assert_eq!(env_parse("SKETCHBOARD_TEST_VALID_VAR", 7_u64), 250);
}

#[tokio::test]
async fn ack_skips_rooms_that_moved_after_snapshot() {
    let state = test_helpers::test_app_state();
    let board_id = test_helpers::seed_room(&state).await;

    {
        let mut rooms = state.rooms.write().await;
        let room = rooms.get_mut(&board_id).unwrap();
        room.dirty = true;
        room.seq = 5;
    }

    // Snapshot was taken at seq 4; a newer write exists.
    ack_flushed(&state, board_id, 4).await;
    {
        let rooms = state.rooms.read().await;
        assert!(rooms.get(&board_id).unwrap().dirty);
    }

    // Snapshot matches the live seq: safe to clear.
    ack_flushed(&state, board_id, 5).await;
    {
        let rooms = state.rooms.read().await;
        assert!(!rooms.get(&board_id).unwrap().dirty);
    }
}

#[tokio::test]
async fn ack_ignores_evicted_rooms() {
    let state = test_helpers::test_app_state();
    ack_flushed(&state, uuid::Uuid::new_v4(), 1).await;
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::super::*;

    #[tokio::test]
    async fn flush_clears_dirty_after_database_write() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required");
        let pool = crate::db::init_pool(&url).await.expect("test database init");
        let state = crate::state::AppState::new(pool);

        let owner = crate::services::auth::register_user(
            &state.pool,
            &format!("{}@test", uuid::Uuid::new_v4()),
            "Owner",
            "pw",
        )
        .await
        .unwrap();
        let board = crate::services::board::create_board(&state.pool, "Flush Me", owner)
            .await
            .unwrap();

        {
            let mut rooms = state.rooms.write().await;
            let mut room = crate::state::RoomState::new();
            room.scene_json = r#"{"objects":[],"version":"1.0"}"#.into();
            room.seq = 1;
            room.dirty = true;
            rooms.insert(board.id, room);
        }

        flush_all_dirty_for_tests(&state).await;

        let fetched = crate::services::board::get_board(&state.pool, board.id, owner)
            .await
            .unwrap();
        assert_eq!(fetched.data, r#"{"objects":[],"version":"1.0"}"#);
        let rooms = state.rooms.read().await;
        assert!(!rooms.get(&board.id).unwrap().dirty);
    }
}
