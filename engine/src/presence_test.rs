use super::*;

#[test]
fn random_color_comes_from_palette() {
    for _ in 0..32 {
        let color = random_color();
        assert!(CURSOR_COLORS.contains(&color.as_str()));
    }
}

#[test]
fn presence_record_serde_shape() {
    let record = PresenceRecord::new("Ada", "#FF6B6B").at(12.0, 34.0);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["name"], "Ada");
    assert_eq!(value["color"], "#FF6B6B");
    assert!((value["cursor"]["x"].as_f64().unwrap() - 12.0).abs() < f64::EPSILON);

    let off_canvas = PresenceRecord::new("Ada", "#FF6B6B");
    let value = serde_json::to_value(&off_canvas).unwrap();
    assert!(value["cursor"].is_null());
}

#[test]
fn roster_tracks_updates_and_departures() {
    let mut roster = Roster::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    roster.apply(PeerEvent::Update { client_id: a, record: PresenceRecord::new("A", "#FF6B6B").at(1.0, 2.0) });
    roster.apply(PeerEvent::Update { client_id: b, record: PresenceRecord::new("B", "#4ECDC4") });
    assert_eq!(roster.len(), 2);

    roster.apply(PeerEvent::Left { client_id: a });
    assert_eq!(roster.len(), 1);
}

#[test]
fn null_cursors_are_retained_but_not_rendered() {
    let mut roster = Roster::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    roster.apply(PeerEvent::Update { client_id: a, record: PresenceRecord::new("A", "#FF6B6B").at(5.0, 5.0) });
    roster.apply(PeerEvent::Update { client_id: b, record: PresenceRecord::new("B", "#4ECDC4") });

    let visible = roster.visible_cursors();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].0, a);
    assert_eq!(roster.len(), 2);

    // Pointer leaves the canvas: update with a null cursor hides it.
    roster.apply(PeerEvent::Update { client_id: a, record: PresenceRecord::new("A", "#FF6B6B") });
    assert!(roster.visible_cursors().is_empty());
    assert_eq!(roster.len(), 2);
}

#[test]
fn latest_update_wins_per_connection() {
    let mut roster = Roster::new();
    let a = Uuid::new_v4();

    roster.apply(PeerEvent::Update { client_id: a, record: PresenceRecord::new("A", "#FF6B6B").at(1.0, 1.0) });
    roster.apply(PeerEvent::Update { client_id: a, record: PresenceRecord::new("A", "#FF6B6B").at(9.0, 9.0) });

    let visible = roster.visible_cursors();
    assert_eq!(visible.len(), 1);
    let cursor = visible[0].1.cursor.unwrap();
    assert!((cursor.x - 9.0).abs() < f64::EPSILON);
}
