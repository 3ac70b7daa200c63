use super::*;

#[test]
fn hash_and_verify_round_trip() {
    let stored = hash_password("hunter2");
    assert!(verify_password("hunter2", &stored));
    assert!(!verify_password("hunter3", &stored));
}

#[test]
fn hashes_are_salted() {
    let a = hash_password("same-password");
    let b = hash_password("same-password");
    assert_ne!(a, b);
    assert!(verify_password("same-password", &a));
    assert!(verify_password("same-password", &b));
}

#[test]
fn verify_rejects_malformed_storage() {
    assert!(!verify_password("anything", "no-separator"));
    assert!(!verify_password("anything", ""));
}

#[test]
fn picked_colors_come_from_palette() {
    for _ in 0..16 {
        let color = pick_color();
        assert!(USER_COLORS.contains(&color.as_str()));
    }
}
