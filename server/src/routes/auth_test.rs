use super::*;

#[test]
fn env_bool_accepts_common_spellings() {
    // SAFETY: test-local variable names, single-threaded mutation.
    unsafe { std::env::set_var("SKETCHBOARD_TEST_BOOL", "YES") };
    assert_eq!(env_bool("SKETCHBOARD_TEST_BOOL"), Some(true));

    unsafe { std::env::set_var("SKETCHBOARD_TEST_BOOL", "0") };
    assert_eq!(env_bool("SKETCHBOARD_TEST_BOOL"), Some(false));

    unsafe { std::env::set_var("SKETCHBOARD_TEST_BOOL", "maybe") };
    assert_eq!(env_bool("SKETCHBOARD_TEST_BOOL"), None);

    assert_eq!(env_bool("SKETCHBOARD_TEST_BOOL_UNSET"), None);
}

#[test]
fn session_cookie_is_http_only_and_scoped() {
    let cookie = session_cookie("abc123".into());
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "abc123");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
}
