use archiver_core::{parse_tag_input, parse_thread_input, InputError};

fn init_logging() {
    archiver_logging::initialize_for_tests();
}

#[test]
fn tag_from_number_or_url() {
    init_logging();
    assert_eq!(parse_tag_input(" 1234 "), Ok(1234));
    assert_eq!(parse_tag_input("https://arhivach.vc/?tags=77"), Ok(77));
    assert_eq!(parse_tag_input("https://arhivach.vc/index/25/?foo=1&tags=77"), Ok(77));
    assert_eq!(parse_tag_input("/?tags=15&x=2"), Ok(15));
}

#[test]
fn tag_rejects_garbage() {
    init_logging();
    assert_eq!(
        parse_tag_input("music"),
        Err(InputError::NotATag("music".to_string()))
    );
    assert!(parse_tag_input("https://arhivach.vc/?tags=").is_err());
    assert!(parse_tag_input("https://arhivach.vc/thread/1/").is_err());
}

#[test]
fn thread_url_needs_numeric_id() {
    init_logging();
    let thread = parse_thread_input("https://arhivach.vc/thread/1122323/").unwrap();
    assert_eq!(thread.id, "1122323");
    assert_eq!(thread.url, "https://arhivach.vc/thread/1122323/");

    assert!(matches!(
        parse_thread_input("https://arhivach.vc/thread/abc/"),
        Err(InputError::NotAThread(_))
    ));
    assert!(parse_thread_input("https://arhivach.vc/?tags=1").is_err());
}
