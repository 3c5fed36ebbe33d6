use sporlyze::{
    spotify::{MAX_PAGE_LIMIT, clamp_limit, upstream_message},
    upload::{search_query, validate_filename},
    utils::{content_digest, generate_state, parse_id_list},
};

#[test]
fn test_generate_state() {
    let state = generate_state();
    assert_eq!(state.len(), 32);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(state, generate_state());
}

#[test]
fn test_content_digest_is_stable_and_url_safe() {
    let digest = content_digest(b"ID3 fake mp3 bytes");
    assert_eq!(digest, content_digest(b"ID3 fake mp3 bytes"));
    assert_ne!(digest, content_digest(b"other bytes"));
    // SHA-256 without padding
    assert_eq!(digest.len(), 43);
    assert!(
        digest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
}

#[test]
fn test_parse_id_list() {
    assert_eq!(
        parse_id_list(Some("a, b,,c ")),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert!(parse_id_list(Some(" , ")).is_empty());
    assert!(parse_id_list(None).is_empty());
}

#[test]
fn test_search_query_from_filename() {
    assert_eq!(
        search_query("Daft_Punk - One More Time.mp3"),
        "Daft Punk - One More Time"
    );
    assert_eq!(search_query("  spaced__out   song .MP3"), "spaced out song");
}

#[test]
fn test_validate_filename() {
    assert!(validate_filename("song.mp3").is_ok());
    assert!(validate_filename("SONG.MP3").is_ok());
    assert!(validate_filename("song.wav").is_err());
    assert!(validate_filename("song").is_err());
    assert!(validate_filename(".mp3").is_err());

    let err = validate_filename("cover.png").unwrap_err();
    assert_eq!(err.to_string(), "Only MP3 files are allowed");
}

#[test]
fn test_upstream_message() {
    assert_eq!(
        upstream_message(r#"{"error":{"status":404,"message":"Non existing id"}}"#).as_deref(),
        Some("Non existing id")
    );
    assert_eq!(
        upstream_message(r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#)
            .as_deref(),
        Some("Invalid authorization code")
    );
    assert_eq!(upstream_message("<html>bad gateway</html>"), None);

    let long = format!(r#"{{"error":{{"message":"{}"}}}}"#, "x".repeat(500));
    assert_eq!(upstream_message(&long).map(|m| m.len()), Some(200));
}

#[test]
fn test_clamp_limit() {
    assert_eq!(clamp_limit(None, 20), 20);
    assert_eq!(clamp_limit(Some(0), 20), 1);
    assert_eq!(clamp_limit(Some(500), 20), MAX_PAGE_LIMIT);
    assert_eq!(clamp_limit(Some(7), 20), 7);
}
