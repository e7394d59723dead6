use lontar::types::{
    EMAIL_MAX_LEN, ID_SIZE, ROW_SIZE, USERNAME_MAX_LEN, error::EngineError, row::Row,
};

#[test]
fn test_row_round_trip() {
    let row = Row::new(42, "alice", "alice@example.com");
    let bytes = row.to_bytes().unwrap();
    assert_eq!(bytes.len(), ROW_SIZE);
    let decoded = Row::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, row);
}

#[test]
fn test_row_round_trip_empty_fields() {
    let row = Row::new(0, "", "");
    let decoded = Row::from_bytes(&row.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, row);
}

#[test]
fn test_row_round_trip_max_width_fields() {
    let row = Row::new(
        u64::MAX,
        "u".repeat(USERNAME_MAX_LEN),
        "e".repeat(EMAIL_MAX_LEN),
    );
    let decoded = Row::from_bytes(&row.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, row);
}

#[test]
fn test_over_width_username_rejected() {
    let row = Row::new(1, "u".repeat(USERNAME_MAX_LEN + 1), "a@b.c");
    let err = row.to_bytes().unwrap_err();
    match err {
        EngineError::Validation { field, max, actual } => {
            assert_eq!(field, "username");
            assert_eq!(max, USERNAME_MAX_LEN);
            assert_eq!(actual, USERNAME_MAX_LEN + 1);
        }
        other => panic!("expected Validation error, got {other:?}"),
    }
    assert!(!err.is_fatal());
}

#[test]
fn test_over_width_email_rejected() {
    let row = Row::new(1, "bob", "e".repeat(EMAIL_MAX_LEN + 1));
    assert!(matches!(
        row.to_bytes(),
        Err(EngineError::Validation { field: "email", .. })
    ));
}

#[test]
fn test_key_readable_from_prefix() {
    let row = Row::new(0xDEAD_BEEF, "carol", "carol@example.com");
    let bytes = row.to_bytes().unwrap();
    assert_eq!(Row::key_of(&bytes), 0xDEAD_BEEF);
    // The key never depends on anything past the id field.
    assert_eq!(Row::key_of(&bytes[..ID_SIZE]), 0xDEAD_BEEF);
}

#[test]
fn test_from_bytes_wrong_length() {
    assert!(matches!(
        Row::from_bytes(&[0u8; ROW_SIZE - 1]),
        Err(EngineError::InvalidPageSize { .. })
    ));
}

#[test]
fn test_invalid_utf8_is_corruption() {
    let row = Row::new(7, "dave", "dave@example.com");
    let mut bytes = row.to_bytes().unwrap();
    bytes[ID_SIZE] = 0xFF; // first username byte
    bytes[ID_SIZE + 1] = 0xFE;
    let err = Row::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, EngineError::CorruptedDatabase { .. }));
    assert!(err.is_fatal());
}
