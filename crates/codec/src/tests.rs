use super::*;

fn roundtrip(record: &LogRecord) -> LogRecord {
    let encoded = record.encode();
    let header = decode_header(&encoded[..MAX_LOG_RECORD_HEADER_SIZE.min(encoded.len())])
        .unwrap()
        .expect("not eof");
    let key = encoded[header.header_size..header.header_size + header.key_size].to_vec();
    let value = encoded[header.header_size + header.key_size
        ..header.header_size + header.key_size + header.value_size]
        .to_vec();
    verify_and_build(
        &header,
        &encoded[..header.header_size],
        key,
        value,
    )
    .unwrap()
}

#[test]
fn normal_record_round_trips() {
    let record = LogRecord {
        key: encode_key_with_seq(b"name", 0),
        value: b"bitcask".to_vec(),
        record_type: LogRecordType::Normal,
    };
    let decoded = roundtrip(&record);
    assert_eq!(decoded, record);
}

#[test]
fn tombstone_has_empty_value() {
    let record = LogRecord {
        key: encode_key_with_seq(b"name", 0),
        value: Vec::new(),
        record_type: LogRecordType::Tombstone,
    };
    let decoded = roundtrip(&record);
    assert_eq!(decoded, record);
}

#[test]
fn corrupted_byte_trips_crc_check() {
    let record = LogRecord {
        key: b"k".to_vec(),
        value: b"v".to_vec(),
        record_type: LogRecordType::Normal,
    };
    let mut encoded = record.encode();
    let last = encoded.len() - 1;
    encoded[last] ^= 0xFF;

    let header = decode_header(&encoded).unwrap().unwrap();
    let key = encoded[header.header_size..header.header_size + header.key_size].to_vec();
    let value = encoded[header.header_size + header.key_size..].to_vec();
    let err = verify_and_build(&header, &encoded[..header.header_size], key, value).unwrap_err();
    assert_eq!(err, CodecError::InvalidCrc);
}

#[test]
fn empty_buffer_is_clean_eof() {
    assert_eq!(decode_header(&[]).unwrap(), None);
}

#[test]
fn truncated_header_is_unexpected_eof() {
    let record = LogRecord {
        key: b"a-longer-key".to_vec(),
        value: b"value".to_vec(),
        record_type: LogRecordType::Normal,
    };
    let encoded = record.encode();
    // Fewer bytes than a complete header: truncated mid-write.
    let err = decode_header(&encoded[..3]).unwrap_err();
    assert_eq!(err, CodecError::UnexpectedEof);
}

#[test]
fn all_zero_header_is_eof_sentinel() {
    let zeros = [0u8; MAX_LOG_RECORD_HEADER_SIZE];
    assert_eq!(decode_header(&zeros).unwrap(), None);
}

#[test]
fn seq_key_round_trips() {
    let encoded = encode_key_with_seq(b"mykey", 42);
    let (key, seq) = parse_key_with_seq(&encoded);
    assert_eq!(key, b"mykey");
    assert_eq!(seq, 42);
}

#[test]
fn seq_zero_is_non_transactional() {
    let encoded = encode_key_with_seq(b"k", 0);
    let (key, seq) = parse_key_with_seq(&encoded);
    assert_eq!(key, b"k");
    assert_eq!(seq, 0);
}

#[test]
fn position_round_trips() {
    let pos = Position {
        file_id: 7,
        offset: 123_456,
        size: 42,
    };
    let encoded = encode_position(&pos);
    let decoded = decode_position(&encoded).unwrap();
    assert_eq!(decoded, pos);
}

#[test]
fn position_round_trips_with_zero_offset() {
    let pos = Position {
        file_id: 0,
        offset: 0,
        size: 0,
    };
    let encoded = encode_position(&pos);
    assert_eq!(decode_position(&encoded).unwrap(), pos);
}
