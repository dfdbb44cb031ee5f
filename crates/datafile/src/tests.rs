use super::*;
use codec::{encode_key_with_seq, LogRecordType};
use tempfile::tempdir;

#[test]
fn write_then_read_back_a_record() {
    let dir = tempdir().unwrap();
    let mut df = DataFile::open(dir.path(), 0, IoType::Standard).unwrap();

    let record = LogRecord {
        key: encode_key_with_seq(b"name", 0),
        value: b"bitcask".to_vec(),
        record_type: LogRecordType::Normal,
    };
    let encoded = record.encode();
    let expected_size = encoded.len() as u64;
    df.write(&encoded).unwrap();
    assert_eq!(df.offset(), expected_size);

    let (decoded, size) = df.read_log_record(0).unwrap().unwrap();
    assert_eq!(decoded, record);
    assert_eq!(size, expected_size);
}

#[test]
fn sequential_records_advance_offset_correctly() {
    let dir = tempdir().unwrap();
    let mut df = DataFile::open(dir.path(), 0, IoType::Standard).unwrap();

    let mut offsets = Vec::new();
    for i in 0..5 {
        offsets.push(df.offset());
        let record = LogRecord {
            key: encode_key_with_seq(format!("key{i}").as_bytes(), 0),
            value: format!("value{i}").into_bytes(),
            record_type: LogRecordType::Normal,
        };
        df.write(&record.encode()).unwrap();
    }

    for (i, offset) in offsets.into_iter().enumerate() {
        let (decoded, _size) = df.read_log_record(offset).unwrap().unwrap();
        assert_eq!(decoded.value, format!("value{i}").into_bytes());
    }
}

#[test]
fn read_at_eof_returns_none() {
    let dir = tempdir().unwrap();
    let df = DataFile::open(dir.path(), 0, IoType::Standard).unwrap();
    assert!(df.read_log_record(0).unwrap().is_none());
}

#[test]
fn truncated_tail_record_reads_as_eof() {
    let dir = tempdir().unwrap();
    let mut df = DataFile::open(dir.path(), 0, IoType::Standard).unwrap();
    let record = LogRecord {
        key: b"k".to_vec(),
        value: b"a-fairly-long-value-to-truncate".to_vec(),
        record_type: LogRecordType::Normal,
    };
    let encoded = record.encode();
    // Simulate a crash mid-append: write only the first half of the frame.
    df.write(&encoded[..encoded.len() / 2]).unwrap();

    assert!(df.read_log_record(0).unwrap().is_none());
}

#[test]
fn corrupted_record_surfaces_invalid_crc() {
    let dir = tempdir().unwrap();
    let mut df = DataFile::open(dir.path(), 0, IoType::Standard).unwrap();
    let record = LogRecord {
        key: b"k".to_vec(),
        value: b"v".to_vec(),
        record_type: LogRecordType::Normal,
    };
    let mut encoded = record.encode();
    let last = encoded.len() - 1;
    encoded[last] ^= 0xFF;
    df.write(&encoded).unwrap();

    let err = df.read_log_record(0).unwrap_err();
    assert!(matches!(err, DataFileError::Codec(CodecError::InvalidCrc)));
}

#[test]
fn hint_record_round_trips_a_position() {
    let dir = tempdir().unwrap();
    let mut hint = DataFile::open_hint_file(dir.path()).unwrap();
    let pos = Position {
        file_id: 3,
        offset: 128,
        size: 64,
    };
    hint.write_hint_record(b"mykey", &pos).unwrap();

    let (decoded, _size) = hint.read_log_record(0).unwrap().unwrap();
    assert_eq!(decoded.key, b"mykey");
    assert_eq!(codec::decode_position(&decoded.value).unwrap(), pos);
}

#[test]
fn data_file_name_uses_nine_digit_ids() {
    let dir = Path::new("/tmp/db");
    assert_eq!(
        data_file_name(dir, 7),
        Path::new("/tmp/db/000000007.data")
    );
}

#[test]
fn parse_data_file_id_rejects_non_data_files() {
    assert_eq!(parse_data_file_id("000000007.data"), Some(7));
    assert_eq!(parse_data_file_id("hint-index"), None);
    assert_eq!(parse_data_file_id("not-a-number.data"), None);
}
