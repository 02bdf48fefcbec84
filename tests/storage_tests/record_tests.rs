//! Tests for commit records
//!
//! These tests verify:
//! - Record framing and CRC32 corruption detection
//! - Reader behavior at clean end, torn tail and mid-file corruption
//! - Replay of records into buckets

use bucketkv::storage::{
    encode_header, CommitRecord, Decoded, FileHeader, Frame, Op, RecordReader, Replay,
    FILE_HEADER_SIZE, RECORD_HEADER_SIZE,
};
use bucketkv::KvError;

// =============================================================================
// Helper Functions
// =============================================================================

fn put(bucket: &str, key: &str, value: &str) -> Op {
    Op::Put {
        bucket: bucket.to_string(),
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

fn create(bucket: &str) -> Op {
    Op::CreateBucket {
        bucket: bucket.to_string(),
    }
}

/// File image: header followed by the given records
fn image_of(records: &[CommitRecord]) -> Vec<u8> {
    let mut image = encode_header().to_vec();
    for record in records {
        image.extend_from_slice(&record.encode().unwrap());
    }
    image
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_encode_decode_record() {
    let record = CommitRecord::new(7, vec![create("food"), put("food", "apple", "red")]);

    let frame = record.encode().unwrap();
    match CommitRecord::decode(&frame) {
        Decoded::Record(decoded, len) => {
            assert_eq!(decoded, record);
            assert_eq!(len, frame.len());
        }
        other => panic!("Expected record, got {:?}", other),
    }
}

#[test]
fn test_frame_header_layout() {
    let record = CommitRecord::new(1, vec![put("b", "k", "v")]);
    let frame = record.encode().unwrap();

    let len = u32::from_le_bytes(frame[0..4].try_into().unwrap()) as usize;
    let crc = u32::from_le_bytes(frame[4..8].try_into().unwrap());

    assert_eq!(len, frame.len() - RECORD_HEADER_SIZE);
    assert_eq!(crc, crc32fast::hash(&frame[RECORD_HEADER_SIZE..]));
}

#[test]
fn test_decode_incomplete_header() {
    assert!(matches!(
        CommitRecord::decode(&[1, 2, 3]),
        Decoded::Incomplete
    ));
}

#[test]
fn test_decode_incomplete_payload() {
    let frame = CommitRecord::new(1, vec![put("b", "key", "value")])
        .encode()
        .unwrap();

    let truncated = &frame[..frame.len() - 3];
    assert!(matches!(
        CommitRecord::decode(truncated),
        Decoded::Incomplete
    ));
}

#[test]
fn test_decode_detects_checksum_mismatch() {
    let mut frame = CommitRecord::new(1, vec![put("b", "key", "value")])
        .encode()
        .unwrap();
    let last = frame.len() - 1;
    frame[last] ^= 0xFF;

    match CommitRecord::decode(&frame) {
        Decoded::ChecksumMismatch { frame_len, .. } => assert_eq!(frame_len, frame.len()),
        other => panic!("Expected checksum mismatch, got {:?}", other),
    }
}

#[test]
fn test_decode_rejects_absurd_length() {
    let mut frame = vec![0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0];
    frame.extend_from_slice(&[0u8; 16]);

    match CommitRecord::decode(&frame) {
        Decoded::Malformed { frame_len, .. } => assert_eq!(frame_len, RECORD_HEADER_SIZE),
        other => panic!("Expected malformed frame, got {:?}", other),
    }
}

#[test]
fn test_decode_zeroed_header_is_malformed() {
    // crc32 of an empty payload is 0, so the checksum alone would accept it
    assert_eq!(crc32fast::hash(&[]), 0);

    match CommitRecord::decode(&[0u8; 32]) {
        Decoded::Malformed { frame_len, .. } => assert_eq!(frame_len, RECORD_HEADER_SIZE),
        other => panic!("Expected malformed frame, got {:?}", other),
    }
}

#[test]
fn test_decode_checked_but_undecodable_payload_is_malformed() {
    let payload = [0xFFu8; 5];
    let mut frame = (payload.len() as u32).to_le_bytes().to_vec();
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);

    assert!(matches!(
        CommitRecord::decode(&frame),
        Decoded::Malformed { .. }
    ));
}

#[test]
fn test_snapshot_rebuilds_directory_from_nothing() {
    let image = image_of(&[
        CommitRecord::new(1, vec![create("food"), put("food", "apple", "red")]),
        CommitRecord::new(2, vec![create("empty"), put("food", "pear", "green")]),
    ]);
    let directory = Replay::from_image(&image).unwrap().directory;

    let snapshot = CommitRecord::snapshot(3, &directory);

    assert_eq!(snapshot.seq, 3);
    assert_eq!(snapshot.ops[0], Op::Reset);
    assert_eq!(
        snapshot.frame_len().unwrap(),
        snapshot.encode().unwrap().len() as u64
    );

    let rebuilt = Replay::from_image(&image_of(&[snapshot])).unwrap().directory;
    assert_eq!(
        rebuilt.bucket_names().collect::<Vec<_>>(),
        directory.bucket_names().collect::<Vec<_>>()
    );
    let food: Vec<_> = rebuilt.lookup_bucket("food").unwrap().iter().collect();
    assert_eq!(food, vec![(&b"apple"[..], &b"red"[..]), (&b"pear"[..], &b"green"[..])]);
    assert!(rebuilt.lookup_bucket("empty").unwrap().is_empty());
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_reads_all_records_then_end() {
    let image = image_of(&[
        CommitRecord::new(1, vec![create("a")]),
        CommitRecord::new(2, vec![put("a", "k", "v")]),
    ]);

    let mut reader = RecordReader::new(&image, FILE_HEADER_SIZE);
    assert!(matches!(reader.next_frame().unwrap(), Frame::Record(r) if r.seq == 1));
    assert!(matches!(reader.next_frame().unwrap(), Frame::Record(r) if r.seq == 2));
    assert!(matches!(reader.next_frame().unwrap(), Frame::End));
    assert_eq!(reader.position(), image.len());
}

#[test]
fn test_reader_reports_torn_tail() {
    let mut image = image_of(&[CommitRecord::new(1, vec![create("a")])]);
    let valid_len = image.len();

    let partial = CommitRecord::new(2, vec![put("a", "k", "v")]).encode().unwrap();
    image.extend_from_slice(&partial[..partial.len() / 2]);

    let mut reader = RecordReader::new(&image, FILE_HEADER_SIZE);
    assert!(matches!(reader.next_frame().unwrap(), Frame::Record(_)));
    assert!(matches!(reader.next_frame().unwrap(), Frame::TornTail));
    assert_eq!(reader.position(), valid_len);
}

#[test]
fn test_reader_treats_bad_final_checksum_as_torn() {
    let mut image = image_of(&[
        CommitRecord::new(1, vec![create("a")]),
        CommitRecord::new(2, vec![put("a", "k", "v")]),
    ]);
    let last = image.len() - 1;
    image[last] ^= 0xFF;

    let mut reader = RecordReader::new(&image, FILE_HEADER_SIZE);
    assert!(matches!(reader.next_frame().unwrap(), Frame::Record(_)));
    assert!(matches!(reader.next_frame().unwrap(), Frame::TornTail));
}

#[test]
fn test_reader_treats_zero_filled_tail_as_torn() {
    let mut image = image_of(&[CommitRecord::new(1, vec![create("a")])]);
    let valid_len = image.len();
    image.extend_from_slice(&[0u8; 64]);

    let mut reader = RecordReader::new(&image, FILE_HEADER_SIZE);
    assert!(matches!(reader.next_frame().unwrap(), Frame::Record(_)));
    assert!(matches!(reader.next_frame().unwrap(), Frame::TornTail));
    assert_eq!(reader.position(), valid_len);
}

#[test]
fn test_reader_treats_garbage_length_at_end_as_torn() {
    let mut image = image_of(&[CommitRecord::new(1, vec![create("a")])]);
    image.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0x7F, 0x12, 0x34, 0x56, 0x78]);
    image.extend_from_slice(&[0u8; 16]);

    let mut reader = RecordReader::new(&image, FILE_HEADER_SIZE);
    assert!(matches!(reader.next_frame().unwrap(), Frame::Record(_)));
    assert!(matches!(reader.next_frame().unwrap(), Frame::TornTail));
}

#[test]
fn test_reader_rejects_zeroed_frame_before_live_record() {
    let mut image = image_of(&[CommitRecord::new(1, vec![create("a")])]);
    image.extend_from_slice(&[0u8; RECORD_HEADER_SIZE]);
    image.extend_from_slice(&CommitRecord::new(2, vec![put("a", "k", "v")]).encode().unwrap());

    let mut reader = RecordReader::new(&image, FILE_HEADER_SIZE);
    assert!(matches!(reader.next_frame().unwrap(), Frame::Record(_)));
    assert!(matches!(reader.next_frame(), Err(KvError::Corruption(_))));
}

#[test]
fn test_reader_rejects_mid_file_corruption() {
    let mut image = image_of(&[
        CommitRecord::new(1, vec![create("a"), put("a", "key", "value")]),
        CommitRecord::new(2, vec![put("a", "k", "v")]),
    ]);
    image[FILE_HEADER_SIZE + RECORD_HEADER_SIZE + 2] ^= 0xFF;

    let mut reader = RecordReader::new(&image, FILE_HEADER_SIZE);
    assert!(matches!(reader.next_frame(), Err(KvError::Corruption(_))));
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_empty_database() {
    let replay = Replay::from_image(&encode_header()).unwrap();

    assert_eq!(replay.records, 0);
    assert_eq!(replay.last_seq, 0);
    assert_eq!(replay.valid_len, FILE_HEADER_SIZE as u64);
    assert!(!replay.torn_tail);
    assert!(replay.directory.is_empty());
}

#[test]
fn test_replay_applies_records_in_order() {
    let image = image_of(&[
        CommitRecord::new(1, vec![create("food"), put("food", "apple", "red")]),
        CommitRecord::new(2, vec![put("food", "apple", "green"), put("food", "pear", "green")]),
        CommitRecord::new(
            3,
            vec![Op::Delete {
                bucket: "food".to_string(),
                key: b"pear".to_vec(),
            }],
        ),
    ]);

    let replay = Replay::from_image(&image).unwrap();
    let food = replay.directory.lookup_bucket("food").unwrap();

    assert_eq!(replay.records, 3);
    assert_eq!(replay.last_seq, 3);
    assert_eq!(food.get(b"apple"), Some(&b"green"[..]));
    assert_eq!(food.get(b"pear"), None);
    assert_eq!(food.len(), 1);
}

#[test]
fn test_replay_ignores_torn_record_entirely() {
    let mut image = image_of(&[CommitRecord::new(1, vec![create("a")])]);
    let partial = CommitRecord::new(2, vec![put("a", "k1", "v1"), put("a", "k2", "v2")])
        .encode()
        .unwrap();
    image.extend_from_slice(&partial[..partial.len() - 1]);

    let replay = Replay::from_image(&image).unwrap();

    assert!(replay.torn_tail);
    assert_eq!(replay.last_seq, 1);
    assert!(replay.directory.lookup_bucket("a").unwrap().is_empty());
}

#[test]
fn test_replay_reset_discards_earlier_state() {
    let image = image_of(&[
        CommitRecord::new(1, vec![create("old"), put("old", "k", "v")]),
        CommitRecord::new(2, vec![Op::Reset, create("new")]),
    ]);

    let replay = Replay::from_image(&image).unwrap();

    assert!(replay.directory.lookup_bucket("old").is_err());
    assert!(replay.directory.lookup_bucket("new").is_ok());
    assert_eq!(replay.last_seq, 2);
}

#[test]
fn test_replay_honors_header_bounds() {
    let first = CommitRecord::new(1, vec![create("a"), put("a", "k", "old")])
        .encode()
        .unwrap();
    let second = CommitRecord::new(2, vec![Op::Reset, create("a"), put("a", "k", "new")])
        .encode()
        .unwrap();
    let mut image = image_of(&[]);
    image.extend_from_slice(&first);
    image.extend_from_slice(&second);
    let second_at = (FILE_HEADER_SIZE + first.len()) as u64;

    // Live records start past a dead prefix
    let header = FileHeader {
        start: second_at,
        limit: 0,
    };
    image[..FILE_HEADER_SIZE].copy_from_slice(&header.encode());
    let replay = Replay::from_image(&image).unwrap();
    assert_eq!(replay.records, 1);
    assert_eq!(replay.directory.lookup_bucket("a").unwrap().get(b"k"), Some(&b"new"[..]));

    // Live records stop before stale bytes
    let header = FileHeader {
        start: FILE_HEADER_SIZE as u64,
        limit: second_at,
    };
    image[..FILE_HEADER_SIZE].copy_from_slice(&header.encode());
    let replay = Replay::from_image(&image).unwrap();
    assert_eq!(replay.last_seq, 1);
    assert_eq!(replay.valid_len, second_at);
    assert!(replay.has_stale_tail());
    assert_eq!(replay.directory.lookup_bucket("a").unwrap().get(b"k"), Some(&b"old"[..]));
}

#[test]
fn test_replay_rejects_bounds_past_end_of_file() {
    let mut image = image_of(&[CommitRecord::new(1, vec![create("a")])]);
    let header = FileHeader {
        start: FILE_HEADER_SIZE as u64,
        limit: image.len() as u64 + 1,
    };
    image[..FILE_HEADER_SIZE].copy_from_slice(&header.encode());

    assert!(matches!(
        Replay::from_image(&image),
        Err(KvError::Corruption(_))
    ));
}

#[test]
fn test_replay_rejects_bad_header() {
    let mut image = image_of(&[]);
    image[0] = b'X';

    assert!(matches!(
        Replay::from_image(&image),
        Err(KvError::Corruption(_))
    ));
    assert!(Replay::from_image(&[]).is_err());
}
