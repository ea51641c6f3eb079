//! Reader resilience and metadata resolution

use tempfile::TempDir;

use scribe::group::{GroupControlHeader, SharedSegment};
use scribe::{here, GroupConfig, GroupReader, StorageGroup};

#[test]
fn test_reader_skips_record_with_unknown_statement() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.seg");
    let group = StorageGroup::create(GroupConfig::new("corrupt", 1).with_file_path(&path)).unwrap();

    let stmt = group.register::<(u64,)>(here!(), "seq", "").unwrap();
    group.write(&stmt, &(1u64,)).unwrap();
    group.write(&stmt, &(2u64,)).unwrap();

    // Stamp an id no statement owns over the first record's header, through
    // an independent mapping of the same segment.
    {
        let segment = SharedSegment::attach(&path).unwrap();
        let header = unsafe { &*segment.as_ptr::<GroupControlHeader>() };
        let ring_offset = header.ring_offset as usize;
        unsafe {
            let first_header = segment.as_mut_ptr::<u8>().add(ring_offset);
            let bogus_id = 0x7777u32.to_le_bytes();
            std::ptr::copy_nonoverlapping(bogus_id.as_ptr(), first_header, 4);
        }
    }

    let mut reader = group.reader().unwrap();
    let record = reader.next().unwrap().expect("second record survives");
    assert_eq!(record.payload, 2u64.to_le_bytes());
    assert_eq!(reader.skipped_records(), 1);
    assert!(reader.next().unwrap().is_none());
}

#[test]
fn test_reader_resyncs_past_impossible_length() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("torn.seg");
    let group = StorageGroup::create(GroupConfig::new("torn", 1).with_file_path(&path)).unwrap();

    let stmt = group.register::<(u64,)>(here!(), "seq", "").unwrap();
    group.write(&stmt, &(1u64,)).unwrap();
    group.write(&stmt, &(2u64,)).unwrap();

    // Blow the first record's length field past the committed region.
    {
        let segment = SharedSegment::attach(&path).unwrap();
        let header = unsafe { &*segment.as_ptr::<GroupControlHeader>() };
        let ring_offset = header.ring_offset as usize;
        unsafe {
            let len_field = segment.as_mut_ptr::<u8>().add(ring_offset + 4);
            let bogus_len = u32::MAX.to_le_bytes();
            std::ptr::copy_nonoverlapping(bogus_len.as_ptr(), len_field, 4);
        }
    }

    // The reader steps forward to the next boundary instead of aborting,
    // and still finds the intact second record.
    let mut reader = group.reader().unwrap();
    let record = reader.next().unwrap().expect("second record survives");
    assert_eq!(record.payload, 2u64.to_le_bytes());
    assert!(reader.skipped_records() >= 1);
}

#[test]
fn test_late_attaching_reader_sees_full_history() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("late.seg");
    let group = StorageGroup::create(GroupConfig::new("late", 1).with_file_path(&path)).unwrap();

    let first = group.register::<(u32,)>(here!(), "first", "a $0").unwrap();
    let second = group
        .register::<(f64, f64)>(here!(), "second", "$0 by $1")
        .unwrap();
    group.write(&first, &(10u32,)).unwrap();
    group.write(&second, &(1.5f64, 2.5f64)).unwrap();
    group.write(&first, &(20u32,)).unwrap();

    let mut reader = GroupReader::attach(&path).unwrap();
    let records = reader.drain().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].statement.name, "first");
    assert_eq!(records[1].statement.name, "second");
    assert_eq!(records[2].statement.name, "first");
    assert_eq!(reader.statement_count(), 2);

    // Statements registered after attach are picked up on demand.
    let third = group.register::<(i8,)>(here!(), "third", "").unwrap();
    group.write(&third, &(-1i8,)).unwrap();
    let record = reader.next().unwrap().unwrap();
    assert_eq!(record.statement.name, "third");
    assert_eq!(record.payload, [0xFF]);
    assert_eq!(reader.statement_count(), 3);
}

#[test]
fn test_attach_rejects_non_group_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.dat");
    std::fs::write(&path, vec![0u8; 8192]).unwrap();

    assert!(GroupReader::attach(&path).is_err());
}

#[test]
fn test_storage_names_travel_with_metadata() {
    use scribe::{FieldLayout, Storable, TypeDesc};

    struct SensorHandle(u32);

    impl Storable for SensorHandle {
        const CAN_MEMCPY: bool = false;

        fn type_desc() -> TypeDesc {
            TypeDesc::prim("SensorHandle")
        }

        fn fixed_layout() -> Option<FieldLayout> {
            None
        }

        fn wire_size(&self) -> usize {
            4
        }

        fn store(&self, out: &mut Vec<u8>) {
            out.extend_from_slice(&self.0.to_le_bytes());
        }

        fn storage_name() -> Option<&'static str> {
            Some("SensorHandle")
        }
    }

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("opaque.seg");
    let group = StorageGroup::create(GroupConfig::new("opaque", 1).with_file_path(&path)).unwrap();

    let stmt = group
        .register::<(SensorHandle, u32)>(here!(), "sample", "")
        .unwrap();
    group.write(&stmt, &(SensorHandle(9), 100u32)).unwrap();

    let mut reader = GroupReader::attach(&path).unwrap();
    let record = reader.next().unwrap().unwrap();
    assert_eq!(
        record.statement.storage_names,
        vec!["SensorHandle".to_string()]
    );
    assert_eq!(&record.payload[..4], &9u32.to_le_bytes());
}
