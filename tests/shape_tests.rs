//! Payload shape resolution against the public API

use scribe::{
    decode, FieldLayout, Payload, PayloadShape, ScribeError, Storable, TypeDesc,
};

#[test]
fn test_shape_descriptor_round_trips() {
    let shape = PayloadShape::of::<(u32, f64, [i16; 3])>().unwrap();
    let decoded = decode(&shape.desc_bytes).unwrap();
    assert_eq!(decoded, shape.desc);
    assert_eq!(
        shape.desc,
        TypeDesc::tuple(vec![
            TypeDesc::prim("int"),
            TypeDesc::prim("double"),
            TypeDesc::fixed_array(TypeDesc::prim("short"), 3),
        ])
    );
    assert_eq!(shape.count, 3);
}

#[test]
fn test_memcpy_eligibility_requires_packed_layout() {
    // homogeneous ints pack
    let shape = PayloadShape::of::<(u32, u32)>().unwrap();
    assert!(shape.can_memcpy);
    assert_eq!(shape.layout.as_ref().unwrap().size, 8);

    // internal padding disqualifies
    let shape = PayloadShape::of::<(u8, u64)>().unwrap();
    assert!(!shape.can_memcpy);
    assert!(shape.layout.is_none());

    // variable-length content disqualifies
    let shape = PayloadShape::of::<(u64, Vec<u8>)>().unwrap();
    assert!(!shape.can_memcpy);
}

#[test]
fn test_empty_and_single_shapes() {
    let empty = PayloadShape::of::<()>().unwrap();
    assert_eq!(empty.desc, TypeDesc::prim("unit"));
    assert_eq!(empty.count, 0);
    assert!(!empty.can_memcpy);

    let single = PayloadShape::of::<(i64,)>().unwrap();
    assert_eq!(single.desc, TypeDesc::prim("long"));
    assert_eq!(single.count, 1);
    assert!(single.can_memcpy);
    assert_eq!(single.layout.unwrap().size, 8);
}

struct Unfinished;

impl Storable for Unfinished {
    const CAN_MEMCPY: bool = false;

    fn type_desc() -> TypeDesc {
        TypeDesc::var("a")
    }

    fn fixed_layout() -> Option<FieldLayout> {
        None
    }

    fn wire_size(&self) -> usize {
        0
    }

    fn store(&self, _out: &mut Vec<u8>) {}
}

#[test]
fn test_type_variables_fail_resolution() {
    let err = PayloadShape::of::<(Unfinished,)>().unwrap_err();
    assert!(matches!(err, ScribeError::UnresolvedPayloadType { .. }));

    // nested inside a composite as well
    let err = PayloadShape::of::<(u32, (Unfinished, u8))>().unwrap_err();
    assert!(matches!(err, ScribeError::UnresolvedPayloadType { .. }));
}

#[test]
fn test_encoded_size_matches_encode_output() {
    let records: Vec<(u32, Vec<u8>, &str)> = vec![
        (1, vec![], ""),
        (2, vec![1, 2, 3], "abc"),
        (3, vec![0; 100], "a longer string payload"),
    ];
    for record in &records {
        let mut out = Vec::new();
        record.encode(&mut out);
        assert_eq!(out.len(), record.encoded_size());
    }
}
