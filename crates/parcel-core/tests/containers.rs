//! 容器编解码的 nil 透传、去重与重复键覆盖语义。

use std::collections::{BTreeMap, BTreeSet};

use parcel_core::Encoder;
use parcel_core::prelude::*;

macro_rules! impl_record_datum {
    ($ty:ty, $name:literal) => {
        impl Datum for $ty {
            fn type_ref() -> TypeRef {
                TypeRef::Named(TypeKey::of::<$ty>($name))
            }

            fn into_slot(self) -> Slot {
                Some(Box::new(self))
            }

            fn from_slot(slot: Option<&dyn DynDatum>) -> parcel_core::Result<Self> {
                expect_value::<$ty>(slot, $name)
            }
        }
    };
}

#[test]
fn nil_elements_round_trip_exactly() {
    let parcel = Parcel::new();
    let input: Vec<Option<String>> = vec![Some("a".to_string()), None, Some("b".to_string()), None];
    let bytes = parcel.encode(&input).expect("编码不应失败");
    let output: Vec<Option<String>> = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input, "每个 nil 元素都应原样往返");
}

#[test]
fn single_nil_element_has_the_expected_wire_shape() {
    let parcel = Parcel::new();
    let input: Vec<Option<String>> = vec![None];
    let bytes = parcel.encode(&input).expect("编码不应失败");
    assert_eq!(bytes.as_ref(), &[0x91, 0xc0], "fixarray(1) + nil");
}

#[test]
fn nil_keys_and_values_round_trip_in_maps() {
    let parcel = Parcel::new();
    let input: BTreeMap<Option<String>, Option<i64>> = BTreeMap::from([
        (None, Some(1)),
        (Some("k".to_string()), None),
        (Some("v".to_string()), Some(-2)),
    ]);
    let bytes = parcel.encode(&input).expect("编码不应失败");
    let output: BTreeMap<Option<String>, Option<i64>> =
        parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input, "nil 键与 nil 值互相独立，均应原样往返");
}

#[test]
fn nil_members_round_trip_in_sets() {
    let parcel = Parcel::new();
    let input: BTreeSet<Option<i64>> = BTreeSet::from([None, Some(0), Some(7)]);
    let bytes = parcel.encode(&input).expect("编码不应失败");
    let output: BTreeSet<Option<i64>> = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input);
}

#[test]
fn duplicate_wire_keys_are_overwritten_in_encounter_order() {
    // 手工构造线格式：同一个键出现两次，后出现的值胜出。
    let mut sink = Encoder::new();
    sink.write_map_header(2).expect("映射头写入不应失败");
    sink.write_str("k").expect("键写入不应失败");
    sink.write_i64(1);
    sink.write_str("k").expect("键写入不应失败");
    sink.write_i64(2);
    let bytes = sink.finish();

    let parcel = Parcel::new();
    let output: BTreeMap<String, i64> = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output.len(), 1);
    assert_eq!(output.get("k"), Some(&2));
}

#[test]
fn duplicate_wire_members_collapse_into_the_set() {
    let mut sink = Encoder::new();
    sink.write_array_header(3).expect("数组头写入不应失败");
    sink.write_str("a").expect("元素写入不应失败");
    sink.write_str("b").expect("元素写入不应失败");
    sink.write_str("a").expect("元素写入不应失败");
    let bytes = sink.finish();

    let parcel = Parcel::new();
    let output: BTreeSet<String> = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(
        output,
        BTreeSet::from(["a".to_string(), "b".to_string()]),
        "重复元素折叠，顺序让位于集合语义"
    );
}

#[derive(Clone, Debug, PartialEq)]
struct Inventory {
    slots: Vec<Option<String>>,
    labels: Option<Vec<String>>,
}

impl_record_datum!(Inventory, "Inventory");

#[test]
fn optional_container_fields_distinguish_absence_from_emptiness() {
    let parcel = Parcel::new();
    parcel.register_record(
        RecordDescriptor::builder::<Inventory>("Inventory")
            .field("slots", |v: &Inventory| v.slots.clone())
            .field("labels", |v: &Inventory| v.labels.clone())
            .construct(|args| {
                Ok(Inventory {
                    slots: args.take()?,
                    labels: args.take()?,
                })
            }),
    );

    let absent = Inventory {
        slots: vec![None, Some("sword".to_string())],
        labels: None,
    };
    let bytes = parcel.encode(&absent).expect("编码不应失败");
    let output: Inventory = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, absent, "容器自身的缺省由字段可空性承载");

    let empty = Inventory {
        slots: vec![],
        labels: Some(vec![]),
    };
    let bytes = parcel.encode(&empty).expect("编码不应失败");
    let output: Inventory = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, empty, "空容器与缺省容器必须可区分");
}

#[test]
fn nested_containers_round_trip() {
    let parcel = Parcel::new();
    let input: Vec<BTreeMap<String, Vec<Option<i64>>>> = vec![
        BTreeMap::from([("xs".to_string(), vec![Some(1), None])]),
        BTreeMap::new(),
    ];
    let bytes = parcel.encode(&input).expect("编码不应失败");
    let output: Vec<BTreeMap<String, Vec<Option<i64>>>> =
        parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input);
}
