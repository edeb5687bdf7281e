//! 记录编解码的往返与线格式形态验证。

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use parcel_core::Decoder;
use parcel_core::prelude::*;
use proptest::prelude::*;

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

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Channel {
    Email,
    Sms,
    Push,
}

impl_record_datum!(Channel, "Channel");

fn channel_descriptor() -> EnumDescriptor {
    EnumDescriptor::new::<Channel>(
        "Channel",
        vec!["Email", "Sms", "Push"],
        |c| *c as u32,
        |i| match i {
            0 => Some(Channel::Email),
            1 => Some(Channel::Sms),
            2 => Some(Channel::Push),
            _ => None,
        },
    )
}

#[derive(Clone, Debug, PartialEq)]
struct Address {
    city: String,
    zip: Option<String>,
}

impl_record_datum!(Address, "Address");

fn address_descriptor() -> RecordDescriptor {
    RecordDescriptor::builder::<Address>("Address")
        .field("city", |v: &Address| v.city.clone())
        .field("zip", |v: &Address| v.zip.clone())
        .construct(|args| {
            Ok(Address {
                city: args.take()?,
                zip: args.take()?,
            })
        })
}

#[derive(Clone, Debug, PartialEq)]
struct Profile {
    name: String,
    age: i64,
    vip: bool,
    score: Option<u32>,
    rating: f64,
    avatar: Bytes,
    channel: Channel,
    address: Address,
    fallback: Option<Address>,
    tags: Vec<String>,
    attrs: BTreeMap<String, i64>,
}

impl_record_datum!(Profile, "Profile");

fn profile_descriptor() -> RecordDescriptor {
    RecordDescriptor::builder::<Profile>("Profile")
        .field("name", |v: &Profile| v.name.clone())
        .field("age", |v: &Profile| v.age)
        .field("vip", |v: &Profile| v.vip)
        .field("score", |v: &Profile| v.score)
        .field("rating", |v: &Profile| v.rating)
        .field("avatar", |v: &Profile| v.avatar.clone())
        .field("channel", |v: &Profile| v.channel)
        .field("address", |v: &Profile| v.address.clone())
        .field("fallback", |v: &Profile| v.fallback.clone())
        .field("tags", |v: &Profile| v.tags.clone())
        .field("attrs", |v: &Profile| v.attrs.clone())
        .construct(|args| {
            Ok(Profile {
                name: args.take()?,
                age: args.take()?,
                vip: args.take()?,
                score: args.take()?,
                rating: args.take()?,
                avatar: args.take()?,
                channel: args.take()?,
                address: args.take()?,
                fallback: args.take()?,
                tags: args.take()?,
                attrs: args.take()?,
            })
        })
}

fn profile_parcel() -> Parcel {
    let parcel = Parcel::new();
    parcel.register_enum(channel_descriptor());
    parcel.register_record(address_descriptor());
    parcel.register_record(profile_descriptor());
    parcel
}

fn sample_profile() -> Profile {
    Profile {
        name: "ada".to_string(),
        age: 36,
        vip: true,
        score: Some(88),
        rating: 4.5,
        avatar: Bytes::from_static(&[0xde, 0xad]),
        channel: Channel::Sms,
        address: Address {
            city: "harbor".to_string(),
            zip: Some("310000".to_string()),
        },
        fallback: None,
        tags: vec!["alpha".to_string(), "beta".to_string()],
        attrs: BTreeMap::from([("visits".to_string(), 7), ("level".to_string(), -2)]),
    }
}

#[test]
fn full_profile_round_trips() {
    let parcel = profile_parcel();
    let input = sample_profile();
    let bytes = parcel.encode(&input).expect("编码不应失败");
    let output: Profile = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input);
}

#[test]
fn absent_optional_fields_round_trip_as_nil() {
    let parcel = profile_parcel();
    let mut input = sample_profile();
    input.score = None;
    input.fallback = None;
    input.address.zip = None;

    let bytes = parcel.encode(&input).expect("编码不应失败");
    let output: Profile = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input);
}

#[derive(Clone, Debug, PartialEq)]
struct Swapped {
    alpha: String,
    beta: i64,
}

impl_record_datum!(Swapped, "Swapped");

#[test]
fn wire_order_follows_the_descriptor_not_struct_declaration() {
    let parcel = Parcel::new();
    // 描述符按构造参数顺序登记 beta 在前，与结构体声明顺序相反。
    parcel.register_record(
        RecordDescriptor::builder::<Swapped>("Swapped")
            .field("beta", |v: &Swapped| v.beta)
            .field("alpha", |v: &Swapped| v.alpha.clone())
            .construct(|args| {
                let beta = args.take()?;
                let alpha = args.take()?;
                Ok(Swapped { alpha, beta })
            }),
    );

    let input = Swapped {
        alpha: "first-declared".to_string(),
        beta: 42,
    };
    let bytes = parcel.encode(&input).expect("编码不应失败");

    let mut wire = Decoder::new(&bytes);
    assert_eq!(wire.read_array_header().expect("数组头读取不应失败"), 2);
    assert_eq!(wire.read_i64().expect("首槽位应是 beta"), 42);
    assert_eq!(wire.read_str().expect("次槽位应是 alpha"), "first-declared");

    let output: Swapped = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input);
}

#[test]
fn enum_fields_travel_as_ordinals() {
    let parcel = profile_parcel();
    let bytes = parcel.encode(&Channel::Push).expect("编码不应失败");
    assert_eq!(bytes.as_ref(), &[0x02], "枚举线格式是变体序数");
    let output: Channel = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, Channel::Push);
}

#[test]
fn unknown_enum_ordinal_is_rejected() {
    let parcel = profile_parcel();
    let err = parcel
        .decode::<Channel>(&[0x63])
        .expect_err("超出范围的序数应报错");
    assert_eq!(err.code(), codes::CODEC_TYPE_MISMATCH);
    assert!(err.message().contains("Channel"));
}

#[derive(Clone, Debug, PartialEq)]
struct Compact {
    name: String,
    age: i64,
    score: Option<u32>,
    samples: Vec<i64>,
}

impl_record_datum!(Compact, "Compact");

fn compact_parcel() -> Parcel {
    let parcel = Parcel::new();
    parcel.register_record(
        RecordDescriptor::builder::<Compact>("Compact")
            .field("name", |v: &Compact| v.name.clone())
            .field("age", |v: &Compact| v.age)
            .field("score", |v: &Compact| v.score)
            .field("samples", |v: &Compact| v.samples.clone())
            .construct(|args| {
                Ok(Compact {
                    name: args.take()?,
                    age: args.take()?,
                    score: args.take()?,
                    samples: args.take()?,
                })
            }),
    );
    parcel
}

proptest! {
    #[test]
    fn any_compact_value_round_trips(
        name in ".{0,16}",
        age in any::<i64>(),
        score in any::<Option<u32>>(),
        samples in proptest::collection::vec(any::<i64>(), 0..8),
    ) {
        let parcel = compact_parcel();
        let input = Compact { name, age, score, samples };
        let bytes = parcel.encode(&input).expect("编码不应失败");
        let output: Compact = parcel.decode(&bytes).expect("解码不应失败");
        prop_assert_eq!(output, input);
    }
}

#[test]
fn top_level_sets_with_nil_members_round_trip() {
    let parcel = profile_parcel();
    let input: BTreeSet<Option<i64>> = BTreeSet::from([None, Some(-3), Some(14)]);
    let bytes = parcel.encode(&input).expect("编码不应失败");
    let output: BTreeSet<Option<i64>> = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input);
}
