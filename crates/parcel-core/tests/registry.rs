//! 注册中心的构建期拒绝路径、错误语义与查找稳定性。

use parcel_core::prelude::*;
use parcel_core::{Decoder, Encoder};
use thiserror::Error;

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

/// 声明签名里带无界类型变量的记录，注册后构建必须失败。
#[derive(Clone, Debug, PartialEq)]
struct HoldsUnbounded {
    value: i64,
}

impl_record_datum!(HoldsUnbounded, "HoldsUnbounded");

#[test]
fn unbounded_type_variable_fails_before_any_bytes_move() {
    let parcel = Parcel::new();
    parcel.register_record(
        RecordDescriptor::builder::<HoldsUnbounded>("HoldsUnbounded")
            .field_with_ref("value", TypeRef::var("T", vec![]), |v: &HoldsUnbounded| {
                v.value
            })
            .construct(|args| {
                Ok(HoldsUnbounded {
                    value: args.take()?,
                })
            }),
    );

    let err = parcel
        .encode(&HoldsUnbounded { value: 1 })
        .expect_err("无界类型变量应在构建期失败");
    assert_eq!(err.code(), codes::CODEC_TYPE_UNSUPPORTED);
    assert!(err.message().contains("`T`"), "错误信息应点名类型变量");
}

#[derive(Clone, Debug, PartialEq)]
struct HoldsMultiBounded {
    value: i64,
}

impl_record_datum!(HoldsMultiBounded, "HoldsMultiBounded");

#[test]
fn multiple_bounded_type_variable_is_rejected() {
    let parcel = Parcel::new();
    parcel.register_record(
        RecordDescriptor::builder::<HoldsMultiBounded>("HoldsMultiBounded")
            .field_with_ref(
                "value",
                TypeRef::var("B", vec![i64::type_ref(), String::type_ref()]),
                |v: &HoldsMultiBounded| v.value,
            )
            .construct(|args| {
                Ok(HoldsMultiBounded {
                    value: args.take()?,
                })
            }),
    );

    let err = parcel
        .registry()
        .lookup(&HoldsMultiBounded::type_ref())
        .expect_err("多界类型变量应在构建期失败");
    assert_eq!(err.code(), codes::CODEC_TYPE_UNSUPPORTED);
}

#[derive(Clone, Debug, PartialEq)]
struct HoldsBounded {
    text: String,
}

impl_record_datum!(HoldsBounded, "HoldsBounded");

#[test]
fn single_bounded_variable_collapses_and_round_trips() {
    let parcel = Parcel::new();
    parcel.register_record(
        RecordDescriptor::builder::<HoldsBounded>("HoldsBounded")
            .field_with_ref(
                "text",
                TypeRef::var("E", vec![String::type_ref()]),
                |v: &HoldsBounded| v.text.clone(),
            )
            .construct(|args| {
                Ok(HoldsBounded {
                    text: args.take()?,
                })
            }),
    );

    let input = HoldsBounded {
        text: "bounded".to_string(),
    };
    let bytes = parcel.encode(&input).expect("单界变量应归一化后正常编码");
    let output: HoldsBounded = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output, input);
}

#[derive(Clone, Debug, PartialEq)]
struct Boxy {
    label: String,
}

impl_record_datum!(Boxy, "Boxy");

fn boxy_descriptor() -> RecordDescriptor {
    RecordDescriptor::builder::<Boxy>("Boxy")
        .field("label", |v: &Boxy| v.label.clone())
        .construct(|args| {
            Ok(Boxy {
                label: args.take()?,
            })
        })
}

#[test]
fn parameterized_record_instances_are_always_rejected() {
    let parcel = Parcel::new();
    parcel.register_record(boxy_descriptor());

    let base_key = match Boxy::type_ref() {
        TypeRef::Named(key) => key,
        _ => unreachable!(),
    };
    let parameterized = TypeRef::Parameterized {
        base: base_key,
        args: vec![String::type_ref()],
    };

    let err = parcel
        .registry()
        .lookup(&parameterized)
        .expect_err("参数化记录实例应被拒绝");
    assert_eq!(err.code(), codes::CODEC_TYPE_UNSUPPORTED);
    assert!(err.message().contains("Boxy<String>"));

    // 基类型解析成功后再次请求参数化实例，拒绝语义不变。
    parcel
        .registry()
        .lookup(&Boxy::type_ref())
        .expect("基类型本身应可构建");
    let err = parcel
        .registry()
        .lookup(&parameterized)
        .expect_err("缓存存在时参数化实例仍应被拒绝");
    assert_eq!(err.code(), codes::CODEC_TYPE_UNSUPPORTED);
}

#[derive(Clone, Debug, PartialEq)]
struct Counted {
    count: i64,
}

impl_record_datum!(Counted, "Counted");

#[derive(Debug, Error)]
#[error("count must be positive, got {0}")]
struct CountRange(i64);

#[test]
fn constructor_rejection_reports_type_args_and_cause() {
    let parcel = Parcel::new();
    parcel.register_record(
        RecordDescriptor::builder::<Counted>("Counted")
            .field("count", |v: &Counted| v.count)
            .construct(|args| {
                let count: i64 = args.take()?;
                if count <= 0 {
                    return Err(CoreError::new(
                        codes::CODEC_FAILURE,
                        "count invariant violated",
                    )
                    .with_std_cause(CountRange(count)));
                }
                Ok(Counted { count })
            }),
    );

    // 合法值正常往返。
    let bytes = parcel.encode(&Counted { count: 5 }).expect("编码不应失败");
    let output: Counted = parcel.decode(&bytes).expect("解码不应失败");
    assert_eq!(output.count, 5);

    // 手工构造违反不变式的线格式，构造器拒绝并包装完整上下文。
    let mut sink = Encoder::new();
    sink.write_array_header(1).expect("数组头写入不应失败");
    sink.write_i64(-3);
    let bytes = sink.finish();

    let err = parcel
        .decode::<Counted>(&bytes)
        .expect_err("构造器拒绝应上抛");
    assert_eq!(err.code(), codes::CODEC_INSTANTIATION);
    assert!(err.message().contains("Counted"), "错误信息应带类型名");
    assert!(err.message().contains("-3"), "错误信息应带实参列表");
    assert!(err.cause().is_some(), "底层原因应保留");
}

/// 实现了 `Datum` 但从未注册描述符的类型。
#[derive(Clone, Debug, PartialEq)]
struct Mystery {
    token: String,
}

impl_record_datum!(Mystery, "Mystery");

#[derive(Clone, Debug, PartialEq)]
struct Wrapper {
    inner: Mystery,
}

impl_record_datum!(Wrapper, "Wrapper");

#[test]
fn lookup_failures_carry_the_resolution_trail() {
    let parcel = Parcel::new();
    parcel.register_record(
        RecordDescriptor::builder::<Wrapper>("Wrapper")
            .field("inner", |v: &Wrapper| v.inner.clone())
            .construct(|args| {
                Ok(Wrapper {
                    inner: args.take()?,
                })
            }),
    );

    let err = parcel
        .registry()
        .lookup(&Wrapper::type_ref())
        .expect_err("未注册的字段类型应失败");
    assert_eq!(err.code(), codes::CODEC_BUILD_UNMATCHED);
    let trail = err.trail().expect("查找链路内失败应附带解析栈轨迹");
    assert_eq!(trail, &["Wrapper".to_string(), "Mystery".to_string()]);
    assert!(err.to_string().contains("Wrapper -> Mystery"));
}

#[test]
fn failed_lookups_leave_cached_codecs_usable() {
    let parcel = Parcel::new();
    parcel.register_record(boxy_descriptor());

    let input = Boxy {
        label: "ok".to_string(),
    };
    let bytes = parcel.encode(&input).expect("编码不应失败");

    parcel
        .registry()
        .lookup(&Mystery::type_ref())
        .expect_err("未注册类型应失败");

    let output: Boxy = parcel.decode(&bytes).expect("失败后缓存应继续可用");
    assert_eq!(output, input);
}

#[test]
fn absent_value_in_required_slot_raises_instead_of_writing_nil() {
    let parcel = Parcel::new();
    let codec = parcel
        .registry()
        .lookup(&String::type_ref())
        .expect("标量查找不应失败");

    let mut sink = Encoder::new();
    let err = codec
        .write(None, &mut sink, true)
        .expect_err("必填槽位缺值必须报错");
    assert_eq!(err.code(), codes::CODEC_TYPE_MISMATCH);
    assert_eq!(sink.len(), 0, "失败时不得写出任何字节");

    // 可空槽位缺值正常落为 nil。
    codec
        .write(None, &mut sink, false)
        .expect("可空槽位缺值应写 nil");
    let bytes = sink.finish();
    assert_eq!(bytes.as_ref(), &[0xc0]);
    let mut source = Decoder::new(&bytes);
    assert!(source.try_skip_nil().expect("nil 探测不应失败"));
}

#[test]
fn wire_errors_pass_through_with_their_own_codes() {
    let parcel = Parcel::new();
    parcel.register_record(boxy_descriptor());

    // 截断的输入：数组头声称有 1 个字段，但负载缺失。
    let mut sink = Encoder::new();
    sink.write_array_header(1).expect("数组头写入不应失败");
    let bytes = sink.finish();

    let err = parcel
        .decode::<Boxy>(&bytes)
        .expect_err("截断输入应失败");
    assert_eq!(
        err.code(),
        parcel_wire::codes::WIRE_TRUNCATED,
        "字节层错误码必须原样透传"
    );
}
