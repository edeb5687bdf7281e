use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use bytes::Bytes;

use crate::error::{CoreError, Result, codes};
use crate::schema::{TypeKey, TypeRef};
use crate::value::{DynDatum, DynMap, DynSeq, DynSet, Slot};

/// `Datum` 是带类型世界与动态值层之间的桥梁。
///
/// # 设计背景（Why）
/// - 编解码器在类型擦除层工作，而调用方持有的是具体 Rust 类型；
///   每个可编解码类型声明自己的类型引用与动态形态转换，
///   转换逻辑随字段类型单态化，嵌套容器无需在运行期枚举；
/// - 可空性由类型自身的 `Option` 包装决定，不允许按使用点配置，
///   `NULLABLE` 常量把这条规则固化在类型层面。
///
/// # 契约说明（What）
/// - `type_ref` 返回查找用的类型引用，`Option<E>` 与 `E` 返回同一引用，
///   可空性只体现在 `NULLABLE` 标志上；
/// - `into_slot` 把值转为动态槽位（缺省值对应 `None`）；
/// - `from_slot` 从借用的槽位还原带类型值，槽位保持存活，
///   因此构造失败时仍能完整报告实参列表。
pub trait Datum: Clone + Send + fmt::Debug + Sized + 'static {
    /// 该类型是否允许缺省。仅 `Option<E>` 覆写为 `true`。
    const NULLABLE: bool = false;

    /// 查找用的类型引用。
    fn type_ref() -> TypeRef;

    /// 转为动态槽位。
    fn into_slot(self) -> Slot;

    /// 从动态槽位还原。
    fn from_slot(slot: Option<&dyn DynDatum>) -> Result<Self>;
}

/// 从槽位中取出 `T` 类型的值并克隆，缺省或类型不符时报错。
///
/// 记录与枚举类型的 `Datum` 实现直接以本函数充当 `from_slot`。
pub fn expect_value<T: Any + Clone + fmt::Debug>(
    slot: Option<&dyn DynDatum>,
    type_name: &'static str,
) -> Result<T> {
    let value = slot.ok_or_else(|| {
        CoreError::new(
            codes::CODEC_TYPE_MISMATCH,
            format!("nil value where `{type_name}` was expected"),
        )
    })?;
    value.as_any().downcast_ref::<T>().cloned().ok_or_else(|| {
        CoreError::new(
            codes::CODEC_TYPE_MISMATCH,
            format!("dynamic value {value:?} is not a `{type_name}`"),
        )
    })
}

macro_rules! scalar_datum {
    ($ty:ty, $name:literal) => {
        impl Datum for $ty {
            fn type_ref() -> TypeRef {
                TypeRef::Named(TypeKey::of::<$ty>($name))
            }

            fn into_slot(self) -> Slot {
                Some(Box::new(self))
            }

            fn from_slot(slot: Option<&dyn DynDatum>) -> Result<Self> {
                expect_value::<$ty>(slot, $name)
            }
        }
    };
}

scalar_datum!(bool, "bool");
scalar_datum!(i32, "i32");
scalar_datum!(i64, "i64");
scalar_datum!(u32, "u32");
scalar_datum!(u64, "u64");
scalar_datum!(f64, "f64");
scalar_datum!(String, "String");
scalar_datum!(Bytes, "Bytes");

impl<E: Datum> Datum for Option<E> {
    const NULLABLE: bool = true;

    fn type_ref() -> TypeRef {
        // 可空性不进入类型引用，查找永远面向内层类型。
        E::type_ref()
    }

    fn into_slot(self) -> Slot {
        self.and_then(E::into_slot)
    }

    fn from_slot(slot: Option<&dyn DynDatum>) -> Result<Self> {
        match slot {
            None => Ok(None),
            Some(value) => E::from_slot(Some(value)).map(Some),
        }
    }
}

impl<E: Datum> Datum for Vec<E> {
    fn type_ref() -> TypeRef {
        TypeRef::seq(E::type_ref())
    }

    fn into_slot(self) -> Slot {
        let slots = self.into_iter().map(E::into_slot).collect();
        Some(Box::new(DynSeq(slots)))
    }

    fn from_slot(slot: Option<&dyn DynDatum>) -> Result<Self> {
        let seq = expect_container::<DynSeq>(slot, "sequence")?;
        seq.0
            .iter()
            .map(|slot| E::from_slot(slot.as_deref()))
            .collect()
    }
}

impl<E: Datum + Ord> Datum for BTreeSet<E> {
    fn type_ref() -> TypeRef {
        TypeRef::set(E::type_ref())
    }

    fn into_slot(self) -> Slot {
        let slots = self.into_iter().map(E::into_slot).collect();
        Some(Box::new(DynSet(slots)))
    }

    fn from_slot(slot: Option<&dyn DynDatum>) -> Result<Self> {
        // 线格式上的重复元素在此折叠，出现顺序被集合语义取代。
        let set = expect_container::<DynSet>(slot, "set")?;
        set.0
            .iter()
            .map(|slot| E::from_slot(slot.as_deref()))
            .collect()
    }
}

impl<K: Datum + Ord, V: Datum> Datum for BTreeMap<K, V> {
    fn type_ref() -> TypeRef {
        TypeRef::map(K::type_ref(), V::type_ref())
    }

    fn into_slot(self) -> Slot {
        let entries = self
            .into_iter()
            .map(|(key, value)| (key.into_slot(), value.into_slot()))
            .collect();
        Some(Box::new(DynMap(entries)))
    }

    fn from_slot(slot: Option<&dyn DynDatum>) -> Result<Self> {
        let entries = expect_container::<DynMap>(slot, "map")?;
        let mut map = BTreeMap::new();
        for (key, value) in &entries.0 {
            // 按出现顺序插入，重复键由后出现者覆盖。
            map.insert(K::from_slot(key.as_deref())?, V::from_slot(value.as_deref())?);
        }
        Ok(map)
    }
}

fn expect_container<'a, C: Any>(
    slot: Option<&'a dyn DynDatum>,
    kind: &'static str,
) -> Result<&'a C> {
    let value = slot.ok_or_else(|| {
        CoreError::new(
            codes::CODEC_TYPE_MISMATCH,
            format!("nil value where a {kind} was expected"),
        )
    })?;
    value.as_any().downcast_ref::<C>().ok_or_else(|| {
        CoreError::new(
            codes::CODEC_TYPE_MISMATCH,
            format!("dynamic value {value:?} is not a {kind}"),
        )
    })
}
