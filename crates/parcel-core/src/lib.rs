#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![allow(private_bounds)]
#![doc = "parcel-core: 类型导向的记录编解码注册与构建子系统。"]
#![doc = ""]
#![doc = "记录类型在注册期以描述符显式声明（有序构造参数、配对访问器、可空性、"]
#![doc = "归一化标记），编解码器在首次查找时惰性构建并按根查找缓存；容器字段的"]
#![doc = "编解码器由注册中心递归组合；解码进入带标记类型的子树后，所有可达值"]
#![doc = "都会经过调用方注入的归一化函数。字节层线格式由 `parcel-wire` 承担。"]

extern crate alloc;

mod sealed;

mod codec;
mod datum;
mod descriptor;
mod error;
mod pack;
pub mod prelude;
mod registry;
mod schema;
mod value;

use core::fmt;

/// 对象安全的错误抽象，在 `no_std + alloc` 环境中替代 `std::error::Error`。
///
/// # 设计背景（Why）
/// - `std::error::Error` 在 `no_std` 环境不可用，而错误链（根因回溯）
///   是排障的基本能力，需要一个平台无关的等价抽象；
/// - `source` 语义与 `std::error::Error::source` 保持一致，
///   便于与现有生态的错误处理约定对接。
///
/// # 契约说明（What）
/// - 实现类型须提供 `Debug` 与 `Display`；
/// - `source` 返回的引用生命周期受限于 `self`；链路在不提供
///   `source` 的底层错误处终止，这是允许的边界情况。
pub trait Error: fmt::Debug + fmt::Display + sealed::Sealed {
    /// 返回当前错误的上游来源。
    fn source(&self) -> Option<&(dyn Error + 'static)>;
}

impl<E> Error for alloc::boxed::Box<E>
where
    E: Error + ?Sized,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        (**self).source()
    }
}

pub use codec::{DynCodec, Normalizer};
pub use datum::{Datum, expect_value};
pub use descriptor::{ArgList, EnumDescriptor, FieldSpec, RecordDescriptor, RecordDescriptorBuilder};
pub use error::{CoreError, ErrorCause, Result, codes};
pub use pack::Parcel;
pub use registry::{CodecBuilder, CodecRegistry, ResolutionContext};
pub use schema::{TypeKey, TypeRef, resolve};
pub use value::{DynDatum, DynMap, DynSeq, DynSet, DynValue, Slot};

pub use parcel_wire::{Decoder, Encoder, WireError};
