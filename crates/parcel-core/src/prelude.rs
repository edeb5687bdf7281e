//! # parcel-core Prelude
//!
//! 为上层 crate 提供稳定、浅路径的一站式导入面。
//! 仅收录跨模块高频依赖的类型；边缘能力请使用明确命名空间。

pub use crate::datum::{Datum, expect_value};
pub use crate::descriptor::{ArgList, EnumDescriptor, RecordDescriptor};
pub use crate::error::{CoreError, Result, codes};
pub use crate::pack::Parcel;
pub use crate::registry::CodecRegistry;
pub use crate::schema::{TypeKey, TypeRef};
pub use crate::value::{DynDatum, DynMap, DynSeq, DynSet, DynValue, Slot};
