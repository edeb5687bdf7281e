#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![doc = "parcel-wire: parcel 框架的底层字节编解码原语。"]
#![doc = ""]
#![doc = "实现 MessagePack 兼容子集：nil 标记、布尔、整数家族、f64、字符串、"]
#![doc = "二进制串，以及数组/键值对长度头。上层类型导向的编解码子系统只通过"]
#![doc = "[`Encoder`]/[`Decoder`] 这一对能力与字节打交道，线格式细节全部封闭在本 crate。"]

extern crate alloc;

mod decoder;
mod encoder;
mod error;
mod marker;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{WireError, codes};

/// 字节层统一返回值别名。
pub type Result<T, E = WireError> = core::result::Result<T, E>;
