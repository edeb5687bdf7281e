use bytes::Bytes;
use parcel_wire::{Decoder, Encoder};

use crate::datum::Datum;
use crate::descriptor::{EnumDescriptor, RecordDescriptor};
use crate::error::Result;
use crate::registry::CodecRegistry;
use crate::value::{DynValue, Slot};

/// `Parcel` 是面向调用方的顶层门面：注册描述符，编码与解码值。
///
/// # 契约说明（What）
/// - 编码产出自描述二进制字节流，解码按类型引用查得编解码器后
///   按位置还原；两侧只要就记录的构造参数顺序达成一致即可互通；
/// - 归一化函数在构造时一次性注入，缺席时装饰机制完全关闭；
/// - 编解码失败只放弃当次操作，已缓存的编解码器继续有效。
pub struct Parcel {
    registry: CodecRegistry,
}

impl Parcel {
    /// 构造不带归一化函数的实例。
    pub fn new() -> Self {
        Self {
            registry: CodecRegistry::new(),
        }
    }

    /// 构造携带归一化函数的实例。
    pub fn with_normalizer<F>(normalizer: F) -> Self
    where
        F: Fn(DynValue) -> Option<DynValue> + Send + Sync + 'static,
    {
        Self {
            registry: CodecRegistry::with_normalizer(normalizer),
        }
    }

    /// 访问底层注册中心。
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// 以可变方式访问底层注册中心（追加自定义构建器等装配期操作）。
    pub fn registry_mut(&mut self) -> &mut CodecRegistry {
        &mut self.registry
    }

    /// 注册记录描述符。
    pub fn register_record(&self, descriptor: RecordDescriptor) {
        self.registry.register_record(descriptor);
    }

    /// 注册枚举描述符。
    pub fn register_enum(&self, descriptor: EnumDescriptor) {
        self.registry.register_enum(descriptor);
    }

    /// 将值编码为字节流。
    pub fn encode<T: Datum>(&self, value: &T) -> Result<Bytes> {
        let codec = self.registry.lookup(&T::type_ref())?;
        let mut sink = Encoder::new();
        let slot: Slot = value.clone().into_slot();
        codec.write(slot.as_deref(), &mut sink, !T::NULLABLE)?;
        Ok(sink.finish())
    }

    /// 从字节流解码出值。
    pub fn decode<T: Datum>(&self, bytes: &[u8]) -> Result<T> {
        let codec = self.registry.lookup(&T::type_ref())?;
        let mut source = Decoder::new(bytes);
        let slot = codec.read(&mut source, !T::NULLABLE)?;
        T::from_slot(slot.as_deref())
    }
}

impl Default for Parcel {
    fn default() -> Self {
        Self::new()
    }
}
