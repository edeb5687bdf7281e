use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;

use parcel_wire::{Decoder, Encoder};
use spin::Once;

use crate::codec::{DynCodec, encode_absent};
use crate::descriptor::{ArgList, RecordDescriptor};
use crate::error::{CoreError, Result, codes};
use crate::registry::{CodecBuilder, CodecRegistry, ResolutionContext};
use crate::schema::TypeRef;
use crate::value::{DynDatum, Slot};

/// 已绑定字段：递归获取的字段编解码器加上由可空性导出的必填标志。
#[derive(Debug)]
struct BoundField {
    codec: Arc<dyn DynCodec>,
    required: bool,
}

/// `RecordCodec` 把一个记录类型编为长度前缀的字段值序列。
///
/// # 契约说明（What）
/// - 写入按描述符字段顺序输出，数组头长度恒等于构造参数个数；
/// - 读取不把数组头计数与参数个数交叉校验，读取节奏完全由
///   字段编解码器序列决定；
/// - 规范构造器拒绝参数时包装为 `codec.instantiation`，
///   携带类型名、完整实参列表与底层原因。
#[derive(Debug)]
pub(crate) struct RecordCodec {
    descriptor: Arc<RecordDescriptor>,
    fields: Vec<BoundField>,
}

impl DynCodec for RecordCodec {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        let Some(value) = value else {
            return encode_absent(sink, required, self.descriptor.name());
        };
        sink.write_array_header(self.descriptor.arity())?;
        for (spec, bound) in self.descriptor.fields().iter().zip(&self.fields) {
            let slot = spec.read_from(value)?;
            bound.codec.write(slot.as_deref(), sink, bound.required)?;
        }
        Ok(())
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        if !required && source.try_skip_nil()? {
            return Ok(None);
        }
        let _count = source.read_array_header()?;
        let mut slots = Vec::with_capacity(self.fields.len());
        for bound in &self.fields {
            slots.push(bound.codec.read(source, bound.required)?);
        }
        let mut args = ArgList::new(&slots);
        match self.descriptor.instantiate(&mut args) {
            Ok(value) => Ok(Some(value)),
            Err(cause) => Err(CoreError::new(
                codes::CODEC_INSTANTIATION,
                format!(
                    "failed to instantiate `{}` with arguments {slots:?}",
                    self.descriptor.name()
                ),
            )
            .with_cause(cause)),
        }
    }
}

/// 记录构建期的惰性单元，用于打断自引用类型的构建环。
///
/// # 设计背景（Why）
/// - 自引用记录（例如映射值又是本记录类型）在绑定字段编解码器时
///   会再次查到自身；此时返回指向本单元的引用编解码器，
///   构建完成后单元被绑定到最终的记录编解码器；
/// - 单元归属于一次解析上下文，随上下文消亡，不进入注册中心缓存。
#[derive(Debug)]
pub(crate) struct CodecCell(Once<Arc<dyn DynCodec>>);

impl CodecCell {
    pub(crate) fn new() -> Self {
        Self(Once::new())
    }

    fn bind(&self, codec: Arc<dyn DynCodec>) {
        self.0.call_once(|| codec);
    }

    fn get(&self) -> Option<&Arc<dyn DynCodec>> {
        self.0.get()
    }
}

/// 指向构建中记录的引用编解码器，读写时解引用到最终实现。
///
/// 装饰器照常包裹在引用之外，递归层级上的归一化因此逐层生效。
#[derive(Debug)]
pub(crate) struct RecursiveCodec {
    cell: Arc<CodecCell>,
}

impl RecursiveCodec {
    pub(crate) fn new(cell: Arc<CodecCell>) -> Self {
        Self { cell }
    }

    fn resolve(&self) -> Result<&Arc<dyn DynCodec>> {
        self.cell.get().ok_or_else(|| {
            CoreError::new(
                codes::CODEC_FAILURE,
                "recursive codec was used before its record build completed",
            )
        })
    }
}

impl DynCodec for RecursiveCodec {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        self.resolve()?.write(value, sink, required)
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        self.resolve()?.read(source, required)
    }
}

/// 构建链首位的记录构建器。
///
/// # 契约说明（What）
/// - 认领所有注册过记录描述符的具名类型，以及以此类类型为基的
///   参数化实例；
/// - 参数化实例一律以 `codec.type_unsupported` 拒绝，无论基类型
///   此前是否已被解析过；
/// - 每个构造参数按声明类型引用递归获取字段编解码器，必填标志取
///   可空性的反面。
pub(crate) struct RecordCodecBuilder;

impl CodecBuilder for RecordCodecBuilder {
    fn matches(&self, registry: &CodecRegistry, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Named(key) => registry.record_descriptor(key).is_some(),
            TypeRef::Parameterized { base, .. } => registry.record_descriptor(base).is_some(),
            _ => false,
        }
    }

    fn build(
        &self,
        registry: &CodecRegistry,
        cx: &mut ResolutionContext,
        ty: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>> {
        if let TypeRef::Parameterized { .. } = ty {
            return Err(CoreError::new(
                codes::CODEC_TYPE_UNSUPPORTED,
                format!("parameterized record types are not supported (`{ty}`)"),
            ));
        }
        let descriptor = ty
            .named_key()
            .and_then(|key| registry.record_descriptor(key))
            .ok_or_else(|| {
                CoreError::new(
                    codes::CODEC_FAILURE,
                    format!("record builder invoked for unregistered reference `{ty}`"),
                )
            })?;

        let cell = cx.begin_record(ty.clone());
        let bound = bind_fields(registry, cx, &descriptor);
        cx.finish_record(ty);
        let fields = bound?;

        let codec: Arc<dyn DynCodec> = Arc::new(RecordCodec { descriptor, fields });
        cell.bind(codec.clone());
        Ok(codec)
    }
}

fn bind_fields(
    registry: &CodecRegistry,
    cx: &mut ResolutionContext,
    descriptor: &RecordDescriptor,
) -> Result<Vec<BoundField>> {
    descriptor
        .fields()
        .iter()
        .map(|spec| {
            let codec = registry.lookup_with(cx, spec.declared_type())?;
            Ok(BoundField {
                codec,
                required: !spec.nullable(),
            })
        })
        .collect()
}
