use alloc::boxed::Box;
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use parcel_wire::{Decoder, Encoder};

use crate::codec::{DynCodec, encode_absent};
use crate::error::{CoreError, Result, codes};
use crate::registry::{CodecBuilder, CodecRegistry, ResolutionContext};
use crate::schema::TypeRef;
use crate::value::{DynDatum, DynMap, DynSeq, DynSet, Slot};

/// 容器编解码器族：序列、集合、映射。
///
/// # 设计背景（Why）
/// - 三者都由注册中心在构建期组合元素编解码器而成，元素查找发生在
///   容器自身的解析帧之内，归一化传染因此自然覆盖容器内容；
/// - 元素、键、值槽位一律以可空方式读写（`required = false`），
///   容器声明类型上的可空性只约束容器值本身是否可缺省。
///
/// # 契约说明（What）
/// - 序列与集合共用数组线格式；集合读取保留出现顺序，去重推迟到
///   带类型层；
/// - 映射使用键值对线格式，重复键同样由带类型层按后出现者覆盖。
#[derive(Debug)]
pub(crate) struct SeqCodec {
    elem: Arc<dyn DynCodec>,
}

impl SeqCodec {
    pub(crate) fn new(elem: Arc<dyn DynCodec>) -> Self {
        Self { elem }
    }
}

impl DynCodec for SeqCodec {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        let Some(value) = value else {
            return encode_absent(sink, required, "sequence");
        };
        let seq = expect::<DynSeq>(value, "sequence")?;
        sink.write_array_header(seq.0.len())?;
        for slot in &seq.0 {
            self.elem.write(slot.as_deref(), sink, false)?;
        }
        Ok(())
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        if !required && source.try_skip_nil()? {
            return Ok(None);
        }
        let count = source.read_array_header()?;
        let slots = read_slots(&self.elem, source, count)?;
        Ok(Some(Box::new(DynSeq(slots))))
    }
}

#[derive(Debug)]
pub(crate) struct SetCodec {
    elem: Arc<dyn DynCodec>,
}

impl SetCodec {
    pub(crate) fn new(elem: Arc<dyn DynCodec>) -> Self {
        Self { elem }
    }
}

impl DynCodec for SetCodec {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        let Some(value) = value else {
            return encode_absent(sink, required, "set");
        };
        let set = expect::<DynSet>(value, "set")?;
        sink.write_array_header(set.0.len())?;
        for slot in &set.0 {
            self.elem.write(slot.as_deref(), sink, false)?;
        }
        Ok(())
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        if !required && source.try_skip_nil()? {
            return Ok(None);
        }
        let count = source.read_array_header()?;
        let slots = read_slots(&self.elem, source, count)?;
        Ok(Some(Box::new(DynSet(slots))))
    }
}

#[derive(Debug)]
pub(crate) struct MapCodec {
    key: Arc<dyn DynCodec>,
    value: Arc<dyn DynCodec>,
}

impl MapCodec {
    pub(crate) fn new(key: Arc<dyn DynCodec>, value: Arc<dyn DynCodec>) -> Self {
        Self { key, value }
    }
}

impl DynCodec for MapCodec {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        let Some(value) = value else {
            return encode_absent(sink, required, "map");
        };
        let map = expect::<DynMap>(value, "map")?;
        sink.write_map_header(map.0.len())?;
        for (key, val) in &map.0 {
            self.key.write(key.as_deref(), sink, false)?;
            self.value.write(val.as_deref(), sink, false)?;
        }
        Ok(())
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        if !required && source.try_skip_nil()? {
            return Ok(None);
        }
        let count = source.read_map_header()?;
        let mut entries = Vec::new();
        for _ in 0..count {
            let key = self.key.read(source, false)?;
            let value = self.value.read(source, false)?;
            entries.push((key, value));
        }
        Ok(Some(Box::new(DynMap(entries))))
    }
}

/// 按计数读出元素槽位，序列与集合共用。
fn read_slots(
    elem: &Arc<dyn DynCodec>,
    source: &mut Decoder<'_>,
    count: usize,
) -> Result<Vec<Slot>> {
    let mut slots = Vec::new();
    for _ in 0..count {
        slots.push(elem.read(source, false)?);
    }
    Ok(slots)
}

fn expect<'a, C: Any>(value: &'a dyn DynDatum, kind: &'static str) -> Result<&'a C> {
    value.as_any().downcast_ref::<C>().ok_or_else(|| {
        CoreError::new(
            codes::CODEC_TYPE_MISMATCH,
            format!("dynamic value {value:?} is not a {kind}"),
        )
    })
}

/// 构建链中的容器构建器，元素编解码器经由注册中心递归获取。
pub(crate) struct ContainerCodecBuilder;

impl CodecBuilder for ContainerCodecBuilder {
    fn matches(&self, _registry: &CodecRegistry, ty: &TypeRef) -> bool {
        matches!(ty, TypeRef::Seq(_) | TypeRef::Set(_) | TypeRef::Map(..))
    }

    fn build(
        &self,
        registry: &CodecRegistry,
        cx: &mut ResolutionContext,
        ty: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>> {
        match ty {
            TypeRef::Seq(elem) => {
                let elem = registry.lookup_with(cx, elem)?;
                Ok(Arc::new(SeqCodec::new(elem)))
            }
            TypeRef::Set(elem) => {
                let elem = registry.lookup_with(cx, elem)?;
                Ok(Arc::new(SetCodec::new(elem)))
            }
            TypeRef::Map(key, value) => {
                let key = registry.lookup_with(cx, key)?;
                let value = registry.lookup_with(cx, value)?;
                Ok(Arc::new(MapCodec::new(key, value)))
            }
            other => Err(CoreError::new(
                codes::CODEC_FAILURE,
                format!("container builder invoked for non-container reference `{other}`"),
            )),
        }
    }
}
