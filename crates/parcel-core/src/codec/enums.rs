use alloc::format;
use alloc::sync::Arc;

use parcel_wire::{Decoder, Encoder};

use crate::codec::{DynCodec, encode_absent};
use crate::descriptor::EnumDescriptor;
use crate::error::{CoreError, Result, codes};
use crate::registry::{CodecBuilder, CodecRegistry, ResolutionContext};
use crate::schema::TypeRef;
use crate::value::{DynDatum, Slot};

/// 单值枚举的编解码器，线格式为变体序数（无符号整数）。
#[derive(Debug)]
pub(crate) struct EnumCodec {
    descriptor: Arc<EnumDescriptor>,
}

impl EnumCodec {
    pub(crate) fn new(descriptor: Arc<EnumDescriptor>) -> Self {
        Self { descriptor }
    }
}

impl DynCodec for EnumCodec {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        let Some(value) = value else {
            return encode_absent(sink, required, self.descriptor.name());
        };
        let ordinal = self.descriptor.ordinal_of(value)?;
        sink.write_u64(u64::from(ordinal));
        Ok(())
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        if !required && source.try_skip_nil()? {
            return Ok(None);
        }
        let raw = source.read_u64()?;
        let ordinal = u32::try_from(raw).map_err(|_| {
            CoreError::new(
                codes::CODEC_TYPE_MISMATCH,
                format!(
                    "ordinal {raw} is out of range for enum `{}`",
                    self.descriptor.name()
                ),
            )
        })?;
        self.descriptor.from_ordinal(ordinal).map(Some)
    }
}

/// 构建链中的枚举回退构建器，认领所有已注册枚举类型。
pub(crate) struct EnumCodecBuilder;

impl CodecBuilder for EnumCodecBuilder {
    fn matches(&self, registry: &CodecRegistry, ty: &TypeRef) -> bool {
        ty.named_key()
            .is_some_and(|key| registry.enum_descriptor(key).is_some())
    }

    fn build(
        &self,
        registry: &CodecRegistry,
        _cx: &mut ResolutionContext,
        ty: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>> {
        let descriptor = ty
            .named_key()
            .and_then(|key| registry.enum_descriptor(key))
            .ok_or_else(|| {
                CoreError::new(
                    codes::CODEC_FAILURE,
                    format!("enum builder invoked for unregistered reference `{ty}`"),
                )
            })?;
        Ok(Arc::new(EnumCodec::new(descriptor)))
    }
}
