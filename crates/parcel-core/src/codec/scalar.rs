use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::marker::PhantomData;

use bytes::Bytes;
use parcel_wire::{Decoder, Encoder, WireError};

use crate::codec::{DynCodec, encode_absent};
use crate::datum::Datum;
use crate::error::{CoreError, Result, codes};
use crate::registry::{CodecBuilder, CodecRegistry, ResolutionContext};
use crate::schema::{TypeKey, TypeRef};
use crate::value::{DynDatum, Slot};

/// 内建标量类型与线格式读写的逐类型绑定。
pub(crate) trait ScalarValue: Datum {
    const NAME: &'static str;

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError>;
    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError>;
}

impl ScalarValue for bool {
    const NAME: &'static str = "bool";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_bool(*self);
        Ok(())
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        source.read_bool()
    }
}

impl ScalarValue for i32 {
    const NAME: &'static str = "i32";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_i64(i64::from(*self));
        Ok(())
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        let value = source.read_i64()?;
        i32::try_from(value)
            .map_err(|_| WireError::type_mismatch(format!("value {value} is out of i32 range")))
    }
}

impl ScalarValue for i64 {
    const NAME: &'static str = "i64";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_i64(*self);
        Ok(())
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        source.read_i64()
    }
}

impl ScalarValue for u32 {
    const NAME: &'static str = "u32";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_u64(u64::from(*self));
        Ok(())
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        let value = source.read_u64()?;
        u32::try_from(value)
            .map_err(|_| WireError::type_mismatch(format!("value {value} is out of u32 range")))
    }
}

impl ScalarValue for u64 {
    const NAME: &'static str = "u64";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_u64(*self);
        Ok(())
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        source.read_u64()
    }
}

impl ScalarValue for f64 {
    const NAME: &'static str = "f64";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_f64(*self);
        Ok(())
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        source.read_f64()
    }
}

impl ScalarValue for String {
    const NAME: &'static str = "String";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_str(self)
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        source.read_str()
    }
}

impl ScalarValue for Bytes {
    const NAME: &'static str = "Bytes";

    fn emit(&self, sink: &mut Encoder) -> Result<(), WireError> {
        sink.write_bin(self)
    }

    fn parse(source: &mut Decoder<'_>) -> Result<Self, WireError> {
        source.read_bin()
    }
}

/// 单个标量类型的编解码器。
pub(crate) struct ScalarCodec<T: ScalarValue>(PhantomData<fn() -> T>);

impl<T: ScalarValue> core::fmt::Debug for ScalarCodec<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ScalarCodec").field(&T::NAME).finish()
    }
}

impl<T: ScalarValue> ScalarCodec<T> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: ScalarValue> DynCodec for ScalarCodec<T> {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        let Some(value) = value else {
            return encode_absent(sink, required, T::NAME);
        };
        let typed = value.as_any().downcast_ref::<T>().ok_or_else(|| {
            CoreError::new(
                codes::CODEC_TYPE_MISMATCH,
                format!("dynamic value {value:?} is not a `{}`", T::NAME),
            )
        })?;
        typed.emit(sink).map_err(CoreError::from)
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        if !required && source.try_skip_nil()? {
            return Ok(None);
        }
        let value = T::parse(source).map_err(CoreError::from)?;
        Ok(Some(Box::new(value)))
    }
}

/// 构建链中的标量回退构建器，覆盖全部内建标量类型。
pub(crate) struct ScalarCodecBuilder;

impl CodecBuilder for ScalarCodecBuilder {
    fn matches(&self, _registry: &CodecRegistry, ty: &TypeRef) -> bool {
        scalar_codec_for(ty).is_some()
    }

    fn build(
        &self,
        _registry: &CodecRegistry,
        _cx: &mut ResolutionContext,
        ty: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>> {
        scalar_codec_for(ty).ok_or_else(|| {
            CoreError::new(
                codes::CODEC_FAILURE,
                format!("scalar builder invoked for non-scalar reference `{ty}`"),
            )
        })
    }
}

fn key_of<T: Datum>() -> Option<TypeKey> {
    match T::type_ref() {
        TypeRef::Named(key) => Some(key),
        _ => None,
    }
}

fn scalar_codec_for(ty: &TypeRef) -> Option<Arc<dyn DynCodec>> {
    let key = ty.named_key()?;
    macro_rules! probe {
        ($($ty:ty),+ $(,)?) => {
            $(
                if Some(*key) == key_of::<$ty>() {
                    return Some(Arc::new(ScalarCodec::<$ty>::new()));
                }
            )+
        };
    }
    probe!(bool, i32, i64, u32, u64, f64, String, Bytes);
    None
}
