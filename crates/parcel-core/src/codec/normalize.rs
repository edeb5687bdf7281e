use alloc::sync::Arc;

use parcel_wire::{Decoder, Encoder};

use crate::codec::DynCodec;
use crate::error::Result;
use crate::value::{DynDatum, DynValue, Slot};

/// 归一化函数：接收解码出的动态值，返回替换值，`None` 表示替换为缺省。
///
/// 在注册中心构造时一次性注入；缺席时整个装饰机制零开销关闭。
pub type Normalizer = dyn Fn(DynValue) -> Option<DynValue> + Send + Sync;

/// `NormalizingCodec` 在解码侧为任意编解码器追加归一化后处理。
///
/// # 设计背景（Why）
/// - 归一化只作用于解码结果，写入必须原样委托，否则编码端会把
///   归一化效果二次固化进线格式；
/// - 本装饰器是纯组合：持有内层能力并转发，自身无状态，
///   归一化函数的失败（panic）不在此处拦截。
///
/// # 契约说明（What）
/// - 内层解码出缺省值时不调用归一化函数；
/// - 归一化函数的返回值整体替换解码结果，允许替换为缺省。
pub(crate) struct NormalizingCodec {
    inner: Arc<dyn DynCodec>,
    normalizer: Arc<Normalizer>,
}

impl core::fmt::Debug for NormalizingCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NormalizingCodec")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl NormalizingCodec {
    pub(crate) fn new(inner: Arc<dyn DynCodec>, normalizer: Arc<Normalizer>) -> Self {
        Self { inner, normalizer }
    }
}

impl DynCodec for NormalizingCodec {
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()> {
        self.inner.write(value, sink, required)
    }

    fn read(&self, source: &mut Decoder<'_>, required: bool) -> Result<Slot> {
        match self.inner.read(source, required)? {
            Some(value) => Ok((self.normalizer)(value)),
            None => Ok(None),
        }
    }
}
