//! 类型擦除的编解码器契约与全部内建实现。
//!
//! 本模块只暴露 [`DynCodec`] 契约与 [`Normalizer`] 别名；具体实现
//! （标量、枚举、容器、记录、归一化装饰器）由注册中心按类型引用装配，
//! 不对外导出。

use alloc::format;

use parcel_wire::Encoder;

use crate::error::{CoreError, Result, codes};
use crate::value::{DynDatum, Slot};

pub(crate) mod container;
pub(crate) mod enums;
pub(crate) mod normalize;
pub(crate) mod record;
pub(crate) mod scalar;

pub use normalize::Normalizer;

/// `DynCodec` 是单个类型的读写能力对，`required` 标志控制 nil 语义。
///
/// # 设计背景（Why）
/// - 注册中心按类型引用分发，必须以对象安全的形式持有编解码器；
///   带类型的世界在访问器与构造器处收口，中间全部走动态槽位；
/// - `required` 随调用点传入而不固化在编解码器里，同一个编解码器
///   因此可以同时服务必填与可空两种槽位。
///
/// # 契约说明（What）
/// - `required = true` 时缺省值是错误：写入端拒绝缺省输入，
///   读取端把 nil 标记视为家族不符；
/// - `required = false` 时缺省值与 nil 互相映射；
/// - 字节层错误原样向上传播，不得二次包装。
pub trait DynCodec: Send + Sync + std::fmt::Debug {
    /// 将动态槽位写入编码器。
    fn write(
        &self,
        value: Option<&dyn DynDatum>,
        sink: &mut Encoder,
        required: bool,
    ) -> Result<()>;

    /// 从解码器读出动态槽位。
    fn read(&self, source: &mut parcel_wire::Decoder<'_>, required: bool) -> Result<Slot>;
}

/// 缺省值的统一写入路径：必填槽位报错，可空槽位写 nil。
pub(crate) fn encode_absent(sink: &mut Encoder, required: bool, label: &str) -> Result<()> {
    if required {
        return Err(CoreError::new(
            codes::CODEC_TYPE_MISMATCH,
            format!("absent value in required `{label}` slot"),
        ));
    }
    sink.write_nil();
    Ok(())
}
