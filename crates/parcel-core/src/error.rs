use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::Error;

/// `CoreError` 是 `parcel-core` 全部故障的统一形态，携带稳定错误码、
/// 描述文本、可选的解析栈轨迹与底层原因。
///
/// # 设计背景（Why）
/// - 编解码器构建与读写路径上的故障需要合流为统一的错误码，
///   供调用方按码值精确分流，而不是解析 message 文本；
/// - 注册中心在故障传播时要附带"当前正在解析哪些类型"的栈轨迹，
///   否则深层嵌套字段的构建失败几乎无法定位；
/// - 需兼容 `no_std + alloc` 场景，因此不依赖 `std::error::Error`，
///   复用 crate 内部定义的轻量 [`Error`] 抽象串联原因链。
///
/// # 契约说明（What）
/// - `code`：稳定 `'static` 字符串，取值见 [`codes`] 模块，
///   遵循 `<域>.<语义>` 命名约定；
/// - `message`：面向排障人员的自然语言描述；
/// - `trail`：解析栈轨迹，仅由注册中心在查找链路内失败时附加一次，
///   顺序为根类型到故障点；
/// - `cause`：可选底层原因，错误链在传播中保持完整。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    trail: Option<Vec<String>>,
    cause: Option<ErrorCause>,
}

impl CoreError {
    /// 构造核心错误。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            trail: None,
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 附带 `std` 生态的底层原因。
    ///
    /// # 契约说明（What）
    /// - 测试夹具与上层应用常以 `std::error::Error` 表达原因，
    ///   经此入口包装后进入本 crate 的错误链；
    /// - 包装层的 `Display`/`Debug` 与原错误一致，链路在此处终止。
    #[cfg(feature = "std")]
    pub fn with_std_cause(
        self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.with_cause(StdCause(Box::new(cause)))
    }

    /// 附加解析栈轨迹。已有轨迹时保持不变，确保最深故障点的快照胜出。
    pub fn with_trail(mut self, trail: Vec<String>) -> Self {
        if self.trail.is_none() {
            self.trail = Some(trail);
        }
        self
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取解析栈轨迹，根类型在前。
    pub fn trail(&self) -> Option<&[String]> {
        self.trail.as_deref()
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(trail) = &self.trail {
            write!(f, " (lookup stack: {})", trail.join(" -> "))?;
        }
        Ok(())
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

impl Error for parcel_wire::WireError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl From<parcel_wire::WireError> for CoreError {
    /// 字节层错误原样透传：错误码沿用 `wire.*`，原错误进入原因链。
    fn from(err: parcel_wire::WireError) -> Self {
        let message: String = err.message().into();
        Self::new(err.code(), message).with_cause(err)
    }
}

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 框架统一的返回值别名。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;

/// `std` 错误到本 crate 错误链的适配层。
#[cfg(feature = "std")]
struct StdCause(Box<dyn std::error::Error + Send + Sync + 'static>);

#[cfg(feature = "std")]
impl fmt::Debug for StdCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(feature = "std")]
impl fmt::Display for StdCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(feature = "std")]
impl Error for StdCause {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// 核心稳定错误码表。
///
/// # 契约说明（What）
/// - 错误码一经发布不再变更，调用方据此执行精确分流；
/// - 字节层的 `wire.*` 错误码由 [`parcel_wire::codes`] 定义，
///   经 [`CoreError::from`] 透传后码值保持不变。
pub mod codes {
    /// 无界或多界的泛型引用、参数化记录类型，构建期即失败。
    pub const CODEC_TYPE_UNSUPPORTED: &str = "codec.type_unsupported";
    /// 规范构造器拒绝了解码出的参数列表。
    pub const CODEC_INSTANTIATION: &str = "codec.instantiation";
    /// 动态值与期望类型不符，包括必填槽位缺值。
    pub const CODEC_TYPE_MISMATCH: &str = "codec.type_mismatch";
    /// 构建链中没有任何构建器认领该类型。
    pub const CODEC_BUILD_UNMATCHED: &str = "codec.build_unmatched";
    /// 读写阶段的其他非字节层故障。
    pub const CODEC_FAILURE: &str = "codec.failure";
}
