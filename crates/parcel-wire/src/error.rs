use alloc::borrow::Cow;
use core::fmt;

/// `WireError` 是字节层唯一的错误形态，携带稳定错误码与人类可读描述。
///
/// # 设计背景（Why）
/// - 字节层故障（截断、非法标记、家族不匹配）需要被上层原样透传，
///   不允许在传播过程中被二次包装而丢失语义；
/// - 为兼容 `no_std + alloc` 场景，不依赖 `std::error::Error`，
///   由上层 crate 按需将其接入自身的错误链抽象。
///
/// # 契约说明（What）
/// - `code`：稳定 `'static` 字符串，取值见 [`codes`] 模块；
/// - `message`：面向排障人员的描述，可为静态或堆分配文本；
/// - **后置条件**：实例可安全跨线程移动（`Send + Sync + 'static`）。
#[derive(Debug)]
pub struct WireError {
    code: &'static str,
    message: Cow<'static, str>,
}

impl WireError {
    /// 构造字节层错误。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 输入在预期位置之前耗尽。
    pub fn truncated(context: &'static str) -> Self {
        Self::new(codes::WIRE_TRUNCATED, context)
    }

    /// 字节序列不是合法的线格式。
    pub fn malformed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(codes::WIRE_MALFORMED, message)
    }

    /// 标记家族与请求的读取类型不符。
    pub fn type_mismatch(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(codes::WIRE_TYPE_MISMATCH, message)
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WireError {}

/// 字节层稳定错误码表。
///
/// # 契约说明（What）
/// - 错误码遵循 `<域>.<语义>` 命名约定，一经发布不再变更；
/// - 上层据此区分“数据被截断”“格式损坏”“类型家族不符”三类故障，
///   无需解析 message 文本。
pub mod codes {
    /// 输入提前耗尽，帧不完整。
    pub const WIRE_TRUNCATED: &str = "wire.truncated";
    /// 字节序列不是合法编码（未知标记、UTF-8 损坏、长度越界）。
    pub const WIRE_MALFORMED: &str = "wire.malformed";
    /// 标记家族与请求的读取类型不匹配（包括必填位置出现 nil）。
    pub const WIRE_TYPE_MISMATCH: &str = "wire.type_mismatch";
}
