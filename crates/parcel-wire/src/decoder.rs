use alloc::format;
use alloc::string::String;

use bytes::Bytes;

use crate::error::WireError;
use crate::marker;

/// `Decoder` 以游标方式从借用的字节切片中读取线格式值。
///
/// # 设计背景（Why）
/// - 解码是纯内存操作，借用输入即可，无需接管所有权或引入缓冲池；
/// - 整数读取接受整个整数家族的任意编码（只要数值在目标范围内），
///   与“写入端挑选最短编码”的策略互为对偶。
///
/// # 契约说明（What）
/// - 所有读取要么消费完整的一个值并前进游标，要么报错且游标位置未定义
///   （错误后不支持恢复续读，上层应整体放弃本次解码）；
/// - 输入耗尽返回 `wire.truncated`，非法字节返回 `wire.malformed`，
///   标记家族不符返回 `wire.type_mismatch`。
#[derive(Debug)]
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// 基于输入切片构造解码器。
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// 剩余未消费的字节数。
    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// 若下一个标记是 nil 则消费之并返回 `true`，否则原地返回 `false`。
    pub fn try_skip_nil(&mut self) -> Result<bool, WireError> {
        if self.peek()? == marker::NIL {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 读取布尔值。
    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.take_marker()? {
            marker::TRUE => Ok(true),
            marker::FALSE => Ok(false),
            other => Err(mismatch("bool", other)),
        }
    }

    /// 读取有符号整数，接受整数家族的任意编码。
    pub fn read_i64(&mut self) -> Result<i64, WireError> {
        match self.take_marker()? {
            b if b <= marker::POS_FIXINT_MAX => Ok(i64::from(b)),
            b if b >= marker::NEG_FIXINT_MIN => Ok(i64::from(b as i8)),
            marker::U8 => Ok(i64::from(self.take_u8()?)),
            marker::U16 => Ok(i64::from(self.take_u16()?)),
            marker::U32 => Ok(i64::from(self.take_u32()?)),
            marker::U64 => {
                let value = self.take_u64()?;
                i64::try_from(value).map_err(|_| {
                    WireError::type_mismatch(format!(
                        "unsigned value {value} does not fit into i64"
                    ))
                })
            }
            marker::I8 => Ok(i64::from(self.take_u8()? as i8)),
            marker::I16 => Ok(i64::from(self.take_u16()? as i16)),
            marker::I32 => Ok(i64::from(self.take_u32()? as i32)),
            marker::I64 => Ok(self.take_u64()? as i64),
            other => Err(mismatch("integer", other)),
        }
    }

    /// 读取无符号整数，负值视为家族不符。
    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        let value = self.read_i64_or_u64()?;
        match value {
            UintOrInt::Uint(v) => Ok(v),
            UintOrInt::Int(v) => u64::try_from(v).map_err(|_| {
                WireError::type_mismatch(format!("negative value {v} where unsigned expected"))
            }),
        }
    }

    /// 读取双精度浮点数。
    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        match self.take_marker()? {
            marker::F64 => Ok(f64::from_bits(self.take_u64()?)),
            other => Err(mismatch("f64", other)),
        }
    }

    /// 读取 UTF-8 字符串。
    pub fn read_str(&mut self) -> Result<String, WireError> {
        let len = match self.take_marker()? {
            b if b & !marker::FIXSTR_MASK == marker::FIXSTR_PREFIX => {
                usize::from(b & marker::FIXSTR_MASK)
            }
            marker::STR8 => usize::from(self.take_u8()?),
            marker::STR16 => usize::from(self.take_u16()?),
            marker::STR32 => self.take_u32()? as usize,
            other => return Err(mismatch("string", other)),
        };
        let raw = self.take(len, "string payload")?;
        String::from_utf8(raw.to_vec())
            .map_err(|err| WireError::malformed(format!("string payload is not UTF-8: {err}")))
    }

    /// 读取二进制串。
    pub fn read_bin(&mut self) -> Result<Bytes, WireError> {
        let len = match self.take_marker()? {
            marker::BIN8 => usize::from(self.take_u8()?),
            marker::BIN16 => usize::from(self.take_u16()?),
            marker::BIN32 => self.take_u32()? as usize,
            other => return Err(mismatch("binary", other)),
        };
        let raw = self.take(len, "binary payload")?;
        Ok(Bytes::copy_from_slice(raw))
    }

    /// 读取数组长度头。
    pub fn read_array_header(&mut self) -> Result<usize, WireError> {
        match self.take_marker()? {
            b if b & !marker::FIXLEN_MASK == marker::FIXARRAY_PREFIX => {
                Ok(usize::from(b & marker::FIXLEN_MASK))
            }
            marker::ARRAY16 => Ok(usize::from(self.take_u16()?)),
            marker::ARRAY32 => Ok(self.take_u32()? as usize),
            other => Err(mismatch("array header", other)),
        }
    }

    /// 读取键值对长度头。
    pub fn read_map_header(&mut self) -> Result<usize, WireError> {
        match self.take_marker()? {
            b if b & !marker::FIXLEN_MASK == marker::FIXMAP_PREFIX => {
                Ok(usize::from(b & marker::FIXLEN_MASK))
            }
            marker::MAP16 => Ok(usize::from(self.take_u16()?)),
            marker::MAP32 => Ok(self.take_u32()? as usize),
            other => Err(mismatch("map header", other)),
        }
    }

    fn read_i64_or_u64(&mut self) -> Result<UintOrInt, WireError> {
        match self.take_marker()? {
            b if b <= marker::POS_FIXINT_MAX => Ok(UintOrInt::Uint(u64::from(b))),
            b if b >= marker::NEG_FIXINT_MIN => Ok(UintOrInt::Int(i64::from(b as i8))),
            marker::U8 => Ok(UintOrInt::Uint(u64::from(self.take_u8()?))),
            marker::U16 => Ok(UintOrInt::Uint(u64::from(self.take_u16()?))),
            marker::U32 => Ok(UintOrInt::Uint(u64::from(self.take_u32()?))),
            marker::U64 => Ok(UintOrInt::Uint(self.take_u64()?)),
            marker::I8 => Ok(UintOrInt::Int(i64::from(self.take_u8()? as i8))),
            marker::I16 => Ok(UintOrInt::Int(i64::from(self.take_u16()? as i16))),
            marker::I32 => Ok(UintOrInt::Int(i64::from(self.take_u32()? as i32))),
            marker::I64 => Ok(UintOrInt::Int(self.take_u64()? as i64)),
            other => Err(mismatch("integer", other)),
        }
    }

    fn peek(&self) -> Result<u8, WireError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or_else(|| WireError::truncated("input exhausted before next marker"))
    }

    fn take_marker(&mut self) -> Result<u8, WireError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(WireError::truncated(context));
        }
        let slice = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1, "u8 payload")?[0])
    }

    fn take_u16(&mut self) -> Result<u16, WireError> {
        let raw = self.take(2, "u16 payload")?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    fn take_u32(&mut self) -> Result<u32, WireError> {
        let raw = self.take(4, "u32 payload")?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn take_u64(&mut self) -> Result<u64, WireError> {
        let raw = self.take(8, "u64 payload")?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(u64::from_be_bytes(bytes))
    }
}

enum UintOrInt {
    Uint(u64),
    Int(i64),
}

/// 构造“标记家族不符”错误，报文中带上实际标记字节便于定位。
fn mismatch(expected: &'static str, found: u8) -> WireError {
    WireError::type_mismatch(format!("expected {expected}, found marker 0x{found:02x}"))
}
