use alloc::format;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::WireError;
use crate::marker;

/// `Encoder` 将标量、容器头与 nil 标记按最紧凑形式写入内存缓冲。
///
/// # 设计背景（Why）
/// - 上层的记录/容器编解码器只关心“写一个值”“写一个长度头”，
///   标记字节的挑选（fixint、str8、array16 等）收敛在这里单点维护；
/// - 输出落在自有 `BytesMut` 上，写入本身不会失败，只有携带长度的
///   写入（字符串、二进制、容器头）需要校验 32 位长度上限。
///
/// # 契约说明（What）
/// - 整数写入自动选择能容纳该值的最短编码；
/// - `finish` 冻结缓冲并让出所有权，Encoder 随之消亡；
/// - **后置条件**：产出的字节流可被任何 MessagePack 标准实现解读。
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// 构造空编码器。
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// 预留初始容量，减少增长拷贝。
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// 写入 nil 标记。
    pub fn write_nil(&mut self) {
        self.buf.put_u8(marker::NIL);
    }

    /// 写入布尔值。
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(if value { marker::TRUE } else { marker::FALSE });
    }

    /// 写入有符号整数，自动选择最短编码。
    pub fn write_i64(&mut self, value: i64) {
        if value >= 0 {
            self.write_u64(value as u64);
            return;
        }
        if value >= -32 {
            self.buf.put_u8(value as u8);
        } else if value >= i64::from(i8::MIN) {
            self.buf.put_u8(marker::I8);
            self.buf.put_i8(value as i8);
        } else if value >= i64::from(i16::MIN) {
            self.buf.put_u8(marker::I16);
            self.buf.put_i16(value as i16);
        } else if value >= i64::from(i32::MIN) {
            self.buf.put_u8(marker::I32);
            self.buf.put_i32(value as i32);
        } else {
            self.buf.put_u8(marker::I64);
            self.buf.put_i64(value);
        }
    }

    /// 写入无符号整数，自动选择最短编码。
    pub fn write_u64(&mut self, value: u64) {
        if value <= u64::from(marker::POS_FIXINT_MAX) {
            self.buf.put_u8(value as u8);
        } else if value <= u64::from(u8::MAX) {
            self.buf.put_u8(marker::U8);
            self.buf.put_u8(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.buf.put_u8(marker::U16);
            self.buf.put_u16(value as u16);
        } else if value <= u64::from(u32::MAX) {
            self.buf.put_u8(marker::U32);
            self.buf.put_u32(value as u32);
        } else {
            self.buf.put_u8(marker::U64);
            self.buf.put_u64(value);
        }
    }

    /// 写入 IEEE-754 双精度浮点数。
    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_u8(marker::F64);
        self.buf.put_f64(value);
    }

    /// 写入 UTF-8 字符串（fixstr / str8 / str16 / str32）。
    pub fn write_str(&mut self, value: &str) -> Result<(), WireError> {
        let len = value.len();
        if len <= usize::from(marker::FIXSTR_MASK) {
            self.buf.put_u8(marker::FIXSTR_PREFIX | len as u8);
        } else if len <= usize::from(u8::MAX) {
            self.buf.put_u8(marker::STR8);
            self.buf.put_u8(len as u8);
        } else if len <= usize::from(u16::MAX) {
            self.buf.put_u8(marker::STR16);
            self.buf.put_u16(len as u16);
        } else {
            let len32 = checked_len32("string", len)?;
            self.buf.put_u8(marker::STR32);
            self.buf.put_u32(len32);
        }
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// 写入二进制串（bin8 / bin16 / bin32）。
    pub fn write_bin(&mut self, value: &[u8]) -> Result<(), WireError> {
        let len = value.len();
        if len <= usize::from(u8::MAX) {
            self.buf.put_u8(marker::BIN8);
            self.buf.put_u8(len as u8);
        } else if len <= usize::from(u16::MAX) {
            self.buf.put_u8(marker::BIN16);
            self.buf.put_u16(len as u16);
        } else {
            let len32 = checked_len32("binary", len)?;
            self.buf.put_u8(marker::BIN32);
            self.buf.put_u32(len32);
        }
        self.buf.put_slice(value);
        Ok(())
    }

    /// 写入数组长度头。
    pub fn write_array_header(&mut self, len: usize) -> Result<(), WireError> {
        if len <= usize::from(marker::FIXLEN_MASK) {
            self.buf.put_u8(marker::FIXARRAY_PREFIX | len as u8);
        } else if len <= usize::from(u16::MAX) {
            self.buf.put_u8(marker::ARRAY16);
            self.buf.put_u16(len as u16);
        } else {
            let len32 = checked_len32("array", len)?;
            self.buf.put_u8(marker::ARRAY32);
            self.buf.put_u32(len32);
        }
        Ok(())
    }

    /// 写入键值对长度头。
    pub fn write_map_header(&mut self, len: usize) -> Result<(), WireError> {
        if len <= usize::from(marker::FIXLEN_MASK) {
            self.buf.put_u8(marker::FIXMAP_PREFIX | len as u8);
        } else if len <= usize::from(u16::MAX) {
            self.buf.put_u8(marker::MAP16);
            self.buf.put_u16(len as u16);
        } else {
            let len32 = checked_len32("map", len)?;
            self.buf.put_u8(marker::MAP32);
            self.buf.put_u32(len32);
        }
        Ok(())
    }

    /// 已写入的字节数。
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// 缓冲是否为空。
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// 冻结缓冲，产出只读字节流。
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// 校验长度可放入 32 位头，超限返回 `wire.malformed`。
fn checked_len32(kind: &'static str, len: usize) -> Result<u32, WireError> {
    u32::try_from(len).map_err(|_| {
        WireError::malformed(format!("{kind} length {len} exceeds 32-bit wire limit"))
    })
}
