use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

use crate::error::{CoreError, Result, codes};

/// `TypeKey` 以 `TypeId` 加诊断名称唯一标识一个已注册的具体类型。
///
/// # 契约说明（What）
/// - 相等性与排序由 `TypeId` 与名称共同决定，同一 Rust 类型固定搭配
///   同一注册名称，因此二者不会产生分歧；
/// - `name` 仅用于错误信息与解析栈轨迹，从不进入线格式。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// 为类型 `T` 构造标识。
    pub fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
        }
    }

    /// 获取诊断名称。
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// `TypeRef` 是类型导向查找使用的类型代数，覆盖具名类型、三类容器、
/// 参数化实例、带界类型变量与全集类型。
///
/// # 设计背景（Why）
/// - 原始系统依赖运行时反射表达泛型引用，这里改为显式标签枚举，
///   由描述符在注册期声明字段的类型引用，查找期再做归一化；
/// - `Var` 与 `Parameterized` 看似多余，但它们承载了"泛型记录不受支持"
///   这一契约的失败路径，必须能够被表达出来才能在构建期拒绝。
///
/// # 契约说明（What）
/// - 实现 `Ord + Hash`，可直接作为编解码器缓存的键；
/// - `Display` 输出人类可读形式，用于错误信息与解析栈轨迹。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeRef {
    /// 已注册的具体类型（标量、枚举或记录）。
    Named(TypeKey),
    /// 有序序列，元素类型唯一。
    Seq(Box<TypeRef>),
    /// 去重集合，元素类型唯一。
    Set(Box<TypeRef>),
    /// 键值映射，键与值类型各自独立。
    Map(Box<TypeRef>, Box<TypeRef>),
    /// 泛型记录的参数化实例，构建期一律拒绝。
    Parameterized {
        base: TypeKey,
        args: Vec<TypeRef>,
    },
    /// 带界类型变量，解析期归一化为唯一上界。
    Var {
        name: &'static str,
        bounds: Vec<TypeRef>,
    },
    /// 全集类型，不能作为唯一上界出现。
    Any,
}

impl TypeRef {
    /// 构造序列类型引用。
    pub fn seq(elem: TypeRef) -> Self {
        Self::Seq(Box::new(elem))
    }

    /// 构造集合类型引用。
    pub fn set(elem: TypeRef) -> Self {
        Self::Set(Box::new(elem))
    }

    /// 构造映射类型引用。
    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// 构造类型变量引用。
    pub fn var(name: &'static str, bounds: Vec<TypeRef>) -> Self {
        Self::Var { name, bounds }
    }

    /// 若为具名类型则返回其标识。
    pub fn named_key(&self) -> Option<&TypeKey> {
        match self {
            Self::Named(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(key) => f.write_str(key.name()),
            Self::Seq(elem) => write!(f, "Seq<{elem}>"),
            Self::Set(elem) => write!(f, "Set<{elem}>"),
            Self::Map(key, value) => write!(f, "Map<{key}, {value}>"),
            Self::Parameterized { base, args } => {
                write!(f, "{}<", base.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            Self::Var { name, bounds } => {
                f.write_str(name)?;
                for (i, bound) in bounds.iter().enumerate() {
                    f.write_str(if i == 0 { ": " } else { " + " })?;
                    write!(f, "{bound}")?;
                }
                Ok(())
            }
            Self::Any => f.write_str("Any"),
        }
    }
}

/// 将可能含类型变量的引用归一化为查找可用的具体引用。
///
/// # 契约说明（What）
/// - 恰有一个上界且上界不是全集类型的变量，归一化为该上界本身，
///   不做递归再解析，与查找算法"每次查找归一化一次"的节奏一致；
/// - 无界、多界、或唯一上界为全集类型的变量属于声明的非目标，
///   以 `codec.type_unsupported` 报错并在信息中点名变量；
/// - 其余引用原样返回。
///
/// # 设计背景（Why）
/// - 泛型容器字段的元素类型在描述符中可能以带界变量形式声明
///   （例如 `Map<K, V>` 的值槽位声明为 `V: Value` 形态的变量），
///   查找前先收敛回具体元素类型。
pub fn resolve(ty: &TypeRef) -> Result<TypeRef> {
    let TypeRef::Var { name, bounds } = ty else {
        return Ok(ty.clone());
    };
    match bounds.as_slice() {
        [] => Err(CoreError::new(
            codes::CODEC_TYPE_UNSUPPORTED,
            format!("codecs for unbounded type variables are not supported (`{name}`)"),
        )),
        [TypeRef::Any] => Err(CoreError::new(
            codes::CODEC_TYPE_UNSUPPORTED,
            format!(
                "codecs for type variables bounded only by the universal type are not supported (`{name}`)"
            ),
        )),
        [single] => Ok(single.clone()),
        _ => Err(CoreError::new(
            codes::CODEC_TYPE_UNSUPPORTED,
            format!("codecs for multiple-bounded type variables are not supported (`{ty}`)"),
        )),
    }
}
