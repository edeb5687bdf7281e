use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::datum::Datum;
use crate::error::{CoreError, Result, codes};
use crate::schema::{TypeKey, TypeRef};
use crate::value::{DynDatum, DynValue, Slot};

type AccessorFn = Box<dyn Fn(&dyn DynDatum) -> Result<Slot> + Send + Sync>;
type ConstructFn = Box<dyn Fn(&mut ArgList<'_>) -> Result<DynValue> + Send + Sync>;

/// `FieldSpec` 描述记录类型的一个构造参数槽位。
///
/// # 契约说明（What）
/// - `name` 仅用于诊断，从不进入线格式；
/// - `ty` 是递归查找使用的声明类型引用（已剥离可空包装）；
/// - `nullable` 由字段声明类型自身的 `Option` 包装导出，不可按使用点配置；
/// - `get` 是与构造参数配对的访问器，从记录值中克隆出该字段的动态槽位。
pub struct FieldSpec {
    name: &'static str,
    ty: TypeRef,
    nullable: bool,
    get: AccessorFn,
}

impl FieldSpec {
    /// 字段名。
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 声明类型引用。
    pub fn declared_type(&self) -> &TypeRef {
        &self.ty
    }

    /// 是否允许缺省。
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// 对记录值应用访问器，取出该字段的动态槽位。
    pub(crate) fn read_from(&self, value: &dyn DynDatum) -> Result<Slot> {
        (self.get)(value)
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

/// `RecordDescriptor` 是记录类型的显式注册形态：有序字段序列加上
/// 唯一的规范构造器。
///
/// # 设计背景（Why）
/// - 本框架不依赖运行时反射，记录的"构造参数顺序、访问器配对、
///   可空性"全部在注册期由构建器一次性固化，此后不可变；
/// - 字段顺序即构造参数顺序，也就是线格式上的数组槽位顺序，
///   这是跨进程互通的硬性约定；
/// - 每个描述符恰好携带一个构造器，"规范构造器唯一"由结构保证。
///
/// # 契约说明（What）
/// - `normalized` 是声明式归一化标记，注册中心据此判定传染范围；
/// - 描述符构建后不可变，可跨线程共享。
pub struct RecordDescriptor {
    key: TypeKey,
    normalized: bool,
    fields: Vec<FieldSpec>,
    construct: ConstructFn,
}

impl RecordDescriptor {
    /// 为类型 `T` 开启描述符构建。
    ///
    /// `name` 需与 `T` 的 [`Datum::type_ref`] 注册名称一致，
    /// 否则注册中心无法将二者对上。
    pub fn builder<T: Datum>(name: &'static str) -> RecordDescriptorBuilder<T> {
        RecordDescriptorBuilder {
            key: TypeKey::of::<T>(name),
            normalized: false,
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// 类型标识。
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// 诊断名称。
    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// 是否携带归一化标记。
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    /// 有序字段序列。
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// 构造参数个数，即线格式数组的槽位数。
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// 以位置参数调用规范构造器。
    pub(crate) fn instantiate(&self, args: &mut ArgList<'_>) -> Result<DynValue> {
        (self.construct)(args)
    }
}

impl fmt::Debug for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDescriptor")
            .field("key", &self.key)
            .field("normalized", &self.normalized)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// 记录描述符构建器，按构造参数顺序登记字段。
pub struct RecordDescriptorBuilder<T: Datum> {
    key: TypeKey,
    normalized: bool,
    fields: Vec<FieldSpec>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Datum> RecordDescriptorBuilder<T> {
    /// 附加归一化标记：解码进入该类型子树后，所有可达值都会经过
    /// 归一化函数。
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// 登记一个字段。声明类型引用与可空性均由 `F` 自动导出。
    ///
    /// 字段的登记顺序就是构造参数顺序，同时定义线格式槽位顺序。
    pub fn field<F: Datum>(self, name: &'static str, get: fn(&T) -> F) -> Self {
        let ty = F::type_ref();
        self.push_field(name, ty, get)
    }

    /// 登记一个显式声明类型引用的字段。
    ///
    /// 用于表达泛型记录的声明签名（字段类型为带界变量等），
    /// 访问器仍然以具体类型 `F` 单态化。
    pub fn field_with_ref<F: Datum>(
        self,
        name: &'static str,
        declared: TypeRef,
        get: fn(&T) -> F,
    ) -> Self {
        self.push_field(name, declared, get)
    }

    fn push_field<F: Datum>(mut self, name: &'static str, ty: TypeRef, get: fn(&T) -> F) -> Self {
        let key = self.key;
        self.fields.push(FieldSpec {
            name,
            ty,
            nullable: F::NULLABLE,
            get: Box::new(move |value: &dyn DynDatum| {
                let typed = value.as_any().downcast_ref::<T>().ok_or_else(|| {
                    CoreError::new(
                        codes::CODEC_TYPE_MISMATCH,
                        format!("dynamic value {value:?} is not a `{}`", key.name()),
                    )
                })?;
                Ok(get(typed).into_slot())
            }),
        });
        self
    }

    /// 以规范构造器封口，产出不可变描述符。
    ///
    /// 构造器按登记顺序从 [`ArgList`] 逐个取参；返回错误即视为
    /// 构造器拒绝本次参数（例如类型不变式校验失败）。
    pub fn construct<C>(self, construct: C) -> RecordDescriptor
    where
        C: Fn(&mut ArgList<'_>) -> Result<T> + Send + Sync + 'static,
    {
        RecordDescriptor {
            key: self.key,
            normalized: self.normalized,
            fields: self.fields,
            construct: Box::new(move |args| construct(args).map(|v| Box::new(v) as DynValue)),
        }
    }
}

/// `ArgList` 是解码出的槽位序列上的位置游标，供规范构造器按序取参。
///
/// 槽位本身借用自记录编解码器，构造失败后仍然存活，
/// 因此失败报告可以携带完整的实参列表。
pub struct ArgList<'a> {
    slots: &'a [Slot],
    cursor: usize,
}

impl<'a> ArgList<'a> {
    pub(crate) fn new(slots: &'a [Slot]) -> Self {
        Self { slots, cursor: 0 }
    }

    /// 取出下一个位置参数并还原为 `F`。
    pub fn take<F: Datum>(&mut self) -> Result<F> {
        let slot = self.slots.get(self.cursor).ok_or_else(|| {
            CoreError::new(
                codes::CODEC_FAILURE,
                format!(
                    "constructor requested argument {} but only {} fields were decoded",
                    self.cursor + 1,
                    self.slots.len()
                ),
            )
        })?;
        self.cursor += 1;
        F::from_slot(slot.as_deref())
    }

    /// 尚未被取走的参数个数。
    pub fn remaining(&self) -> usize {
        self.slots.len() - self.cursor
    }
}

/// `EnumDescriptor` 是单值枚举类型的显式注册形态，线格式为变体序数。
///
/// # 契约说明（What）
/// - `variants` 按序数顺序列出变体名，仅用于诊断；
/// - 解码遇到超出范围的序数时报 `codec.type_mismatch`。
pub struct EnumDescriptor {
    key: TypeKey,
    variants: Vec<&'static str>,
    ordinal: Box<dyn Fn(&dyn DynDatum) -> Result<u32> + Send + Sync>,
    construct: Box<dyn Fn(u32) -> Result<DynValue> + Send + Sync>,
}

impl EnumDescriptor {
    /// 为枚举类型 `T` 构造描述符。
    ///
    /// `ordinal` 给出值到序数的映射，`construct` 为逆映射，
    /// 超出范围返回 `None`。
    pub fn new<T: Datum>(
        name: &'static str,
        variants: Vec<&'static str>,
        ordinal: fn(&T) -> u32,
        construct: fn(u32) -> Option<T>,
    ) -> Self {
        let key = TypeKey::of::<T>(name);
        let variant_count = variants.len();
        Self {
            key,
            variants,
            ordinal: Box::new(move |value: &dyn DynDatum| {
                let typed = value.as_any().downcast_ref::<T>().ok_or_else(|| {
                    CoreError::new(
                        codes::CODEC_TYPE_MISMATCH,
                        format!("dynamic value {value:?} is not a `{name}`"),
                    )
                })?;
                Ok(ordinal(typed))
            }),
            construct: Box::new(move |index| {
                construct(index)
                    .map(|v| Box::new(v) as DynValue)
                    .ok_or_else(|| {
                        CoreError::new(
                            codes::CODEC_TYPE_MISMATCH,
                            format!(
                                "ordinal {index} is out of range for enum `{name}` ({variant_count} variants)"
                            ),
                        )
                    })
            }),
        }
    }

    /// 类型标识。
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// 诊断名称。
    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// 变体名列表。
    pub fn variants(&self) -> &[&'static str] {
        &self.variants
    }

    pub(crate) fn ordinal_of(&self, value: &dyn DynDatum) -> Result<u32> {
        (self.ordinal)(value)
    }

    pub(crate) fn from_ordinal(&self, index: u32) -> Result<DynValue> {
        (self.construct)(index)
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("key", &self.key)
            .field("variants", &self.variants)
            .finish_non_exhaustive()
    }
}
