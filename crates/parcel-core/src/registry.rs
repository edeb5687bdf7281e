use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::RwLock;

use crate::codec::DynCodec;
use crate::codec::container::ContainerCodecBuilder;
use crate::codec::enums::EnumCodecBuilder;
use crate::codec::normalize::{Normalizer, NormalizingCodec};
use crate::codec::record::{CodecCell, RecordCodecBuilder, RecursiveCodec};
use crate::codec::scalar::ScalarCodecBuilder;
use crate::descriptor::{EnumDescriptor, RecordDescriptor};
use crate::error::{CoreError, Result, codes};
use crate::schema::{TypeKey, TypeRef, resolve};
use crate::value::DynValue;

/// 解析帧：一次类型查找在栈上的存在形态。
struct LookupFrame {
    ty: TypeRef,
    normalized: bool,
}

/// `ResolutionContext` 是一次顶层查找的全部遍历态：解析帧栈加上
/// 构建中记录的惰性单元表。
///
/// # 设计背景（Why）
/// - 归一化传染依赖"当前栈上是否存在标记帧"这一判定，遍历态必须
///   随递归调用显式传递；若落在注册中心的共享可变状态上，并发的
///   顶层查找会互相污染彼此的传染判定；
/// - 上下文由顶层查找创建、随查找结束（或失败）整体丢弃，
///   帧与惰性单元因此严格限定在单次遍历的生命周期内。
pub struct ResolutionContext {
    frames: Vec<LookupFrame>,
    pending: BTreeMap<TypeRef, Arc<CodecCell>>,
}

impl ResolutionContext {
    pub(crate) fn new() -> Self {
        Self {
            frames: Vec::new(),
            pending: BTreeMap::new(),
        }
    }

    fn push(&mut self, ty: TypeRef, normalized: bool) {
        self.frames.push(LookupFrame { ty, normalized });
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 栈上任意一帧携带归一化标记即视为处于标记子树之内。
    fn within_normalized(&self) -> bool {
        self.frames.iter().any(|frame| frame.normalized)
    }

    /// 渲染解析栈轨迹，根类型在前。
    fn trail(&self) -> Vec<String> {
        self.frames.iter().map(|frame| frame.ty.to_string()).collect()
    }

    fn clear(&mut self) {
        self.frames.clear();
        self.pending.clear();
    }

    /// 记录构建开始：登记惰性单元供环内的自引用查找取用。
    pub(crate) fn begin_record(&mut self, ty: TypeRef) -> Arc<CodecCell> {
        let cell = Arc::new(CodecCell::new());
        self.pending.insert(ty, cell.clone());
        cell
    }

    /// 记录构建结束：撤销登记。同类型的后续非环查找将重新构建。
    pub(crate) fn finish_record(&mut self, ty: &TypeRef) {
        self.pending.remove(ty);
    }

    fn pending_cell(&self, ty: &TypeRef) -> Option<Arc<CodecCell>> {
        self.pending.get(ty).cloned()
    }
}

/// `CodecBuilder` 是构建链的扩展点：按优先级排列的（认领，构建）对。
///
/// # 契约说明（What）
/// - `matches` 判定是否认领该类型引用，不得产生副作用；
/// - `build` 可通过 [`CodecRegistry::lookup_with`] 递归获取嵌套类型的
///   编解码器，递归必须复用传入的解析上下文；
/// - 记录构建器固定位于链首，自定义回退构建器追加在内建回退之后。
pub trait CodecBuilder: Send + Sync {
    /// 是否认领该类型引用。
    fn matches(&self, registry: &CodecRegistry, ty: &TypeRef) -> bool;

    /// 为该类型引用构建编解码器。
    fn build(
        &self,
        registry: &CodecRegistry,
        cx: &mut ResolutionContext,
        ty: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>>;
}

/// `CodecRegistry` 是类型导向编解码的查找、缓存与分发中枢。
///
/// # 设计背景（Why）
/// - 编解码器在首次查找时惰性构建；构建递归地向注册中心索取嵌套
///   类型的编解码器，注册中心因此既是缓存也是递归驱动器；
/// - 归一化传染：解析一旦下行进入带标记的类型，本次嵌套解析期间
///   构建的所有编解码器（字段、容器元素、键值，递归可达的一切）
///   都会被归一化装饰器包裹，即便这些嵌套类型自身没有标记。
///   同一个标量类型在标记子树之外查得的编解码器从不被包裹；
/// - 缓存只在根查找处写入，并且只存未装饰的基础编解码器。嵌套查找
///   的结果依赖当时活跃的祖先帧，缓存它们会让包裹状态跨上下文泄漏；
///   装饰与否在每次查找时按当前上下文重新判定，缓存项因此不携带
///   任何环境依赖，可从任意调用点安全复用。
///
/// # 并发与共享（What）
/// - 遍历态（帧栈与惰性单元）随 [`ResolutionContext`] 按值传递，
///   并发的顶层查找互不可见；
/// - 缓存与注册表为读多写少的共享状态，锁的持有范围限定在单条语句，
///   同键的重复构建是良性竞争（编解码器可幂等重建，后写胜出）。
pub struct CodecRegistry {
    records: RwLock<BTreeMap<TypeKey, Arc<RecordDescriptor>>>,
    enums: RwLock<BTreeMap<TypeKey, Arc<EnumDescriptor>>>,
    cache: RwLock<BTreeMap<TypeRef, Arc<dyn DynCodec>>>,
    builders: Vec<Box<dyn CodecBuilder>>,
    normalizer: Option<Arc<Normalizer>>,
}

impl CodecRegistry {
    /// 构造不带归一化函数的注册中心。
    pub fn new() -> Self {
        Self::assemble(None)
    }

    /// 构造携带归一化函数的注册中心。
    pub fn with_normalizer<F>(normalizer: F) -> Self
    where
        F: Fn(DynValue) -> Option<DynValue> + Send + Sync + 'static,
    {
        Self::assemble(Some(Arc::new(normalizer)))
    }

    fn assemble(normalizer: Option<Arc<Normalizer>>) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            enums: RwLock::new(BTreeMap::new()),
            cache: RwLock::new(BTreeMap::new()),
            builders: alloc::vec![
                Box::new(RecordCodecBuilder),
                Box::new(ContainerCodecBuilder),
                Box::new(ScalarCodecBuilder),
                Box::new(EnumCodecBuilder),
            ],
            normalizer,
        }
    }

    /// 在内建回退之后追加自定义构建器。记录构建器保持链首。
    pub fn push_fallback_builder(&mut self, builder: Box<dyn CodecBuilder>) {
        self.builders.push(builder);
    }

    /// 注册记录描述符。重复注册以新描述符为准，并作废对应缓存项。
    pub fn register_record(&self, descriptor: RecordDescriptor) {
        let key = descriptor.key();
        self.cache.write().remove(&TypeRef::Named(key));
        self.records.write().insert(key, Arc::new(descriptor));
    }

    /// 注册枚举描述符。重复注册以新描述符为准，并作废对应缓存项。
    pub fn register_enum(&self, descriptor: EnumDescriptor) {
        let key = descriptor.key();
        self.cache.write().remove(&TypeRef::Named(key));
        self.enums.write().insert(key, Arc::new(descriptor));
    }

    /// 查询记录描述符。
    pub fn record_descriptor(&self, key: &TypeKey) -> Option<Arc<RecordDescriptor>> {
        self.records.read().get(key).cloned()
    }

    /// 查询枚举描述符。
    pub fn enum_descriptor(&self, key: &TypeKey) -> Option<Arc<EnumDescriptor>> {
        self.enums.read().get(key).cloned()
    }

    /// 顶层查找入口：创建全新的解析上下文并驱动一次根查找。
    pub fn lookup(&self, ty: &TypeRef) -> Result<Arc<dyn DynCodec>> {
        let mut cx = ResolutionContext::new();
        self.lookup_with(&mut cx, ty)
    }

    /// 上下文内查找：构建器递归获取嵌套编解码器的入口。
    ///
    /// 查找链路内的任何失败会在最深故障点被附上解析栈轨迹，
    /// 随后上下文整体清空，错误原样上抛。
    pub fn lookup_with(
        &self,
        cx: &mut ResolutionContext,
        ty: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>> {
        match self.lookup_inner(cx, ty) {
            Ok(codec) => Ok(codec),
            Err(err) => {
                let err = if err.trail().is_none() && !cx.is_empty() {
                    err.with_trail(cx.trail())
                } else {
                    err
                };
                cx.clear();
                Err(err)
            }
        }
    }

    fn lookup_inner(
        &self,
        cx: &mut ResolutionContext,
        ty: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>> {
        // 1. 归一化类型引用；2. 判定归一化标记；3. 压入解析帧。
        let concrete = resolve(ty)?;
        let normalized = self.is_marked(&concrete);
        cx.push(concrete.clone(), normalized);

        // 4. 取基础编解码器（缓存、构建环、构建链三选一），
        //    并按当前栈判定是否包裹归一化装饰器。
        let outcome = self
            .base_codec(cx, &concrete)
            .map(|base| (base.clone(), self.decorate(cx, base)));

        let (base, decorated) = outcome?;
        cx.pop();

        // 根查找落缓存，且只存未装饰的基础形态；嵌套结果一律不缓存。
        if cx.is_empty() {
            self.cache.write().insert(concrete, base);
        }
        Ok(decorated)
    }

    fn base_codec(
        &self,
        cx: &mut ResolutionContext,
        concrete: &TypeRef,
    ) -> Result<Arc<dyn DynCodec>> {
        let cached = self.cache.read().get(concrete).cloned();
        if let Some(codec) = cached {
            return Ok(codec);
        }
        if let Some(cell) = cx.pending_cell(concrete) {
            return Ok(Arc::new(RecursiveCodec::new(cell)));
        }
        for builder in &self.builders {
            if builder.matches(self, concrete) {
                return builder.build(self, cx, concrete);
            }
        }
        Err(CoreError::new(
            codes::CODEC_BUILD_UNMATCHED,
            format!("no codec builder matches `{concrete}`"),
        ))
    }

    fn decorate(&self, cx: &ResolutionContext, base: Arc<dyn DynCodec>) -> Arc<dyn DynCodec> {
        match &self.normalizer {
            Some(normalizer) if cx.within_normalized() => {
                Arc::new(NormalizingCodec::new(base, normalizer.clone()))
            }
            _ => base,
        }
    }

    /// 归一化标记查询：具名记录看自身描述符，参数化实例看基类型。
    fn is_marked(&self, ty: &TypeRef) -> bool {
        let key = match ty {
            TypeRef::Named(key) => key,
            TypeRef::Parameterized { base, .. } => base,
            _ => return false,
        };
        self.records
            .read()
            .get(key)
            .map(|descriptor| descriptor.normalized())
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn cached_refs(&self) -> Vec<TypeRef> {
        self.cache.read().keys().cloned().collect()
    }

    #[cfg(test)]
    fn cached_base(&self, ty: &TypeRef) -> Option<Arc<dyn DynCodec>> {
        self.cache.read().get(ty).cloned()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
