use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

/// `DynDatum` 是编解码器之间传递的类型擦除值载体。
///
/// # 设计背景（Why）
/// - 注册中心按类型引用分发编解码器，中间层必须以对象安全的形式
///   搬运任意字段值；类型信息在边缘（访问器与构造器）恢复；
/// - 约束 `Debug` 是为了让构造失败时能够报告完整的实参列表。
///
/// # 契约说明（What）
/// - 任何 `Any + Send + Debug` 的类型自动获得实现；
/// - `as_any` 暴露向下转型入口，归一化函数与取值辅助都经由它还原类型。
pub trait DynDatum: Any + Send + fmt::Debug {
    /// 暴露 `Any` 视图以支持向下转型。
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + fmt::Debug> DynDatum for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn DynDatum {
    /// 借出 `T` 类型视图，类型不符返回 `None`。
    ///
    /// 注意经由本方法而不是 `as_any` 做向下转型：持有 [`DynValue`] 时
    /// 直接调用 `as_any` 会命中 `Box` 自身的全称实现，转型永远失败；
    /// 本方法是裸 `dyn` 上的固有方法，解引用后总是命中内部值。
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// 内部值是否为 `T` 类型。
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// 拥有所有权的类型擦除值。
pub type DynValue = Box<dyn DynDatum>;

/// 一个可缺省的槽位，`None` 与线格式上的 nil 对应。
pub type Slot = Option<DynValue>;

/// 序列的动态形态，元素按出现顺序排列，槽位允许缺省。
#[derive(Debug, Default)]
pub struct DynSeq(pub Vec<Slot>);

/// 集合的动态形态。保留线格式上的出现顺序，不做去重；
/// 去重发生在回到带类型集合的那一刻。
#[derive(Debug, Default)]
pub struct DynSet(pub Vec<Slot>);

/// 映射的动态形态。键值对按出现顺序排列，重复键的覆盖语义
/// 同样推迟到回到带类型映射时执行（后出现者胜出）。
#[derive(Debug, Default)]
pub struct DynMap(pub Vec<(Slot, Slot)>);
