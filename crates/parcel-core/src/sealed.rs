/// 密封标记 trait，保留对核心契约实现集合的演进权。
///
/// # 设计背景（Why）
/// - 核心错误抽象需要在未来追加方法而不构成破坏性变更；
/// - 通过全称实现保持当前版本零约束，密封仅作为版本治理的声明。
pub trait Sealed {}

impl<T: ?Sized> Sealed for T {}
