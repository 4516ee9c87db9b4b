//! 声明来源接口
//!
//! 把用户声明（类形、模块形或扩展形）提升为声明模型的入口接口。
//! 本接口只定义输出模式, 不执行解析或求值。

use crate::declaration::{ContributionDecl, ScopeDecl};
use std::sync::Arc;

/// 声明来源 trait
///
/// 任何能够给出有序贡献、有序子声明与扩展声明的对象都可以作为
/// 声明来源被提升为 [`ScopeDecl`]。
pub trait DeclarationSource: Send + Sync {
    /// 来源名称, 即提升后作用域的名称
    fn name(&self) -> &str;

    /// 有序贡献列表
    fn contributions(&self) -> Vec<ContributionDecl>;

    /// 有序子声明来源
    fn children(&self) -> Vec<Arc<dyn DeclarationSource>>;

    /// 需要联合挂载的兄弟声明来源
    fn extends(&self) -> Vec<Arc<dyn DeclarationSource>> {
        Vec::new()
    }

    /// 是否为工厂作用域
    fn factory(&self) -> bool {
        false
    }

    /// 作用域是否对外发布
    fn published(&self) -> bool {
        true
    }
}

/// 已提升的声明自身也是声明来源
impl DeclarationSource for ScopeDecl {
    fn name(&self) -> &str {
        &self.name
    }

    fn contributions(&self) -> Vec<ContributionDecl> {
        self.contributions.clone()
    }

    fn children(&self) -> Vec<Arc<dyn DeclarationSource>> {
        self.children
            .iter()
            .map(|child| Arc::clone(child) as Arc<dyn DeclarationSource>)
            .collect()
    }

    fn extends(&self) -> Vec<Arc<dyn DeclarationSource>> {
        self.extends
            .iter()
            .map(|base| Arc::clone(base) as Arc<dyn DeclarationSource>)
            .collect()
    }

    fn factory(&self) -> bool {
        self.factory
    }

    fn published(&self) -> bool {
        self.published
    }
}
