//! 顶层求值入口

use crate::bootstrapper::Bootstrapper;
use crate::options::EvaluateOptions;
use crate::root::ComposedRoot;
use mixin_abstractions::ScopeDecl;
use mixin_common::{MixinResult, ScopeConventions};
use std::sync::Arc;

/// 以默认选项组合声明并返回可调用的根句柄
///
/// 组合根无参数名称时直接读取已发布名称; 否则先以关键字参数调用,
/// 得到实例作用域句柄。立即求值绑定在返回前全部完成预热。
pub fn evaluate(
    decls: impl IntoIterator<Item = Arc<ScopeDecl>>,
) -> MixinResult<ComposedRoot> {
    evaluate_with(decls, EvaluateOptions::default())
}

/// 以指定选项组合声明并返回可调用的根句柄
pub fn evaluate_with(
    decls: impl IntoIterator<Item = Arc<ScopeDecl>>,
    options: EvaluateOptions,
) -> MixinResult<ComposedRoot> {
    let decls: Vec<Arc<ScopeDecl>> = decls.into_iter().collect();
    let conventions = ScopeConventions::default();
    Bootstrapper::new(&options, &conventions).bootstrap(&decls)
}
