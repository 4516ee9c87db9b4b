//! # Mixin Runtime
//!
//! 混入注入框架的运行时实现:
//!
//! - **组合器**: 把 N 份声明树联合挂载为一棵组合作用域树, 执行
//!   "恰好一个基础 + N-1 个补丁" 的组合法则
//! - **解析器**: 沿作用域路径链的词法查找, 含自遮蔽跳过与叔父搜索
//! - **求值器**: 惰性备忘求值、循环检测、补丁应用与符号链接
//! - **实例作用域工厂**: 作用域调用与活跃实例追踪
//! - **静态验证**: 不求值的可解析性与依赖环检查
//!
//! 求值是单线程递归下降, 框架自身不引入任何挂起点; 备忘表按名称
//! 写一次, 共享组合树时由互斥锁保护。

pub mod composed;
pub mod composer;
pub mod eager;
pub mod evaluator;
pub mod instance;
pub mod proxy;
pub mod resolver;
pub mod scope;
pub mod validation;

pub use composed::{
    BaseBinding, BindingRole, ComposedBinding, ComposedScope, PatchBinding, PatchBodyKind,
};
pub use composer::{compose, compose_with, flatten_extends};
pub use eager::prewarm;
pub use evaluator::force;
pub use instance::{call_scope, InstanceInfo, InstanceTracker};
pub use proxy::Proxy;
pub use resolver::{resolve, resolve_proxy_request, root_of, Resolved};
pub use scope::{EvalCounters, MemoEntry, ScopeInstance, DEFAULT_MAX_DEPTH};
pub use validation::validate_tree;
