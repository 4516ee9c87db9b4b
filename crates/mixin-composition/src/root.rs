//! 组合根句柄
//!
//! 求值入口的产物: 冻结的组合树加根实例与活跃实例追踪器。所有外部
//! 读取都经过代理句柄, 受发布标记约束; 内部依赖解析不受影响。

use mixin_abstractions::{CallArgs, ScopeLink};
use mixin_common::{MixinError, MixinResult, RelativePath, Value};
use mixin_runtime::{
    validate_tree, ComposedScope, InstanceInfo, InstanceTracker, Proxy, ScopeInstance,
};
use std::sync::Arc;

/// 组合根的运行统计
#[derive(Debug, Clone)]
pub struct RootStats {
    /// 组合作用域数量
    pub scopes: usize,
    /// 组合绑定数量
    pub bindings: usize,
    /// 根作用域的参数数量
    pub parameters: usize,
    /// 已强制求值次数
    pub forced: u64,
    /// 备忘表缓存命中次数
    pub cache_hits: u64,
    /// 活跃实例作用域数量
    pub active_instances: usize,
}

/// 组合根句柄
///
/// 根作用域无参数时直接读取已发布名称; 有参数时先 [`call`](Self::call)
/// 得到实例作用域句柄再读取。
pub struct ComposedRoot {
    composed: Arc<ComposedScope>,
    root: Arc<ScopeInstance>,
    tracker: Arc<InstanceTracker>,
}

impl ComposedRoot {
    pub(crate) fn new(
        composed: Arc<ComposedScope>,
        root: Arc<ScopeInstance>,
        tracker: Arc<InstanceTracker>,
    ) -> Self {
        Self {
            composed,
            root,
            tracker,
        }
    }

    /// 根作用域的参数名称
    pub fn parameter_names(&self) -> Vec<String> {
        self.composed.parameter_names()
    }

    /// 根作用域的已发布名称
    pub fn published_names(&self) -> Vec<String> {
        self.composed.published_names()
    }

    /// 读取根作用域中的已发布名称并强制求值
    pub fn get(&self, name: &str) -> MixinResult<Value> {
        self.link().read(name)
    }

    /// 以给定参数调用根作用域, 产出实例作用域句柄
    pub fn call(&self, args: CallArgs) -> MixinResult<ScopeLink> {
        self.link().call(args)
    }

    /// 根作用域的导航句柄
    pub fn link(&self) -> ScopeLink {
        Proxy::link(Arc::clone(&self.root))
    }

    /// 导航到子作用域
    pub fn scope(&self, name: &str) -> ScopeLink {
        self.link().navigate(name)
    }

    /// 应用相对路径导航
    pub fn navigate(&self, path: &RelativePath) -> MixinResult<ScopeLink> {
        self.link().navigate_relative(path).map_err(MixinError::from)
    }

    /// 运行静态依赖验证, 返回全部发现的问题
    pub fn validate(&self) -> Vec<MixinError> {
        validate_tree(&self.composed)
    }

    /// 活跃实例作用域数量
    pub fn active_instances(&self) -> usize {
        self.tracker.active_count()
    }

    /// 活跃实例作用域登记信息
    pub fn instance_infos(&self) -> Vec<InstanceInfo> {
        self.tracker.active_instances()
    }

    /// 运行统计快照
    pub fn stats(&self) -> RootStats {
        let (scopes, bindings) = self.composed.count_nodes();
        let (forced, cache_hits) = self.root.counters().snapshot();
        RootStats {
            scopes,
            bindings,
            parameters: self.composed.parameter_names().len(),
            forced,
            cache_hits,
            active_instances: self.tracker.active_count(),
        }
    }

    /// 根实例（低层访问）
    pub fn root_instance(&self) -> &Arc<ScopeInstance> {
        &self.root
    }
}

impl std::fmt::Debug for ComposedRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (scopes, bindings) = self.composed.count_nodes();
        f.debug_struct("ComposedRoot")
            .field("scopes", &scopes)
            .field("bindings", &bindings)
            .field("parameters", &self.composed.parameter_names())
            .finish()
    }
}
