//! 实例作用域工厂
//!
//! 每个组合作用域都可调用: 调用签名是组合后仍为参数槽的名称集合。
//! 调用校验参数、安装传入值、预先应用自同态补丁并预热立即求值绑定,
//! 产出一个备忘表独立、父链与被调用作用域共享的实例作用域。

use crate::composed::BindingRole;
use crate::eager;
use crate::evaluator;
use crate::scope::ScopeInstance;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mixin_abstractions::CallArgs;
use mixin_common::{CallError, MixinResult};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// 活跃实例的登记信息
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    /// 实例标识
    pub id: Uuid,
    /// 实例对应的组合路径
    pub path: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

/// 实例作用域追踪器
///
/// 登记调用产生的活跃实例, 实例随调用方释放时自动注销。
#[derive(Debug, Default)]
pub struct InstanceTracker {
    active: DashMap<Uuid, InstanceInfo>,
}

impl InstanceTracker {
    /// 创建新的追踪器
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, info: InstanceInfo) {
        self.active.insert(info.id, info);
    }

    pub(crate) fn remove(&self, id: Uuid) {
        self.active.remove(&id);
    }

    /// 活跃实例数量
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// 活跃实例登记信息快照
    pub fn active_instances(&self) -> Vec<InstanceInfo> {
        self.active.iter().map(|entry| entry.value().clone()).collect()
    }
}

/// 调用组合作用域, 产出实例作用域
pub fn call_scope(scope: &Arc<ScopeInstance>, args: CallArgs) -> MixinResult<Arc<ScopeInstance>> {
    let expected = scope.node().parameter_names();
    let scope_path = scope.path().to_string();

    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !args.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(CallError::MissingParameters {
            missing,
            expected,
            scope: scope_path,
        }
        .into());
    }

    let unexpected: Vec<String> = args
        .keys()
        .filter(|name| !expected.iter().any(|expected_name| expected_name == *name))
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        return Err(CallError::UnexpectedParameters {
            unexpected,
            expected,
            scope: scope_path,
        }
        .into());
    }

    info!(
        "创建实例作用域: {}, 参数 [{}]",
        scope_path,
        expected.join(", ")
    );
    let instance = ScopeInstance::new_instance(scope, args);

    // 预先应用自同态补丁: 传入初始值立即走标准求值路径
    for name in &expected {
        let is_endo = scope
            .node()
            .binding(name)
            .map(|binding| matches!(binding.role, BindingRole::EndoParam { .. }))
            .unwrap_or(false);
        if is_endo {
            evaluator::force(&instance, name)?;
        }
    }

    let forced = eager::prewarm(&instance);
    if forced > 0 {
        debug!("实例作用域预热完成: {} 个立即求值绑定", forced);
    }

    if let Some(tracker) = instance.tracker() {
        tracker.register(InstanceInfo {
            id: instance.id,
            path: instance.path().to_string(),
            created_at: instance.created_at,
        });
    }
    Ok(instance)
}
