//! 组合根启动器
//!
//! 协调组合根的启动顺序: 组合 → 静态验证 → 根实例化 → 立即求值预热。

use crate::options::EvaluateOptions;
use crate::root::ComposedRoot;
use mixin_abstractions::ScopeDecl;
use mixin_common::{MixinError, MixinResult, ScopeConventions};
use mixin_runtime::{compose_with, prewarm, InstanceTracker, ScopeInstance};
use std::sync::Arc;
use tracing::{debug, info};

/// 组合根启动器
pub(crate) struct Bootstrapper<'a> {
    options: &'a EvaluateOptions,
    conventions: &'a ScopeConventions,
}

impl<'a> Bootstrapper<'a> {
    pub(crate) fn new(options: &'a EvaluateOptions, conventions: &'a ScopeConventions) -> Self {
        Self {
            options,
            conventions,
        }
    }

    /// 启动组合根
    pub(crate) fn bootstrap(&self, decls: &[Arc<ScopeDecl>]) -> MixinResult<ComposedRoot> {
        info!("开始启动组合根: 输入声明 {} 份", decls.len());

        // 第一步: 联合挂载声明树
        let composed = compose_with(decls, self.conventions)?;
        let (scopes, bindings) = composed.count_nodes();
        info!("组合完成: 作用域 {} 个, 绑定 {} 个", scopes, bindings);

        // 第二步: 静态依赖验证（如果启用）
        if self.options.validate_before_eval {
            debug!("运行静态依赖验证");
            let findings = mixin_runtime::validate_tree(&composed);
            if !findings.is_empty() {
                let first = findings[0].to_string();
                return Err(MixinError::ValidationFailed {
                    count: findings.len(),
                    first,
                });
            }
            info!("静态依赖验证通过");
        }

        // 第三步: 创建根实例与实例追踪器
        let tracker = Arc::new(InstanceTracker::new());
        let root = ScopeInstance::new_root(
            Arc::clone(&composed),
            self.options.max_resolution_depth,
            Some(Arc::clone(&tracker)),
        );

        // 第四步: 立即求值预热, 完成后根句柄方可使用
        let forced = prewarm(&root);
        if forced > 0 {
            info!("立即求值预热完成: {} 个绑定", forced);
        }

        info!("组合根启动完成");
        Ok(ComposedRoot::new(composed, root, tracker))
    }
}
