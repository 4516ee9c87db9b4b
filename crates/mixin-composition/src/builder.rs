//! 组合根构建器
//!
//! 使用建造者模式组装声明、声明来源、模块、选项与日志配置,
//! 最终启动一个组合根。

use crate::bootstrapper::Bootstrapper;
use crate::declare::{lift, ModuleSource};
use crate::logging::{initialize_logging, LoggingConfig};
use crate::options::EvaluateOptions;
use crate::root::ComposedRoot;
use mixin_abstractions::{DeclarationSource, ScopeDecl};
use mixin_common::{ConventionRule, MixinResult, ScopeConventions};
use std::sync::Arc;
use tracing::{debug, info};

/// 组合根构建器
pub struct RootBuilder {
    declarations: Vec<Arc<ScopeDecl>>,
    sources: Vec<Arc<dyn DeclarationSource>>,
    modules: Vec<ModuleSource>,
    options: EvaluateOptions,
    conventions: ScopeConventions,
    /// 是否启用日志初始化
    logging_enabled: bool,
    logging_config: LoggingConfig,
}

impl RootBuilder {
    /// 创建新的组合根构建器
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            sources: Vec::new(),
            modules: Vec::new(),
            options: EvaluateOptions::default(),
            conventions: ScopeConventions::default(),
            logging_enabled: false,
            logging_config: LoggingConfig::default(),
        }
    }

    /// 添加已构建的声明
    pub fn add_declaration(mut self, decl: Arc<ScopeDecl>) -> Self {
        debug!("添加声明: {}", decl.name);
        self.declarations.push(decl);
        self
    }

    /// 添加声明来源, 构建时提升
    pub fn add_source(mut self, source: Arc<dyn DeclarationSource>) -> Self {
        debug!("添加声明来源: {}", source.name());
        self.sources.push(source);
        self
    }

    /// 添加模块形声明, 按挂载模式决定发布默认值
    pub fn add_module(mut self, module: ModuleSource) -> Self {
        self.modules.push(module);
        self
    }

    /// 替换全部求值选项
    pub fn with_options(mut self, options: EvaluateOptions) -> Self {
        self.options = options;
        self
    }

    /// 设置模块形声明的发布默认值
    pub fn modules_public(mut self, modules_public: bool) -> Self {
        self.options.modules_public = modules_public;
        self
    }

    /// 设置最大解析深度
    pub fn max_resolution_depth(mut self, max_depth: usize) -> Self {
        self.options.max_resolution_depth = max_depth;
        self
    }

    /// 启用或禁用求值前静态验证
    pub fn enable_validation(mut self, enabled: bool) -> Self {
        self.options.validate_before_eval = enabled;
        self
    }

    /// 添加工厂作用域约定规则
    pub fn add_convention(mut self, rule: ConventionRule) -> Self {
        self.conventions.add_convention(rule);
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true;
        self
    }

    /// 启动组合根
    pub fn build(self) -> MixinResult<ComposedRoot> {
        info!("开始构建组合根");

        // 只有在明确配置了日志时才初始化日志
        if self.logging_enabled {
            initialize_logging(&self.logging_config)?;
        }

        let mut decls = self.declarations;
        for source in &self.sources {
            decls.push(lift(source)?);
        }
        for module in self.modules {
            decls.push(module.into_decl(self.options.modules_public));
        }

        let root = Bootstrapper::new(&self.options, &self.conventions).bootstrap(&decls)?;
        info!("组合根构建完成");
        Ok(root)
    }
}

impl Default for RootBuilder {
    fn default() -> Self {
        Self::new()
    }
}
