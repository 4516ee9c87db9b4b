//! 日志配置
//!
//! 框架自身只发出 `tracing` 事件; 仅当使用方显式配置时才初始化全局
//! 订阅器。配置按框架阶段分档: 组合阶段与求值阶段可以单独调高,
//! 便于排查组合法则冲突与名称解析问题。

use mixin_common::MixinError;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 基础日志级别
    pub level: tracing::Level,
    /// 以 DEBUG 级别输出组合器的逐名称组合与遮蔽事件
    pub composition_details: bool,
    /// 以 TRACE 级别输出求值器与解析器的缓存命中和词法查找步骤
    pub evaluation_trace: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            composition_details: false,
            evaluation_trace: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置: 组合与求值细节全开
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            composition_details: true,
            evaluation_trace: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置: 只保留阶段级事件, JSON 输出
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            composition_details: false,
            evaluation_trace: false,
            json_format: true,
        }
    }

    /// 设置基础日志级别
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// 生成过滤指令串
    ///
    /// 基础级别之上, 按需单独调高组合器与求值器/解析器模块的级别。
    pub fn directives(&self) -> String {
        let mut directives = self.level.to_string().to_lowercase();
        if self.composition_details {
            directives.push_str(",mixin_runtime::composer=debug");
        }
        if self.evaluation_trace {
            directives.push_str(",mixin_runtime::evaluator=trace,mixin_runtime::resolver=trace");
        }
        directives
    }
}

/// 初始化日志系统
pub(crate) fn initialize_logging(config: &LoggingConfig) -> Result<(), MixinError> {
    let directives = config.directives();
    let filter = tracing_subscriber::EnvFilter::try_new(&directives).map_err(|e| {
        MixinError::BootstrapFailed {
            message: format!("日志过滤指令无效: {}, 原因: {}", directives, e),
        }
    })?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| MixinError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    tracing::debug!("日志系统初始化完成, 过滤指令: {}", directives);
    Ok(())
}
