//! 错误类型定义

use std::sync::Arc;
use thiserror::Error;

/// 声明解析错误类型
#[derive(Error, Debug)]
pub enum DeclarationError {
    #[error("同一声明中名称 {name} 既是子作用域又是贡献: 作用域 {scope}")]
    NameShapeConflict { name: String, scope: String },

    #[error("扩展关系成环: {chain}")]
    ExtendCycle { chain: String },

    #[error("声明来源提升失败: {source_name}, 原因: {message}")]
    LiftFailed { source_name: String, message: String },
}

/// 组合错误类型
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error(
        "名称 {name} 的贡献数量非法: 基础 {bases} 个, 补丁 {patches} 个, 外部 {holes} 个, \
         路径: {path}, 贡献来源: [{contributors}]"
    )]
    ArityViolation {
        name: String,
        path: String,
        bases: usize,
        patches: usize,
        holes: usize,
        contributors: String,
    },

    #[error("同一声明中名称 {name} 既是子作用域又是资源: 路径 {path}, 声明来源: {origin}")]
    ChildResourceConflict {
        name: String,
        path: String,
        origin: String,
    },

    #[error("补丁 {name} 未全部标记为自同态, 无法归类为参数槽: 路径 {path}, 贡献来源: [{contributors}]")]
    MixedEndomorphism {
        name: String,
        path: String,
        contributors: String,
    },
}

/// 名称解析错误类型
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error("未解析的名称: {name}, 起始作用域: {origin}, 已搜索作用域链: [{searched}]")]
    UnresolvedName {
        name: String,
        origin: String,
        searched: String,
    },

    #[error("路径导航失败: 段 {segment} 在 {at} 中不存在, 完整路径: {path}")]
    PathNotFound {
        path: String,
        segment: String,
        at: String,
    },

    #[error("名称 {name} 不是作用域, 无法继续导航: 位置 {at}")]
    NotAScope { name: String, at: String },

    #[error("名称 {name} 未发布, 不可从外部读取: 作用域 {at}")]
    NotPublished { name: String, at: String },

    #[error("相对路径越过根作用域: 上溯 {levels_up} 层, 起始位置 {at}")]
    AboveRoot { levels_up: usize, at: String },

    #[error("作用域已随根句柄释放, 无法继续向上解析: 位置 {at}")]
    ScopeReleased { at: String },
}

/// 求值错误类型
///
/// 求值错误会被缓存到备忘表中, 重复访问返回同一错误, 因此要求 `Clone`。
#[derive(Error, Debug, Clone)]
pub enum EvaluateError {
    #[error("检测到循环依赖: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    #[error("资源体执行失败: {name}, 作用域: {scope}, 原因: {cause}")]
    BodyFailed {
        name: String,
        scope: String,
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("参数 {name} 未提供: 作用域 {scope} 需要在调用时传入该值")]
    ParameterNotSupplied { name: String, scope: String },

    #[error("补丁输出不是自同态值: {name}, 贡献来源: {origin}, 实际类型: {actual}")]
    PatchNotEndomorphic {
        name: String,
        origin: String,
        actual: String,
    },

    #[error("超过最大解析深度 {max_depth}: 求值 {name} 时, 作用域: {scope}")]
    DepthExceeded {
        name: String,
        scope: String,
        max_depth: usize,
    },

    #[error("符号链接成环: {}", .hops.join(" -> "))]
    LinkCycle { hops: Vec<String> },

    #[error("名称解析失败: {source}")]
    Resolve {
        #[from]
        source: ResolveError,
    },
}

/// 作用域调用错误类型
#[derive(Error, Debug)]
pub enum CallError {
    #[error("缺少必需参数: [{}], 作用域: {scope}, 期望参数: [{}]", .missing.join(", "), .expected.join(", "))]
    MissingParameters {
        missing: Vec<String>,
        expected: Vec<String>,
        scope: String,
    },

    #[error("未知参数: [{}], 作用域: {scope}, 期望参数: [{}]", .unexpected.join(", "), .expected.join(", "))]
    UnexpectedParameters {
        unexpected: Vec<String>,
        expected: Vec<String>,
        scope: String,
    },
}

/// 框架顶层错误类型
#[derive(Error, Debug)]
pub enum MixinError {
    #[error("声明错误: {source}")]
    Declaration {
        #[from]
        source: DeclarationError,
    },

    #[error("组合错误: {source}")]
    Composition {
        #[from]
        source: CompositionError,
    },

    #[error("解析错误: {source}")]
    Resolve {
        #[from]
        source: ResolveError,
    },

    #[error("求值错误: {source}")]
    Evaluate {
        #[from]
        source: EvaluateError,
    },

    #[error("调用错误: {source}")]
    Call {
        #[from]
        source: CallError,
    },

    #[error("静态验证失败: 共 {count} 个问题, 首个: {first}")]
    ValidationFailed { count: usize, first: String },

    #[error("启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type DeclarationResult<T> = Result<T, DeclarationError>;
pub type CompositionResult<T> = Result<T, CompositionError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
pub type EvaluateResult<T> = Result<T, EvaluateError>;
pub type CallResult<T> = Result<T, CallError>;
pub type MixinResult<T> = Result<T, MixinError>;
