//! # 混入组合层
//!
//! 这个 crate 是混入注入框架的组合层, 负责把声明来源组合成一个
//! 完整的、可求值的根作用域。
//!
//! ## 主要功能
//!
//! - **求值入口**: [`evaluate`] / [`evaluate_with`] 组合声明并返回可调用的根句柄
//! - **根句柄**: [`ComposedRoot`] 提供读取、调用、导航、验证与统计
//! - **构建器**: [`RootBuilder`] 使用构建者模式组装声明、选项与日志
//! - **声明适配**: [`lift`] 提升任意声明来源, [`ModuleSource`] 适配模块形声明
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use mixin_abstractions::{params, ScopeDecl};
//! use mixin_common::Value;
//! use mixin_composition::evaluate;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let app = ScopeDecl::builder("App")
//!         .resource("greeting", params([]), |_| Ok(Value::new("Hello".to_string())))
//!         .build();
//!
//!     let root = evaluate([app])?;
//!     let greeting = root.get("greeting")?;
//!     println!("问候语: {}", greeting.expect_ref::<String>()?);
//!     Ok(())
//! }
//! ```

pub mod bootstrapper;
pub mod builder;
pub mod declare;
pub mod evaluate;
pub mod logging;
pub mod options;
pub mod root;

pub use builder::RootBuilder;
pub use declare::{lift, ModuleSource};
pub use evaluate::{evaluate, evaluate_with};
pub use logging::LoggingConfig;
pub use options::EvaluateOptions;
pub use root::{ComposedRoot, RootStats};

// 重新导出常用类型
pub use mixin_common::MixinError;
