//! # Mixin Common
//!
//! 这个 crate 提供了混入注入框架各层共享的基础类型。
//!
//! ## 核心组件
//!
//! - [`Value`] - 资源求值产生的动态值
//! - [`ScopePath`] / [`RelativePath`] - 组合树中的绝对与相对路径
//! - [`ScopeConventions`] - 工厂作用域的命名约定规范
//! - 各层的错误类型与 `Result` 别名
//!
//! ## 设计原则
//!
//! - 按名称注入，不依赖类型系统
//! - 声明数据一经构造即不可变
//! - 错误携带完整的定位信息（名称、路径、贡献来源）

pub mod conventions;
pub mod errors;
pub mod path;
pub mod value;

pub use conventions::*;
pub use errors::*;
pub use path::*;
pub use value::*;
