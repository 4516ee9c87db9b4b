//! # Mixin Abstractions
//!
//! 提供混入注入框架的抽象层: 声明模型、按名称注入的参数接口、
//! 组合树导航接口与声明来源接口。
//!
//! 本层只定义数据与接口, 不包含任何解析或求值逻辑。

pub mod declaration;
pub mod injection;
pub mod navigator;
pub mod source;

pub use declaration::*;
pub use injection::*;
pub use navigator::*;
pub use source::*;
