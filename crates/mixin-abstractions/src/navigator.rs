//! 组合树导航接口
//!
//! 代理句柄的对象安全接口, 资源体通过它在组合树中导航、读取与调用

use mixin_common::{MixinResult, RelativePath, ResolveResult, ScopePath, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 作用域调用参数
pub type CallArgs = BTreeMap<String, Value>;

/// 从名称-值对构造调用参数
pub fn call_args<const N: usize>(pairs: [(&str, Value); N]) -> CallArgs {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// 组合树导航 trait
///
/// 代理在注入时被具体化为实现了本接口的句柄。导航操作只延长路径,
/// 不触发求值; 读取、调用与名称列举才会强制解析。
pub trait ScopeNavigator: Send + Sync {
    /// 句柄指向的绝对路径
    fn path(&self) -> ScopePath;

    /// 下钻一层, 返回新句柄（不解析、不求值）
    fn navigate(&self, name: &str) -> ScopeLink;

    /// 应用相对路径, 上溯越过根时报错
    fn navigate_relative(&self, path: &RelativePath) -> ResolveResult<ScopeLink>;

    /// 从组合树根开始应用绝对路径
    fn navigate_absolute(&self, path: &ScopePath) -> ResolveResult<ScopeLink>;

    /// 读取目标作用域中的终端资源并强制求值
    ///
    /// 名称指向子作用域时返回包装为 [`ScopeLink`] 的 [`Value`]。
    /// 外部读取受发布标记约束。
    fn read(&self, name: &str) -> MixinResult<Value>;

    /// 以给定参数调用目标作用域, 产生实例作用域句柄
    fn call(&self, args: CallArgs) -> MixinResult<ScopeLink>;

    /// 目标作用域的参数名称（外部参数与自同态参数槽）
    fn parameter_names(&self) -> MixinResult<Vec<String>>;

    /// 目标作用域的已发布名称, 按组合顺序
    fn published_names(&self) -> MixinResult<Vec<String>>;
}

/// 作用域句柄
///
/// 资源体返回该类型的值时, 对应绑定被记录为指向目标路径的符号链接。
#[derive(Clone)]
pub struct ScopeLink(pub Arc<dyn ScopeNavigator>);

impl ScopeLink {
    /// 句柄指向的绝对路径
    pub fn path(&self) -> ScopePath {
        self.0.path()
    }

    /// 下钻一层
    pub fn navigate(&self, name: &str) -> ScopeLink {
        self.0.navigate(name)
    }

    /// 应用相对路径
    pub fn navigate_relative(&self, path: &RelativePath) -> ResolveResult<ScopeLink> {
        self.0.navigate_relative(path)
    }

    /// 应用绝对路径
    pub fn navigate_absolute(&self, path: &ScopePath) -> ResolveResult<ScopeLink> {
        self.0.navigate_absolute(path)
    }

    /// 读取终端资源
    pub fn read(&self, name: &str) -> MixinResult<Value> {
        self.0.read(name)
    }

    /// 调用目标作用域
    pub fn call(&self, args: CallArgs) -> MixinResult<ScopeLink> {
        self.0.call(args)
    }

    /// 目标作用域的参数名称
    pub fn parameter_names(&self) -> MixinResult<Vec<String>> {
        self.0.parameter_names()
    }

    /// 目标作用域的已发布名称
    pub fn published_names(&self) -> MixinResult<Vec<String>> {
        self.0.published_names()
    }
}

impl fmt::Debug for ScopeLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopeLink").field(&self.0.path()).finish()
    }
}
