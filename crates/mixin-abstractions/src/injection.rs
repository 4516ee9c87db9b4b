//! 按名称注入的参数接口
//!
//! 资源体按声明的参数名称接收已解析的依赖

use crate::navigator::ScopeLink;
use mixin_common::{BodyError, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// 注入的单个参数
#[derive(Debug, Clone)]
pub enum InjectedArg {
    /// 已强制求值的资源值
    Value(Value),
    /// 作用域句柄（子作用域或代理请求参数）
    Scope(ScopeLink),
}

/// 注入参数集合
///
/// 名称与资源体声明的参数名称一一对应。
#[derive(Debug, Default)]
pub struct Injected {
    args: BTreeMap<String, InjectedArg>,
}

impl Injected {
    /// 创建注入集合
    pub fn new(args: BTreeMap<String, InjectedArg>) -> Self {
        Self { args }
    }

    /// 空集合
    pub fn empty() -> Self {
        Self::default()
    }

    /// 取原始参数
    pub fn arg(&self, name: &str) -> Option<&InjectedArg> {
        self.args.get(name)
    }

    /// 取资源值参数
    pub fn value(&self, name: &str) -> Result<&Value, BodyError> {
        match self.args.get(name) {
            Some(InjectedArg::Value(value)) => Ok(value),
            Some(InjectedArg::Scope(_)) => {
                Err(format!("参数 {} 是作用域句柄, 不是资源值", name).into())
            }
            None => Err(format!("参数 {} 未注入", name).into()),
        }
    }

    /// 取作用域句柄参数
    ///
    /// 同时接受句柄参数与内部值为 [`ScopeLink`] 的资源值（符号链接）。
    pub fn scope(&self, name: &str) -> Result<ScopeLink, BodyError> {
        match self.args.get(name) {
            Some(InjectedArg::Scope(link)) => Ok(link.clone()),
            Some(InjectedArg::Value(value)) => value
                .downcast_ref::<ScopeLink>()
                .cloned()
                .ok_or_else(|| format!("参数 {} 不是作用域句柄", name).into()),
            None => Err(format!("参数 {} 未注入", name).into()),
        }
    }

    /// 按类型借用资源值参数
    pub fn get<T: Any>(&self, name: &str) -> Result<&T, BodyError> {
        self.value(name)?.expect_ref::<T>().map_err(|e| {
            let message: BodyError = format!("参数 {} {}", name, e).into();
            message
        })
    }

    /// 所有参数名称
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.keys().map(String::as_str)
    }

    /// 参数数量
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl fmt::Display for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        write!(f, "[{}]", names.join(", "))
    }
}
