//! 名称解析器
//!
//! 沿作用域路径链做词法查找: 子作用域遮蔽同名绑定, 同名参数跳过
//! 当前作用域（自遮蔽规则）, 代理请求参数只匹配子作用域（叔父搜索）。
//! 字面路径导航则只查各节点的直接子项, 不做词法上溯。

use crate::evaluator::{self, EvalContext};
use crate::scope::ScopeInstance;
use mixin_abstractions::ScopeLink;
use mixin_common::{EvaluateError, EvaluateResult, ResolveError, ResolveResult};
use std::sync::Arc;
use tracing::trace;

/// 词法查找的结果
pub enum Resolved {
    /// 命中子作用域
    Child(Arc<ScopeInstance>),
    /// 命中绑定, 由 `owner` 作用域负责求值与缓存
    Binding {
        owner: Arc<ScopeInstance>,
        name: String,
    },
}

/// 词法查找
///
/// `own_name` 为发起查找的贡献自身名称; 与查找名称相同时跳过起始
/// 作用域（包括其子作用域与绑定）, 从父作用域开始搜索。
pub fn resolve(
    start: &Arc<ScopeInstance>,
    own_name: Option<&str>,
    name: &str,
) -> ResolveResult<Resolved> {
    let mut searched: Vec<String> = Vec::new();
    let mut current = if own_name == Some(name) {
        match start.parent_instance()? {
            Some(parent) => parent,
            None => {
                return Err(unresolved(start, own_name, name, &searched));
            }
        }
    } else {
        Arc::clone(start)
    };

    loop {
        searched.push(current.path().to_string());
        if current.node().child(name).is_some() {
            trace!("解析命中子作用域: {} @ {}", name, current.path());
            let child = current
                .child_instance(name)
                .expect("组合节点存在的子作用域必可实例化");
            return Ok(Resolved::Child(child));
        }
        if current.node().binding(name).is_some() {
            trace!("解析命中绑定: {} @ {}", name, current.path());
            return Ok(Resolved::Binding {
                owner: current,
                name: name.to_string(),
            });
        }
        match current.parent_instance()? {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Err(unresolved(start, own_name, name, &searched))
}

/// 代理请求参数的叔父搜索
///
/// 沿祖先链寻找第一个拥有名为 `name` 的子作用域的作用域, 绑定一律
/// 跳过。自遮蔽规则同样适用。
pub fn resolve_proxy_request(
    start: &Arc<ScopeInstance>,
    own_name: Option<&str>,
    name: &str,
) -> ResolveResult<Arc<ScopeInstance>> {
    let mut searched: Vec<String> = Vec::new();
    let mut current = if own_name == Some(name) {
        match start.parent_instance()? {
            Some(parent) => parent,
            None => return Err(unresolved(start, own_name, name, &searched)),
        }
    } else {
        Arc::clone(start)
    };

    loop {
        searched.push(current.path().to_string());
        if current.node().child(name).is_some() {
            let child = current
                .child_instance(name)
                .expect("组合节点存在的子作用域必可实例化");
            return Ok(child);
        }
        match current.parent_instance()? {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Err(unresolved(start, own_name, name, &searched))
}

/// 取所在树的根实例
pub fn root_of(scope: &Arc<ScopeInstance>) -> ResolveResult<Arc<ScopeInstance>> {
    let mut current = Arc::clone(scope);
    while let Some(parent) = current.parent_instance()? {
        current = parent;
    }
    Ok(current)
}

/// 字面路径导航
///
/// 每一段只在当前节点的直接子作用域与绑定中查找; 命中绑定时强制
/// 求值, 其值必须为作用域句柄（符号链接）, 随后透明跟随链接目标。
pub(crate) fn descend(
    base: &Arc<ScopeInstance>,
    segments: &[String],
    ctx: &mut EvalContext,
) -> EvaluateResult<Arc<ScopeInstance>> {
    let mut current = Arc::clone(base);
    for segment in segments {
        if let Some(child) = current.child_instance(segment) {
            current = child;
            continue;
        }
        if current.node().binding(segment).is_some() {
            let value = evaluator::force_in(&current, segment, ctx)?;
            let link = value.downcast_ref::<ScopeLink>().cloned().ok_or_else(|| {
                EvaluateError::Resolve {
                    source: ResolveError::NotAScope {
                        name: segment.clone(),
                        at: current.path().to_string(),
                    },
                }
            })?;
            // 透明跟随符号链接, 跳数有界
            ctx.hop(link.path().to_string())?;
            let root = root_of(&current)?;
            current = descend(&root, link.path().segments(), ctx)?;
            continue;
        }
        return Err(EvaluateError::Resolve {
            source: ResolveError::PathNotFound {
                path: segments.join("/"),
                segment: segment.clone(),
                at: current.path().to_string(),
            },
        });
    }
    Ok(current)
}

fn unresolved(
    start: &Arc<ScopeInstance>,
    own_name: Option<&str>,
    name: &str,
    searched: &[String],
) -> ResolveError {
    let origin = match own_name {
        Some(own) => format!("{} 中的贡献 {}", start.path(), own),
        None => start.path().to_string(),
    };
    ResolveError::UnresolvedName {
        name: name.to_string(),
        origin,
        searched: searched.join(", "),
    }
}
