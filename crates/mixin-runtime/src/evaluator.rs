//! 求值器
//!
//! 惰性备忘求值: 首次访问执行基础贡献并按声明顺序应用补丁, 结果
//! 写一次缓存; 求值中重入判为循环依赖; 资源体返回作用域句柄时记录
//! 为符号链接并缓存强制后的目标。

use crate::composed::{BindingRole, PatchBinding, PatchBodyKind};
use crate::proxy::Proxy;
use crate::resolver::{self, Resolved};
use crate::scope::{MemoBegin, MemoEntry, ScopeInstance};
use mixin_abstractions::{Injected, InjectedArg, ParameterSpec, ScopeLink};
use mixin_common::{EvaluateError, EvaluateResult, ScopePath, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// 符号链接跟随的跳数上限
const MAX_LINK_HOPS: usize = 64;

/// 求值上下文
///
/// 携带按遭遇顺序排列的求值栈（循环报告用）、深度护栏与链接跳数。
pub(crate) struct EvalContext {
    stack: Vec<String>,
    max_depth: usize,
    link_hops: usize,
    hop_trail: Vec<String>,
}

impl EvalContext {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            max_depth,
            link_hops: 0,
            hop_trail: Vec::new(),
        }
    }

    fn enter(&mut self, frame: String, name: &str, scope: &ScopeInstance) -> EvaluateResult<()> {
        if self.stack.len() >= self.max_depth {
            return Err(EvaluateError::DepthExceeded {
                name: name.to_string(),
                scope: scope.path().to_string(),
                max_depth: self.max_depth,
            });
        }
        self.stack.push(frame);
        Ok(())
    }

    fn exit(&mut self) {
        self.stack.pop();
    }

    /// 从重入帧开始的循环名称序列
    fn cycle_from(&self, frame: &str) -> Vec<String> {
        let start = self
            .stack
            .iter()
            .position(|existing| existing == frame)
            .unwrap_or(0);
        let mut cycle: Vec<String> = self.stack[start..].to_vec();
        cycle.push(frame.to_string());
        cycle
    }

    /// 记录一次符号链接跟随, 跳数有界
    pub(crate) fn hop(&mut self, target: String) -> EvaluateResult<()> {
        self.link_hops += 1;
        self.hop_trail.push(target);
        if self.link_hops > MAX_LINK_HOPS {
            return Err(EvaluateError::LinkCycle {
                hops: self.hop_trail.clone(),
            });
        }
        Ok(())
    }
}

/// 强制求值作用域中的绑定
pub fn force(scope: &Arc<ScopeInstance>, name: &str) -> EvaluateResult<Value> {
    let mut ctx = EvalContext::new(scope.depth_limit());
    force_in(scope, name, &mut ctx)
}

pub(crate) fn force_in(
    scope: &Arc<ScopeInstance>,
    name: &str,
    ctx: &mut EvalContext,
) -> EvaluateResult<Value> {
    let frame = format!("{}:{}", scope.path(), name);
    match scope.memo_begin(name) {
        MemoBegin::Ready(value) => {
            trace!("缓存命中: {}", frame);
            scope.counters().cache_hit();
            Ok(value)
        }
        MemoBegin::Failed(error) => {
            trace!("缓存命中（失败条目）: {}", frame);
            Err(error)
        }
        MemoBegin::Linked(target) => read_link(scope, name, &target, ctx),
        MemoBegin::InProgressConflict => Err(EvaluateError::CircularDependency {
            cycle: ctx.cycle_from(&frame),
        }),
        MemoBegin::Started => {
            if let Err(error) = ctx.enter(frame.clone(), name, scope) {
                scope.memo_abandon(name);
                return Err(error);
            }
            debug!("开始求值: {}", frame);
            let result = evaluate_binding(scope, name, ctx);
            ctx.exit();
            match result {
                Ok(value) => {
                    scope.counters().forced();
                    if let Some(link) = value.downcast_ref::<ScopeLink>().cloned() {
                        let target = link.path();
                        debug!("记录符号链接: {} -> {}", frame, target);
                        scope.record_link(name, target.clone());
                        scope.memo_finish(name, MemoEntry::Linked(target.clone()));
                        read_link(scope, name, &target, ctx)
                    } else {
                        scope.memo_finish(name, MemoEntry::Ready(value.clone()));
                        Ok(value)
                    }
                }
                Err(error @ EvaluateError::ParameterNotSupplied { .. }) => {
                    // 参数未提供不缓存: 实例作用域补齐后应可重新求值
                    scope.memo_abandon(name);
                    Err(error)
                }
                Err(error) => {
                    scope.memo_finish(name, MemoEntry::Failed(error.clone()));
                    Err(error)
                }
            }
        }
    }
}

/// 读取符号链接条目
///
/// 每次访问都从根重新解析目标; 解析成功即目标已具体, 升级为最终值。
/// 解析失败不缓存, 目标可能在后续实例中具体化。
fn read_link(
    scope: &Arc<ScopeInstance>,
    name: &str,
    target: &ScopePath,
    ctx: &mut EvalContext,
) -> EvaluateResult<Value> {
    ctx.hop(target.to_string())?;
    let root = resolver::root_of(scope)?;
    let value = force_path(&root, target, ctx)?;
    scope.memo_finish(name, MemoEntry::Ready(value.clone()));
    Ok(value)
}

/// 按绝对路径强制求值
///
/// 末段为绑定时返回其值, 为作用域时返回规范句柄。
pub(crate) fn force_path(
    root: &Arc<ScopeInstance>,
    path: &ScopePath,
    ctx: &mut EvalContext,
) -> EvaluateResult<Value> {
    let segments = path.segments();
    if segments.is_empty() {
        return Ok(Value::new(Proxy::link(Arc::clone(root))));
    }
    let parent = resolver::descend(root, &segments[..segments.len() - 1], ctx)?;
    let last = &segments[segments.len() - 1];
    if let Some(child) = parent.child_instance(last) {
        return Ok(Value::new(Proxy::link(child)));
    }
    if parent.node().binding(last).is_some() {
        return force_in(&parent, last, ctx);
    }
    Err(EvaluateError::Resolve {
        source: mixin_common::ResolveError::PathNotFound {
            path: path.to_string(),
            segment: last.clone(),
            at: parent.path().to_string(),
        },
    })
}

fn evaluate_binding(
    scope: &Arc<ScopeInstance>,
    name: &str,
    ctx: &mut EvalContext,
) -> EvaluateResult<Value> {
    let node = Arc::clone(scope.node());
    let Some(binding) = node.binding(name) else {
        return Err(EvaluateError::Resolve {
            source: mixin_common::ResolveError::UnresolvedName {
                name: name.to_string(),
                origin: scope.path().to_string(),
                searched: scope.path().to_string(),
            },
        });
    };
    match &binding.role {
        BindingRole::ExternParam => scope.supplied(name).ok_or_else(|| {
            EvaluateError::ParameterNotSupplied {
                name: name.to_string(),
                scope: scope.path().to_string(),
            }
        }),
        BindingRole::EndoParam { patches } => {
            let initial = scope.supplied(name).ok_or_else(|| {
                EvaluateError::ParameterNotSupplied {
                    name: name.to_string(),
                    scope: scope.path().to_string(),
                }
            })?;
            apply_patches(scope, name, initial, patches, ctx)
        }
        BindingRole::Concrete { base, patches } => {
            if base.aggregate {
                // 聚合基础: 先收集全部补丁输出, 一次性交给基础函数体
                let mut collected: Vec<Value> = Vec::new();
                for patch in patches {
                    let injected = inject(scope, Some(name), &patch.params, ctx)?;
                    match &patch.body {
                        PatchBodyKind::One(body) => {
                            let output = body(None, &injected)
                                .map_err(|error| body_failed(scope, name, error))?;
                            collected.push(output);
                        }
                        PatchBodyKind::Many(body) => {
                            let outputs = body(&injected)
                                .map_err(|error| body_failed(scope, name, error))?;
                            collected.extend(outputs);
                        }
                    }
                }
                let injected =
                    inject_aggregate(scope, name, &base.params, collected, ctx)?;
                (base.body)(&injected).map_err(|error| body_failed(scope, name, error))
            } else {
                let injected = inject(scope, Some(name), &base.params, ctx)?;
                let produced =
                    (base.body)(&injected).map_err(|error| body_failed(scope, name, error))?;
                apply_patches(scope, name, produced, patches, ctx)
            }
        }
    }
}

/// 按声明顺序应用补丁序列
///
/// 单补丁直接接收前值; 多补丁一次产出后连续应用, 其间不会穿插其他
/// 名称的求值, 每个输出必须是自同态值。
fn apply_patches(
    scope: &Arc<ScopeInstance>,
    name: &str,
    initial: Value,
    patches: &[PatchBinding],
    ctx: &mut EvalContext,
) -> EvaluateResult<Value> {
    let mut current = initial;
    for patch in patches {
        let injected = inject(scope, Some(name), &patch.params, ctx)?;
        match &patch.body {
            PatchBodyKind::One(body) => {
                current = body(Some(current), &injected)
                    .map_err(|error| body_failed(scope, name, error))?;
            }
            PatchBodyKind::Many(body) => {
                let outputs =
                    body(&injected).map_err(|error| body_failed(scope, name, error))?;
                for output in outputs {
                    let endo = output.expect_endo().ok_or_else(|| {
                        EvaluateError::PatchNotEndomorphic {
                            name: name.to_string(),
                            origin: patch.origin.clone(),
                            actual: output.type_name().to_string(),
                        }
                    })?;
                    current =
                        endo(current).map_err(|error| body_failed(scope, name, error))?;
                }
            }
        }
    }
    Ok(current)
}

/// 按参数名称注入依赖
///
/// 代理请求参数走叔父搜索注入句柄; 普通参数词法解析后, 子作用域注入
/// 句柄, 绑定递归强制求值后注入值。
pub(crate) fn inject(
    scope: &Arc<ScopeInstance>,
    own_name: Option<&str>,
    params: &[ParameterSpec],
    ctx: &mut EvalContext,
) -> EvaluateResult<Injected> {
    let mut args: BTreeMap<String, InjectedArg> = BTreeMap::new();
    for param in params {
        if args.contains_key(&param.name) {
            continue;
        }
        let arg = resolve_param(scope, own_name, param, ctx)?;
        args.insert(param.name.clone(), arg);
    }
    Ok(Injected::new(args))
}

/// 聚合基础的注入: 与绑定同名的参数接收收集到的补丁输出序列
fn inject_aggregate(
    scope: &Arc<ScopeInstance>,
    name: &str,
    params: &[ParameterSpec],
    collected: Vec<Value>,
    ctx: &mut EvalContext,
) -> EvaluateResult<Injected> {
    let mut args: BTreeMap<String, InjectedArg> = BTreeMap::new();
    for param in params {
        if args.contains_key(&param.name) {
            continue;
        }
        let arg = if param.name == name && !param.proxy {
            InjectedArg::Value(Value::new(collected.clone()))
        } else {
            resolve_param(scope, Some(name), param, ctx)?
        };
        args.insert(param.name.clone(), arg);
    }
    Ok(Injected::new(args))
}

fn resolve_param(
    scope: &Arc<ScopeInstance>,
    own_name: Option<&str>,
    param: &ParameterSpec,
    ctx: &mut EvalContext,
) -> EvaluateResult<InjectedArg> {
    if param.proxy {
        let target = resolver::resolve_proxy_request(scope, own_name, &param.name)?;
        return Ok(InjectedArg::Scope(Proxy::link(target)));
    }
    match resolver::resolve(scope, own_name, &param.name)? {
        Resolved::Child(child) => Ok(InjectedArg::Scope(Proxy::link(child))),
        Resolved::Binding { owner, name } => {
            Ok(InjectedArg::Value(force_in(&owner, &name, ctx)?))
        }
    }
}

fn body_failed(scope: &Arc<ScopeInstance>, name: &str, error: mixin_common::BodyError) -> EvaluateError {
    EvaluateError::BodyFailed {
        name: name.to_string(),
        scope: scope.path().to_string(),
        cause: Arc::from(error),
    }
}
