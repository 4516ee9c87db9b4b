//! 立即求值预热
//!
//! 作用域物化后按拓扑顺序强制全部立即求值绑定: 无依赖者在前, 依赖
//! 已解析者随后, 并列时按组合器的插入顺序。预热深度优先遍历整棵树,
//! 父作用域先于子作用域; 工厂子作用域跳过, 其实例按调用创建。

use crate::composed::ComposedScope;
use crate::evaluator;
use crate::scope::ScopeInstance;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error};

/// 预热作用域及其非工厂后代, 返回成功强制的绑定数量
///
/// 单个绑定的求值失败会被缓存为失败条目并记录日志, 不中断预热。
pub fn prewarm(scope: &Arc<ScopeInstance>) -> usize {
    let mut forced = 0;
    prewarm_scope(scope, &mut forced);
    forced
}

fn prewarm_scope(scope: &Arc<ScopeInstance>, forced: &mut usize) {
    for name in eager_order(scope.node()) {
        match evaluator::force(scope, &name) {
            Ok(_) => {
                *forced += 1;
                debug!("立即求值完成: {}:{}", scope.path(), name);
            }
            Err(e) => {
                error!(
                    "立即求值失败并已缓存: {}:{}, 原因: {}",
                    scope.path(),
                    name,
                    e
                );
            }
        }
    }

    let child_names: Vec<String> = scope.node().child_names().map(str::to_string).collect();
    for child_name in child_names {
        let is_factory = scope
            .node()
            .child(&child_name)
            .map(|child| child.is_factory())
            .unwrap_or(false);
        if is_factory {
            debug!("跳过工厂子作用域的预热: {}/{}", scope.path(), child_name);
            continue;
        }
        if let Some(child) = scope.child_instance(&child_name) {
            prewarm_scope(&child, forced);
        }
    }
}

/// 立即求值绑定的拓扑顺序
///
/// 只统计同作用域内立即求值绑定之间的参数依赖边; 惰性依赖在求值时
/// 传递性强制, 不参与排序。依赖成环的剩余部分按插入顺序附加。
pub(crate) fn eager_order(node: &ComposedScope) -> Vec<String> {
    let eager = node.eager_names();
    if eager.len() <= 1 {
        return eager;
    }
    let eager_set: HashSet<&str> = eager.iter().map(String::as_str).collect();

    let mut deps: HashMap<&str, Vec<&str>> = HashMap::new();
    for name in &eager {
        let binding = node.binding(name).expect("立即求值名称必有绑定");
        let mut names: Vec<&str> = Vec::new();
        for spec in binding.parameter_specs() {
            if spec.proxy {
                continue;
            }
            // 同名参数走自遮蔽规则解析到祖先, 不构成同作用域依赖
            if spec.name == *name {
                continue;
            }
            // 被子作用域遮蔽的名称不是绑定依赖
            if node.child(&spec.name).is_some() {
                continue;
            }
            if eager_set.contains(spec.name.as_str()) && !names.contains(&spec.name.as_str()) {
                names.push(spec.name.as_str());
            }
        }
        deps.insert(name.as_str(), names);
    }

    let mut done: HashSet<&str> = HashSet::new();
    let mut order: Vec<String> = Vec::new();
    let mut remaining: Vec<&String> = eager.iter().collect();
    while !remaining.is_empty() {
        let ready = remaining.iter().position(|name| {
            deps.get(name.as_str())
                .map(|names| names.iter().all(|dep| done.contains(dep)))
                .unwrap_or(true)
        });
        match ready {
            Some(index) => {
                let name = remaining.remove(index);
                done.insert(name.as_str());
                order.push(name.clone());
            }
            None => {
                // 依赖成环: 剩余绑定按插入顺序强制, 循环由求值器报告
                order.extend(remaining.drain(..).cloned());
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::compose;
    use mixin_abstractions::{params, ContributionDecl, ScopeDecl};
    use mixin_common::Value;

    #[test]
    fn test_eager_order_respects_dependencies() {
        // conn 依赖 config, 声明顺序相反, 拓扑排序应将 config 提前
        let decl = ScopeDecl::builder("App")
            .contribution(
                ContributionDecl::resource("conn", params(["config"]), |injected| {
                    let config: &String = injected.get("config")?;
                    Ok(Value::new(format!("conn({})", config)))
                })
                .eager(),
            )
            .contribution(
                ContributionDecl::resource("config", params([]), |_| {
                    Ok(Value::new("cfg".to_string()))
                })
                .eager(),
            )
            .build();
        let root = compose(&[decl]).unwrap();
        assert_eq!(
            eager_order(&root),
            vec!["config".to_string(), "conn".to_string()]
        );
    }

    #[test]
    fn test_eager_order_ties_follow_insertion_order() {
        let decl = ScopeDecl::builder("App")
            .contribution(
                ContributionDecl::resource("b", params([]), |_| Ok(Value::new(1i64))).eager(),
            )
            .contribution(
                ContributionDecl::resource("a", params([]), |_| Ok(Value::new(2i64))).eager(),
            )
            .build();
        let root = compose(&[decl]).unwrap();
        assert_eq!(eager_order(&root), vec!["b".to_string(), "a".to_string()]);
    }
}
