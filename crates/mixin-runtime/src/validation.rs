//! 静态依赖验证
//!
//! 不强制任何求值, 静态检查组合树: 每个绑定的参数名称沿词法链可解析
//! （含自遮蔽跳过与代理请求的子作用域搜索）, 同作用域依赖无环。
//! 深度优先搜索使用已访问/访问中双集合检测循环。

use crate::composed::{ComposedBinding, ComposedScope};
use mixin_common::{EvaluateError, MixinError, ResolveError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// 验证整棵组合树, 返回全部发现的问题
pub fn validate_tree(root: &Arc<ComposedScope>) -> Vec<MixinError> {
    debug!("开始静态依赖验证: {}", root.path());
    let mut findings = Vec::new();
    let mut chain: Vec<Arc<ComposedScope>> = vec![Arc::clone(root)];
    validate_scope(&mut chain, &mut findings);
    debug!("静态依赖验证完成: 发现 {} 个问题", findings.len());
    findings
}

fn validate_scope(chain: &mut Vec<Arc<ComposedScope>>, findings: &mut Vec<MixinError>) {
    let node = Arc::clone(chain.last().expect("验证链非空"));

    // 参数名称可解析性检查
    for name in node.binding_names() {
        let binding = node.binding(name).expect("名称来自绑定表");
        let mut checked: HashSet<&str> = HashSet::new();
        for spec in binding.parameter_specs() {
            if !checked.insert(spec.name.as_str()) {
                continue;
            }
            let found = if spec.proxy {
                lookup_child(chain, name, &spec.name)
            } else {
                lookup_name(chain, name, &spec.name)
            };
            if !found {
                findings.push(
                    ResolveError::UnresolvedName {
                        name: spec.name.clone(),
                        origin: format!("{} 中的贡献 {}", node.path(), name),
                        searched: chain
                            .iter()
                            .map(|scope| scope.path().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }
                    .into(),
                );
            }
        }
    }

    // 同作用域依赖环检查
    detect_cycles(&node, findings);

    // 递归验证子作用域
    let child_names: Vec<String> = node.child_names().map(str::to_string).collect();
    for child_name in child_names {
        if let Some(child) = node.child(&child_name) {
            chain.push(Arc::clone(child));
            validate_scope(chain, findings);
            chain.pop();
        }
    }
}

/// 词法查找模拟: 子作用域遮蔽绑定, 同名参数跳过最内层作用域
fn lookup_name(chain: &[Arc<ComposedScope>], own_name: &str, name: &str) -> bool {
    let skip_innermost = own_name == name;
    let depth = chain.len();
    for (index, scope) in chain.iter().enumerate().rev() {
        if skip_innermost && index == depth - 1 {
            continue;
        }
        if scope.has_name(name) {
            return true;
        }
    }
    false
}

/// 叔父搜索模拟: 只匹配子作用域
fn lookup_child(chain: &[Arc<ComposedScope>], own_name: &str, name: &str) -> bool {
    let skip_innermost = own_name == name;
    let depth = chain.len();
    for (index, scope) in chain.iter().enumerate().rev() {
        if skip_innermost && index == depth - 1 {
            continue;
        }
        if scope.child(name).is_some() {
            return true;
        }
    }
    false
}

/// 深度优先搜索检测同作用域依赖环
fn detect_cycles(node: &Arc<ComposedScope>, findings: &mut Vec<MixinError>) {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for name in node.binding_names() {
        let binding = node.binding(name).expect("名称来自绑定表");
        graph.insert(name, same_scope_dependencies(node, name, binding));
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut visiting: Vec<&str> = Vec::new();
    for name in node.binding_names() {
        if !visited.contains(name) {
            dfs_check(name, &graph, &mut visited, &mut visiting, node, findings);
        }
    }
}

fn same_scope_dependencies<'a>(
    node: &'a ComposedScope,
    own_name: &str,
    binding: &'a ComposedBinding,
) -> Vec<&'a str> {
    let mut names: Vec<&str> = Vec::new();
    for spec in binding.parameter_specs() {
        if spec.proxy || spec.name == own_name {
            continue;
        }
        if node.child(&spec.name).is_some() {
            continue;
        }
        if node.binding(&spec.name).is_some() && !names.contains(&spec.name.as_str()) {
            names.push(spec.name.as_str());
        }
    }
    names
}

fn dfs_check<'a>(
    current: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    visiting: &mut Vec<&'a str>,
    node: &Arc<ComposedScope>,
    findings: &mut Vec<MixinError>,
) {
    if let Some(position) = visiting.iter().position(|name| *name == current) {
        // 检测到循环依赖
        let mut cycle: Vec<String> = visiting[position..]
            .iter()
            .map(|name| format!("{}:{}", node.path(), name))
            .collect();
        cycle.push(format!("{}:{}", node.path(), current));
        findings.push(EvaluateError::CircularDependency { cycle }.into());
        return;
    }
    if visited.contains(current) {
        return;
    }

    visiting.push(current);
    if let Some(deps) = graph.get(current) {
        for dep in deps {
            dfs_check(dep, graph, visited, visiting, node, findings);
        }
    }
    visiting.pop();
    visited.insert(current);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::compose;
    use mixin_abstractions::{params, ScopeDecl};
    use mixin_common::Value;

    #[test]
    fn test_unresolved_parameter_is_reported() {
        let decl = ScopeDecl::builder("App")
            .resource("greeting", params(["nonexistent"]), |injected| {
                let name: &String = injected.get("nonexistent")?;
                Ok(Value::new(name.clone()))
            })
            .build();
        let root = compose(&[decl]).unwrap();
        let findings = validate_tree(&root);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].to_string().contains("nonexistent"));
    }

    #[test]
    fn test_same_scope_cycle_is_reported_without_evaluation() {
        let decl = ScopeDecl::builder("App")
            .resource("a", params(["b"]), |injected| {
                Ok(injected.value("b")?.clone())
            })
            .resource("b", params(["a"]), |injected| {
                Ok(injected.value("a")?.clone())
            })
            .build();
        let root = compose(&[decl]).unwrap();
        let findings = validate_tree(&root);
        assert!(findings
            .iter()
            .any(|finding| finding.to_string().contains("循环依赖")));
    }

    #[test]
    fn test_clean_tree_has_no_findings() {
        let decl = ScopeDecl::builder("App")
            .resource("name", params([]), |_| Ok(Value::new("World".to_string())))
            .resource("greeting", params(["name"]), |injected| {
                let name: &String = injected.get("name")?;
                Ok(Value::new(format!("Hello, {}!", name)))
            })
            .build();
        let root = compose(&[decl]).unwrap();
        assert!(validate_tree(&root).is_empty());
    }
}
