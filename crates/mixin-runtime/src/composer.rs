//! 组合器
//!
//! 把 N 份声明树在同一路径联合挂载为一棵组合作用域树, 并执行
//! 每个名称的组合法则校验。组合不修改输入, 重复运行产出结构相同的树。

use crate::composed::{
    BaseBinding, BindingRole, ComposedBinding, ComposedScope, PatchBinding, PatchBodyKind,
};
use mixin_abstractions::{ContributionBody, ContributionDecl, ContributionFlags, ScopeDecl};
use mixin_common::{
    CompositionError, DeclarationError, MixinError, MixinResult, ScopeConventions, ScopePath,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// 以默认约定组合声明
pub fn compose(decls: &[Arc<ScopeDecl>]) -> MixinResult<Arc<ComposedScope>> {
    compose_with(decls, &ScopeConventions::default())
}

/// 以指定约定组合声明
pub fn compose_with(
    decls: &[Arc<ScopeDecl>],
    conventions: &ScopeConventions,
) -> MixinResult<Arc<ComposedScope>> {
    debug!("开始组合: 根部输入声明 {} 份", decls.len());
    let flattened = flatten_extends(decls)?;
    let root = compose_at(
        String::new(),
        ScopePath::root(),
        &flattened,
        conventions,
        false,
        true,
    )?;
    let (scopes, bindings) = root.count_nodes();
    debug!("组合完成: 作用域 {} 个, 绑定 {} 个", scopes, bindings);
    Ok(root)
}

/// 递归解析扩展关系并展平
///
/// 顺序为: 被扩展者在前, 扩展者在后。同一声明经多条扩展边可达时只
/// 挂载一次, 首次出现生效。扩展关系成环是声明错误。
pub fn flatten_extends(decls: &[Arc<ScopeDecl>]) -> Result<Vec<Arc<ScopeDecl>>, DeclarationError> {
    let mut seen: HashSet<*const ScopeDecl> = HashSet::new();
    let mut visiting: Vec<(*const ScopeDecl, String)> = Vec::new();
    let mut out = Vec::new();
    for decl in decls {
        flatten_into(decl, &mut seen, &mut visiting, &mut out)?;
    }
    Ok(out)
}

fn flatten_into(
    decl: &Arc<ScopeDecl>,
    seen: &mut HashSet<*const ScopeDecl>,
    visiting: &mut Vec<(*const ScopeDecl, String)>,
    out: &mut Vec<Arc<ScopeDecl>>,
) -> Result<(), DeclarationError> {
    let ptr = Arc::as_ptr(decl);
    if seen.contains(&ptr) {
        return Ok(());
    }
    if visiting.iter().any(|(p, _)| *p == ptr) {
        let mut chain: Vec<String> = visiting.iter().map(|(_, name)| name.clone()).collect();
        chain.push(decl.name.clone());
        return Err(DeclarationError::ExtendCycle {
            chain: chain.join(" -> "),
        });
    }
    visiting.push((ptr, decl.name.clone()));
    for base in &decl.extends {
        flatten_into(base, seen, visiting, out)?;
    }
    visiting.pop();
    seen.insert(ptr);
    out.push(Arc::clone(decl));
    Ok(())
}

fn compose_at(
    name: String,
    path: ScopePath,
    decls: &[Arc<ScopeDecl>],
    conventions: &ScopeConventions,
    factory: bool,
    published: bool,
) -> MixinResult<Arc<ComposedScope>> {
    // 同一输入声明内, 名称不得既是子作用域又是贡献
    for decl in decls {
        let child_names: HashSet<&str> =
            decl.children.iter().map(|child| child.name.as_str()).collect();
        for contribution in &decl.contributions {
            if child_names.contains(contribution.name.as_str()) {
                return Err(CompositionError::ChildResourceConflict {
                    name: contribution.name.clone(),
                    path: path.to_string(),
                    origin: decl.name.clone(),
                }
                .into());
            }
        }
    }

    // 名称联合: 贡献与子作用域按首次出现顺序记录
    let mut name_order: Vec<String> = Vec::new();
    let ordered = |order: &mut Vec<String>, name: &str| {
        if !order.iter().any(|existing| existing == name) {
            order.push(name.to_string());
        }
    };

    let mut contribution_groups: HashMap<String, Vec<&ContributionDecl>> = HashMap::new();
    let mut child_groups: HashMap<String, Vec<Arc<ScopeDecl>>> = HashMap::new();
    for decl in decls {
        for contribution in &decl.contributions {
            ordered(&mut name_order, &contribution.name);
            contribution_groups
                .entry(contribution.name.clone())
                .or_default()
                .push(contribution);
        }
        for child in &decl.children {
            ordered(&mut name_order, &child.name);
            child_groups
                .entry(child.name.clone())
                .or_default()
                .push(Arc::clone(child));
        }
    }

    // 绑定组合与法则校验
    let mut bindings: HashMap<String, ComposedBinding> = HashMap::new();
    for binding_name in &name_order {
        let Some(group) = contribution_groups.get(binding_name) else {
            continue;
        };
        if child_groups.contains_key(binding_name) {
            // 联合后的遮蔽: 子作用域优先于兄弟声明中的同名资源
            warn!(
                "子作用域 {} 遮蔽了同名资源贡献: 路径 {}, 被遮蔽贡献来源 [{}]",
                binding_name,
                path,
                contributor_list(group)
            );
            continue;
        }
        let binding = compose_binding(binding_name, &path, group)?;
        bindings.insert(binding_name.clone(), binding);
    }

    // 子作用域递归组合
    let mut children: HashMap<String, Arc<ComposedScope>> = HashMap::new();
    for child_name in &name_order {
        let Some(group) = child_groups.get(child_name) else {
            continue;
        };
        let flattened = flatten_extends(group)?;
        let child_factory = flattened.iter().any(|decl| decl.factory)
            || conventions.is_factory(child_name);
        let child_published = flattened.iter().any(|decl| decl.published);
        let child = compose_at(
            child_name.clone(),
            path.child(child_name.clone()),
            &flattened,
            conventions,
            child_factory,
            child_published,
        )?;
        children.insert(child_name.clone(), child);
    }

    Ok(Arc::new(ComposedScope::new(
        name, path, factory, published, name_order, bindings, children,
    )))
}

fn compose_binding(
    name: &str,
    path: &ScopePath,
    group: &[&ContributionDecl],
) -> Result<ComposedBinding, CompositionError> {
    let mut bases: Vec<BaseBinding> = Vec::new();
    let mut patches: Vec<PatchBinding> = Vec::new();
    let mut holes = 0usize;
    let mut endomorphic_patches = 0usize;
    let mut flags = ContributionFlags::default();

    for contribution in group {
        flags.eager |= contribution.flags.eager;
        flags.published |= contribution.flags.published;
        match &contribution.body {
            ContributionBody::Resource(body) => bases.push(BaseBinding {
                aggregate: false,
                body: Arc::clone(body),
                params: contribution.params.clone(),
                origin: contribution.origin.clone(),
            }),
            ContributionBody::Aggregate(body) => bases.push(BaseBinding {
                aggregate: true,
                body: Arc::clone(body),
                params: contribution.params.clone(),
                origin: contribution.origin.clone(),
            }),
            ContributionBody::Patch(body) => {
                if contribution.flags.endomorphic {
                    endomorphic_patches += 1;
                }
                patches.push(PatchBinding {
                    body: PatchBodyKind::One(Arc::clone(body)),
                    params: contribution.params.clone(),
                    origin: contribution.origin.clone(),
                });
            }
            ContributionBody::PatchMany(body) => {
                if contribution.flags.endomorphic {
                    endomorphic_patches += 1;
                }
                patches.push(PatchBinding {
                    body: PatchBodyKind::Many(Arc::clone(body)),
                    params: contribution.params.clone(),
                    origin: contribution.origin.clone(),
                });
            }
            ContributionBody::Extern => holes += 1,
        }
    }

    let contributors: Vec<String> = group
        .iter()
        .map(|contribution| format!("{}({})", contribution.origin, contribution.kind()))
        .collect();

    let role = match (bases.len(), holes, patches.len()) {
        (1, _, _) => BindingRole::Concrete {
            base: bases.pop().expect("恰好一个基础贡献"),
            patches,
        },
        (0, h, 0) if h >= 1 => BindingRole::ExternParam,
        (0, 0, p) if p >= 1 && endomorphic_patches == p => BindingRole::EndoParam { patches },
        (0, 0, p) if p >= 1 && endomorphic_patches > 0 => {
            return Err(CompositionError::MixedEndomorphism {
                name: name.to_string(),
                path: path.to_string(),
                contributors: contributors.join(", "),
            });
        }
        (b, h, p) => {
            return Err(CompositionError::ArityViolation {
                name: name.to_string(),
                path: path.to_string(),
                bases: b,
                patches: p,
                holes: h,
                contributors: contributors.join(", "),
            });
        }
    };

    Ok(ComposedBinding {
        name: name.to_string(),
        role,
        flags,
        contributors,
    })
}

fn contributor_list(group: &[&ContributionDecl]) -> String {
    group
        .iter()
        .map(|contribution| contribution.origin.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixin_abstractions::{params, ScopeDecl};
    use mixin_common::Value;

    fn base_scope() -> Arc<ScopeDecl> {
        ScopeDecl::builder("Base")
            .resource("max_connections", params([]), |_| Ok(Value::new(10i64)))
            .build()
    }

    #[test]
    fn test_compose_is_deterministic() {
        let first = ScopeDecl::builder("First")
            .resource("a", params([]), |_| Ok(Value::new(1i64)))
            .build();
        let second = ScopeDecl::builder("Second")
            .resource("b", params([]), |_| Ok(Value::new(2i64)))
            .build();

        let left = compose(&[Arc::clone(&first), Arc::clone(&second)]).unwrap();
        let right = compose(&[first, second]).unwrap();

        let left_names: Vec<&str> = left.names().collect();
        let right_names: Vec<&str> = right.names().collect();
        assert_eq!(left_names, right_names);
        assert_eq!(left_names, vec!["a", "b"]);
    }

    #[test]
    fn test_two_bases_is_arity_violation() {
        let first = base_scope();
        let second = ScopeDecl::builder("Rival")
            .resource("max_connections", params([]), |_| Ok(Value::new(20i64)))
            .build();

        let result = compose(&[first, second]);
        match result {
            Err(MixinError::Composition {
                source: CompositionError::ArityViolation { name, bases, .. },
            }) => {
                assert_eq!(name, "max_connections");
                assert_eq!(bases, 2);
            }
            other => panic!("期望组合错误, 实际: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_extern_only_becomes_parameter() {
        let decl = ScopeDecl::builder("Sqlite")
            .extern_param("database_path")
            .build();
        let root = compose(&[decl]).unwrap();
        assert_eq!(root.parameter_names(), vec!["database_path".to_string()]);
    }

    #[test]
    fn test_extern_with_patches_is_rejected() {
        let decl = ScopeDecl::builder("Broken")
            .extern_param("value")
            .patch("value", params([]), |prev, _| Ok(prev.unwrap()))
            .build();
        assert!(compose(&[decl]).is_err());
    }

    #[test]
    fn test_child_and_resource_in_same_declaration_conflict() {
        let inner = ScopeDecl::builder("inner").build();
        let decl = ScopeDecl::builder("Root")
            .resource("inner", params([]), |_| Ok(Value::new(1i64)))
            .child(inner)
            .build();
        let result = compose(&[decl]);
        assert!(matches!(
            result,
            Err(MixinError::Composition {
                source: CompositionError::ChildResourceConflict { .. }
            })
        ));
    }

    #[test]
    fn test_child_shadows_sibling_resource_after_union() {
        let provider = ScopeDecl::builder("Provider")
            .resource("database", params([]), |_| Ok(Value::new(1i64)))
            .build();
        let nested = ScopeDecl::builder("database").build();
        let structural = ScopeDecl::builder("Structural").child(nested).build();

        let root = compose(&[provider, structural]).unwrap();
        assert!(root.child("database").is_some());
        assert!(root.binding("database").is_none());
    }

    #[test]
    fn test_extend_flattening_deduplicates_shared_base() {
        let base = base_scope();
        let left = ScopeDecl::builder("Left")
            .extend(Arc::clone(&base))
            .patch("max_connections", params([]), |prev, _| {
                let previous: i64 = *prev.unwrap().expect_ref::<i64>()?;
                Ok(Value::new(previous + 1))
            })
            .build();
        let right = ScopeDecl::builder("Right")
            .extend(Arc::clone(&base))
            .patch("max_connections", params([]), |prev, _| {
                let previous: i64 = *prev.unwrap().expect_ref::<i64>()?;
                Ok(Value::new(previous + 2))
            })
            .build();

        let flattened = flatten_extends(&[left, right]).unwrap();
        let base_count = flattened
            .iter()
            .filter(|decl| Arc::ptr_eq(decl, &base))
            .count();
        assert_eq!(base_count, 1);
        assert_eq!(flattened.len(), 3);

        // 联合后仍然只有一个基础贡献, 组合成功
        assert!(compose(&flattened).is_ok());
    }

    #[test]
    fn test_eager_flag_merges_monotonically() {
        let first = ScopeDecl::builder("First")
            .resource("warmup", params([]), |_| Ok(Value::new(1i64)))
            .build();
        let second = ScopeDecl::builder("Second")
            .contribution(
                mixin_abstractions::ContributionDecl::patch("warmup", params([]), |prev, _| {
                    Ok(prev.unwrap())
                })
                .eager(),
            )
            .build();

        let root = compose(&[first, second]).unwrap();
        assert!(root.binding("warmup").unwrap().flags.eager);
    }

    #[test]
    fn test_factory_convention_marks_child() {
        let request_scope = ScopeDecl::builder("RequestScope")
            .extern_param("request")
            .build();
        let root_decl = ScopeDecl::builder("App").child(request_scope).build();
        let root = compose(&[root_decl]).unwrap();
        assert!(root.child("RequestScope").unwrap().is_factory());
    }
}
