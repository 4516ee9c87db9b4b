//! 声明来源适配
//!
//! 把类形、模块形或扩展形的声明来源提升为不可变的声明模型。提升
//! 保持来源对象的共享关系: 同一来源经多条扩展边可达时提升为同一份
//! 声明, 组合器的去重因此得以生效。

use mixin_abstractions::{ContributionDecl, DeclarationSource, ScopeDecl};
use mixin_common::{DeclarationError, DeclarationResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 提升声明来源为声明模型
pub fn lift(source: &Arc<dyn DeclarationSource>) -> DeclarationResult<Arc<ScopeDecl>> {
    let mut cache: HashMap<*const (), Arc<ScopeDecl>> = HashMap::new();
    let mut visiting: Vec<(*const (), String)> = Vec::new();
    lift_cached(source, &mut cache, &mut visiting)
}

fn lift_cached(
    source: &Arc<dyn DeclarationSource>,
    cache: &mut HashMap<*const (), Arc<ScopeDecl>>,
    visiting: &mut Vec<(*const (), String)>,
) -> DeclarationResult<Arc<ScopeDecl>> {
    let key = Arc::as_ptr(source) as *const ();
    if let Some(lifted) = cache.get(&key) {
        return Ok(Arc::clone(lifted));
    }
    if visiting.iter().any(|(pointer, _)| *pointer == key) {
        let mut chain: Vec<String> = visiting.iter().map(|(_, name)| name.clone()).collect();
        chain.push(source.name().to_string());
        return Err(DeclarationError::ExtendCycle {
            chain: chain.join(" -> "),
        });
    }

    visiting.push((key, source.name().to_string()));
    let mut builder = ScopeDecl::builder(source.name())
        .factory(source.factory());
    if !source.published() {
        builder = builder.local();
    }
    for contribution in source.contributions() {
        builder = builder.contribution(contribution);
    }
    for child in source.children() {
        builder = builder.child(lift_cached(&child, cache, visiting)?);
    }
    for base in source.extends() {
        builder = builder.extend(lift_cached(&base, cache, visiting)?);
    }
    visiting.pop();

    let lifted = builder.build();
    debug!(
        "声明来源已提升: {}, 贡献 {} 个, 子声明 {} 个",
        lifted.name,
        lifted.contributions.len(),
        lifted.children.len()
    );
    cache.insert(key, Arc::clone(&lifted));
    Ok(lifted)
}

/// 模块项的可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemVisibility {
    /// 跟随挂载模式的默认值
    Default,
    /// 显式发布
    Public,
    /// 显式局部
    Local,
}

/// 模块形声明来源
///
/// 模块通过顶层可调用项提供贡献, 子模块成为同名的嵌套子作用域。
/// 未显式标注可见性的项跟随 `modules_public` 挂载模式。
pub struct ModuleSource {
    name: String,
    items: Vec<(ContributionDecl, ItemVisibility)>,
    submodules: Vec<ModuleSource>,
}

impl ModuleSource {
    /// 创建模块来源
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            submodules: Vec::new(),
        }
    }

    /// 添加跟随默认可见性的贡献
    pub fn item(mut self, contribution: ContributionDecl) -> Self {
        self.items.push((contribution, ItemVisibility::Default));
        self
    }

    /// 添加显式发布的贡献
    pub fn public_item(mut self, contribution: ContributionDecl) -> Self {
        self.items.push((contribution, ItemVisibility::Public));
        self
    }

    /// 添加显式局部的贡献
    pub fn local_item(mut self, contribution: ContributionDecl) -> Self {
        self.items.push((contribution, ItemVisibility::Local));
        self
    }

    /// 添加子模块
    pub fn submodule(mut self, module: ModuleSource) -> Self {
        self.submodules.push(module);
        self
    }

    /// 按挂载模式提升为声明模型
    pub fn into_decl(self, modules_public: bool) -> Arc<ScopeDecl> {
        let mut builder = ScopeDecl::builder(self.name.clone());
        for (contribution, visibility) in self.items {
            let contribution = match visibility {
                ItemVisibility::Default => {
                    if modules_public {
                        contribution.public()
                    } else {
                        contribution.local()
                    }
                }
                ItemVisibility::Public => contribution.public(),
                ItemVisibility::Local => contribution.local(),
            };
            builder = builder.contribution(contribution.with_origin(self.name.clone()));
        }
        for submodule in self.submodules {
            builder = builder.child(submodule.into_decl(modules_public));
        }
        builder.build()
    }
}
