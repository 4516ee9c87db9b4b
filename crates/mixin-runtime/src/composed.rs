//! 组合树数据模型
//!
//! 组合器的输出: 冻结的作用域树, 每个名称对应一个组合绑定。
//! 名称表按首次出现顺序排列, 保证组合的确定性。

use mixin_abstractions::{
    ContributionFlags, ParameterSpec, PatchBody, PatchManyBody, ResourceBody,
};
use mixin_common::ScopePath;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 组合后的基础贡献
#[derive(Clone)]
pub struct BaseBinding {
    /// 是否为聚合基础
    pub aggregate: bool,
    /// 函数体
    pub body: ResourceBody,
    /// 参数列表
    pub params: Vec<ParameterSpec>,
    /// 贡献来源
    pub origin: String,
}

/// 补丁函数体形态
#[derive(Clone)]
pub enum PatchBodyKind {
    One(PatchBody),
    Many(PatchManyBody),
}

/// 组合后的补丁贡献, 按声明顺序排列
#[derive(Clone)]
pub struct PatchBinding {
    /// 函数体
    pub body: PatchBodyKind,
    /// 参数列表
    pub params: Vec<ParameterSpec>,
    /// 贡献来源
    pub origin: String,
}

/// 绑定角色
///
/// 组合法则的产物: 每个名称要么恰好一个基础贡献, 要么是参数槽。
pub enum BindingRole {
    /// 一个基础贡献加任意个补丁
    Concrete {
        base: BaseBinding,
        patches: Vec<PatchBinding>,
    },
    /// 全部由外部声明构成, 成为调用时参数
    ExternParam,
    /// 全部由自同态补丁构成, 成为调用时参数槽
    EndoParam { patches: Vec<PatchBinding> },
}

/// 单个名称的组合结果
pub struct ComposedBinding {
    /// 绑定名称
    pub name: String,
    /// 绑定角色
    pub role: BindingRole,
    /// 合并后的标记（任一贡献立即求值则立即, 任一发布则发布）
    pub flags: ContributionFlags,
    /// 全部贡献来源, 用于错误报告
    pub contributors: Vec<String>,
}

impl ComposedBinding {
    /// 是否为参数槽（外部或自同态）
    pub fn is_parameter(&self) -> bool {
        matches!(self.role, BindingRole::ExternParam | BindingRole::EndoParam { .. })
    }

    /// 绑定内全部参数规格, 基础在前补丁在后
    pub fn parameter_specs(&self) -> Vec<&ParameterSpec> {
        let mut specs = Vec::new();
        match &self.role {
            BindingRole::Concrete { base, patches } => {
                specs.extend(base.params.iter());
                for patch in patches {
                    specs.extend(patch.params.iter());
                }
            }
            BindingRole::EndoParam { patches } => {
                for patch in patches {
                    specs.extend(patch.params.iter());
                }
            }
            BindingRole::ExternParam => {}
        }
        specs
    }
}

impl fmt::Debug for ComposedBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match &self.role {
            BindingRole::Concrete { patches, .. } => format!("concrete+{}patches", patches.len()),
            BindingRole::ExternParam => "extern-param".to_string(),
            BindingRole::EndoParam { patches } => format!("endo-param+{}patches", patches.len()),
        };
        f.debug_struct("ComposedBinding")
            .field("name", &self.name)
            .field("role", &role)
            .field("flags", &self.flags)
            .finish()
    }
}

/// 组合后的作用域节点
///
/// 子作用域与绑定共享一个扁平命名空间; 同名时子作用域遮蔽绑定。
pub struct ComposedScope {
    name: String,
    path: ScopePath,
    factory: bool,
    published: bool,
    name_order: Vec<String>,
    bindings: HashMap<String, ComposedBinding>,
    children: HashMap<String, Arc<ComposedScope>>,
}

impl ComposedScope {
    pub(crate) fn new(
        name: String,
        path: ScopePath,
        factory: bool,
        published: bool,
        name_order: Vec<String>,
        bindings: HashMap<String, ComposedBinding>,
        children: HashMap<String, Arc<ComposedScope>>,
    ) -> Self {
        Self {
            name,
            path,
            factory,
            published,
            name_order,
            bindings,
            children,
        }
    }

    /// 作用域名称, 根作用域为空
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 从根开始的绝对路径
    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    /// 是否为工厂作用域
    pub fn is_factory(&self) -> bool {
        self.factory
    }

    /// 作用域是否对外发布
    pub fn is_published(&self) -> bool {
        self.published
    }

    /// 按名称取绑定
    pub fn binding(&self, name: &str) -> Option<&ComposedBinding> {
        self.bindings.get(name)
    }

    /// 按名称取子作用域
    pub fn child(&self, name: &str) -> Option<&Arc<ComposedScope>> {
        self.children.get(name)
    }

    /// 名称是否存在（绑定或子作用域）
    pub fn has_name(&self, name: &str) -> bool {
        self.bindings.contains_key(name) || self.children.contains_key(name)
    }

    /// 全部名称, 按首次出现顺序
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.name_order.iter().map(String::as_str)
    }

    /// 绑定名称, 按首次出现顺序
    pub fn binding_names(&self) -> impl Iterator<Item = &str> {
        self.name_order
            .iter()
            .map(String::as_str)
            .filter(|name| self.bindings.contains_key(*name))
    }

    /// 子作用域名称, 按首次出现顺序
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.name_order
            .iter()
            .map(String::as_str)
            .filter(|name| self.children.contains_key(*name))
    }

    /// 参数名称（外部与自同态参数槽）, 按首次出现顺序
    pub fn parameter_names(&self) -> Vec<String> {
        self.binding_names()
            .filter(|name| {
                self.bindings
                    .get(*name)
                    .map(ComposedBinding::is_parameter)
                    .unwrap_or(false)
            })
            .map(str::to_string)
            .collect()
    }

    /// 立即求值的绑定名称, 按首次出现顺序
    pub fn eager_names(&self) -> Vec<String> {
        self.binding_names()
            .filter(|name| {
                self.bindings
                    .get(*name)
                    .map(|binding| binding.flags.eager && !binding.is_parameter())
                    .unwrap_or(false)
            })
            .map(str::to_string)
            .collect()
    }

    /// 已发布名称, 按首次出现顺序
    pub fn published_names(&self) -> Vec<String> {
        self.name_order
            .iter()
            .filter(|name| {
                if let Some(child) = self.children.get(*name) {
                    child.is_published()
                } else if let Some(binding) = self.bindings.get(*name) {
                    binding.flags.published
                } else {
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// 递归统计（作用域数, 绑定数）
    pub fn count_nodes(&self) -> (usize, usize) {
        let mut scopes = 1;
        let mut bindings = self.bindings.len();
        for child in self.children.values() {
            let (s, b) = child.count_nodes();
            scopes += s;
            bindings += b;
        }
        (scopes, bindings)
    }
}

impl fmt::Debug for ComposedScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedScope")
            .field("path", &self.path.to_string())
            .field("bindings", &self.bindings.len())
            .field("children", &self.children.len())
            .field("factory", &self.factory)
            .finish()
    }
}
