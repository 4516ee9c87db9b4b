//! 声明模型定义
//!
//! 组合前作用域及其命名贡献的不可变内存表示, 不携带任何解析逻辑

use crate::injection::Injected;
use mixin_common::{BodyError, Value};
use std::fmt;
use std::sync::Arc;

/// 贡献形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContributionKind {
    /// 基础贡献: 产生一个值, 补丁按顺序包装前值
    Resource,
    /// 基础贡献: 聚合收集全部补丁输出后一次性消费
    Aggregate,
    /// 补丁贡献: 消费前值并返回替换值
    Patch,
    /// 补丁贡献: 一次产出有序的多个补丁
    PatchMany,
    /// 外部声明: 值必须从外部提供, 没有函数体
    Extern,
}

impl ContributionKind {
    /// 是否为基础贡献
    pub fn is_base(&self) -> bool {
        matches!(self, Self::Resource | Self::Aggregate)
    }

    /// 是否为补丁贡献
    pub fn is_patch(&self) -> bool {
        matches!(self, Self::Patch | Self::PatchMany)
    }

    /// 形态名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Aggregate => "aggregate",
            Self::Patch => "patch",
            Self::PatchMany => "patch_many",
            Self::Extern => "extern",
        }
    }
}

impl fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 贡献标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContributionFlags {
    /// 作用域物化时立即求值
    pub eager: bool,
    /// 对外部调用者可见
    pub published: bool,
    /// 补丁体为自同态（由用户标注, 不做签名推断）
    pub endomorphic: bool,
}

/// 参数规格
///
/// 参数名称是唯一的解析键; `proxy` 标记表示注入代理句柄而非强制值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    /// 参数名称
    pub name: String,
    /// 是否请求代理注入
    pub proxy: bool,
}

impl ParameterSpec {
    /// 普通值参数
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proxy: false,
        }
    }

    /// 代理请求参数
    pub fn proxy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proxy: true,
        }
    }
}

/// 从名称数组构造普通值参数列表
pub fn params<const N: usize>(names: [&str; N]) -> Vec<ParameterSpec> {
    names.into_iter().map(ParameterSpec::value).collect()
}

/// 基础贡献的函数体
pub type ResourceBody = Arc<dyn Fn(&Injected) -> Result<Value, BodyError> + Send + Sync>;

/// 单补丁贡献的函数体
///
/// 资源基础或自同态参数槽下接收 `Some(前值)`, 聚合基础下接收 `None`。
pub type PatchBody = Arc<dyn Fn(Option<Value>, &Injected) -> Result<Value, BodyError> + Send + Sync>;

/// 多补丁贡献的函数体, 输出顺序保持
pub type PatchManyBody = Arc<dyn Fn(&Injected) -> Result<Vec<Value>, BodyError> + Send + Sync>;

/// 贡献函数体
#[derive(Clone)]
pub enum ContributionBody {
    Resource(ResourceBody),
    Aggregate(ResourceBody),
    Patch(PatchBody),
    PatchMany(PatchManyBody),
    Extern,
}

impl ContributionBody {
    /// 函数体对应的贡献形态
    pub fn kind(&self) -> ContributionKind {
        match self {
            Self::Resource(_) => ContributionKind::Resource,
            Self::Aggregate(_) => ContributionKind::Aggregate,
            Self::Patch(_) => ContributionKind::Patch,
            Self::PatchMany(_) => ContributionKind::PatchMany,
            Self::Extern => ContributionKind::Extern,
        }
    }
}

impl fmt::Debug for ContributionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} body>", self.kind())
    }
}

/// 单个命名贡献的声明
#[derive(Debug, Clone)]
pub struct ContributionDecl {
    /// 贡献名称
    pub name: String,
    /// 声明的参数列表
    pub params: Vec<ParameterSpec>,
    /// 函数体
    pub body: ContributionBody,
    /// 贡献标记
    pub flags: ContributionFlags,
    /// 贡献来源标识, 用于错误报告
    pub origin: String,
}

impl ContributionDecl {
    fn new(name: impl Into<String>, params: Vec<ParameterSpec>, body: ContributionBody) -> Self {
        Self {
            name: name.into(),
            params,
            body,
            flags: ContributionFlags {
                published: true,
                ..Default::default()
            },
            origin: String::new(),
        }
    }

    /// 资源基础贡献
    pub fn resource<F>(name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(&Injected) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        Self::new(name, params, ContributionBody::Resource(Arc::new(body)))
    }

    /// 聚合基础贡献
    ///
    /// 函数体中与贡献同名的参数接收收集到的补丁输出序列 `Vec<Value>`。
    pub fn aggregate<F>(name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(&Injected) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        Self::new(name, params, ContributionBody::Aggregate(Arc::new(body)))
    }

    /// 单补丁贡献
    pub fn patch<F>(name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(Option<Value>, &Injected) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        Self::new(name, params, ContributionBody::Patch(Arc::new(body)))
    }

    /// 多补丁贡献
    pub fn patch_many<F>(name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(&Injected) -> Result<Vec<Value>, BodyError> + Send + Sync + 'static,
    {
        Self::new(name, params, ContributionBody::PatchMany(Arc::new(body)))
    }

    /// 外部声明
    pub fn extern_param(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new(), ContributionBody::Extern)
    }

    /// 标记为立即求值
    pub fn eager(mut self) -> Self {
        self.flags.eager = true;
        self
    }

    /// 标记为局部贡献（不对外发布）
    pub fn local(mut self) -> Self {
        self.flags.published = false;
        self
    }

    /// 标记为对外发布
    pub fn public(mut self) -> Self {
        self.flags.published = true;
        self
    }

    /// 标记补丁体为自同态
    pub fn endomorphic(mut self) -> Self {
        self.flags.endomorphic = true;
        self
    }

    /// 设置贡献来源标识
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// 贡献形态
    pub fn kind(&self) -> ContributionKind {
        self.body.kind()
    }
}

/// 作用域声明
///
/// 有序的贡献列表加有序的子作用域声明, 构造后不可变, 经 `Arc` 共享。
/// `extends` 记录需要与本声明联合挂载的兄弟声明。
#[derive(Debug)]
pub struct ScopeDecl {
    /// 作用域名称
    pub name: String,
    /// 有序贡献
    pub contributions: Vec<ContributionDecl>,
    /// 有序子作用域声明
    pub children: Vec<Arc<ScopeDecl>>,
    /// 联合挂载的兄弟声明
    pub extends: Vec<Arc<ScopeDecl>>,
    /// 是否为工厂作用域
    pub factory: bool,
    /// 作用域本身是否对外发布
    pub published: bool,
}

impl ScopeDecl {
    /// 创建作用域声明构建器
    pub fn builder(name: impl Into<String>) -> ScopeDeclBuilder {
        ScopeDeclBuilder {
            name: name.into(),
            contributions: Vec::new(),
            children: Vec::new(),
            extends: Vec::new(),
            factory: false,
            published: true,
        }
    }
}

/// 作用域声明构建器
pub struct ScopeDeclBuilder {
    name: String,
    contributions: Vec<ContributionDecl>,
    children: Vec<Arc<ScopeDecl>>,
    extends: Vec<Arc<ScopeDecl>>,
    factory: bool,
    published: bool,
}

impl ScopeDeclBuilder {
    /// 添加任意贡献
    pub fn contribution(mut self, contribution: ContributionDecl) -> Self {
        self.contributions.push(contribution);
        self
    }

    /// 添加资源基础贡献
    pub fn resource<F>(self, name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(&Injected) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        self.contribution(ContributionDecl::resource(name, params, body))
    }

    /// 添加聚合基础贡献
    pub fn aggregate<F>(self, name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(&Injected) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        self.contribution(ContributionDecl::aggregate(name, params, body))
    }

    /// 添加单补丁贡献
    pub fn patch<F>(self, name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(Option<Value>, &Injected) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        self.contribution(ContributionDecl::patch(name, params, body))
    }

    /// 添加多补丁贡献
    pub fn patch_many<F>(self, name: impl Into<String>, params: Vec<ParameterSpec>, body: F) -> Self
    where
        F: Fn(&Injected) -> Result<Vec<Value>, BodyError> + Send + Sync + 'static,
    {
        self.contribution(ContributionDecl::patch_many(name, params, body))
    }

    /// 添加外部声明
    pub fn extern_param(self, name: impl Into<String>) -> Self {
        self.contribution(ContributionDecl::extern_param(name))
    }

    /// 添加子作用域声明
    pub fn child(mut self, child: Arc<ScopeDecl>) -> Self {
        self.children.push(child);
        self
    }

    /// 添加联合挂载的兄弟声明
    pub fn extend(mut self, base: Arc<ScopeDecl>) -> Self {
        self.extends.push(base);
        self
    }

    /// 显式标记为工厂作用域
    pub fn factory(mut self, factory: bool) -> Self {
        self.factory = factory;
        self
    }

    /// 标记作用域为局部（不对外发布）
    pub fn local(mut self) -> Self {
        self.published = false;
        self
    }

    /// 构建不可变声明
    ///
    /// 未设置来源标识的贡献以作用域名称作为来源。
    pub fn build(self) -> Arc<ScopeDecl> {
        let name = self.name;
        let contributions = self
            .contributions
            .into_iter()
            .map(|mut contribution| {
                if contribution.origin.is_empty() {
                    contribution.origin = name.clone();
                }
                contribution
            })
            .collect();
        Arc::new(ScopeDecl {
            name,
            contributions,
            children: self.children,
            extends: self.extends,
            factory: self.factory,
            published: self.published,
        })
    }
}
