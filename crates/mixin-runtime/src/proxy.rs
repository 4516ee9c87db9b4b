//! 代理句柄实现
//!
//! 注入时具体化的导航句柄: 绑定到一个已解析的基准作用域实例, 加一段
//! 尚未解析的后缀路径。导航只延长后缀; 读取、调用与名称列举才会逐段
//! 解析后缀, 并在途中透明跟随符号链接。

use crate::evaluator::{self, EvalContext};
use crate::instance;
use crate::resolver;
use crate::scope::ScopeInstance;
use mixin_abstractions::{CallArgs, ScopeLink, ScopeNavigator};
use mixin_common::{
    MixinError, MixinResult, RelativePath, ResolveError, ResolveResult, ScopePath, Value,
};
use std::sync::Arc;

/// 组合树中的代理句柄
pub struct Proxy {
    base: Arc<ScopeInstance>,
    suffix: Vec<String>,
}

impl Proxy {
    /// 直接绑定到作用域实例的句柄, 后缀为空
    pub fn bound(base: Arc<ScopeInstance>) -> Self {
        Self {
            base,
            suffix: Vec::new(),
        }
    }

    /// 绑定句柄并包装为 [`ScopeLink`]
    pub fn link(base: Arc<ScopeInstance>) -> ScopeLink {
        ScopeLink(Arc::new(Self::bound(base)))
    }

    /// 解析后缀得到目标作用域实例
    ///
    /// 每次访问重新解析, 链接目标在后续实例中具体化后即可命中。
    fn resolve_target(&self) -> MixinResult<Arc<ScopeInstance>> {
        if self.suffix.is_empty() {
            return Ok(Arc::clone(&self.base));
        }
        let mut ctx = EvalContext::new(self.base.depth_limit());
        resolver::descend(&self.base, &self.suffix, &mut ctx).map_err(MixinError::from)
    }
}

impl ScopeNavigator for Proxy {
    fn path(&self) -> ScopePath {
        let mut path = self.base.path().clone();
        for segment in &self.suffix {
            path = path.child(segment.clone());
        }
        path
    }

    fn navigate(&self, name: &str) -> ScopeLink {
        let mut suffix = self.suffix.clone();
        suffix.push(name.to_string());
        ScopeLink(Arc::new(Proxy {
            base: Arc::clone(&self.base),
            suffix,
        }))
    }

    fn navigate_relative(&self, path: &RelativePath) -> ResolveResult<ScopeLink> {
        let mut suffix = self.suffix.clone();
        let mut base = Arc::clone(&self.base);
        let mut remaining = path.levels_up;
        // 先弹出未解析的后缀段, 再沿实例父链上溯
        while remaining > 0 && !suffix.is_empty() {
            suffix.pop();
            remaining -= 1;
        }
        while remaining > 0 {
            match base.parent_instance()? {
                Some(parent) => base = parent,
                None => {
                    return Err(ResolveError::AboveRoot {
                        levels_up: path.levels_up,
                        at: self.path().to_string(),
                    });
                }
            }
            remaining -= 1;
        }
        suffix.extend(path.segments.iter().cloned());
        Ok(ScopeLink(Arc::new(Proxy { base, suffix })))
    }

    fn navigate_absolute(&self, path: &ScopePath) -> ResolveResult<ScopeLink> {
        let root = resolver::root_of(&self.base)?;
        Ok(ScopeLink(Arc::new(Proxy {
            base: root,
            suffix: path.segments().to_vec(),
        })))
    }

    fn read(&self, name: &str) -> MixinResult<Value> {
        let target = self.resolve_target()?;
        if let Some(child_node) = target.node().child(name) {
            if !child_node.is_published() {
                return Err(ResolveError::NotPublished {
                    name: name.to_string(),
                    at: target.path().to_string(),
                }
                .into());
            }
            let child = target
                .child_instance(name)
                .expect("组合节点存在的子作用域必可实例化");
            return Ok(Value::new(Proxy::link(child)));
        }
        if let Some(binding) = target.node().binding(name) {
            if !binding.flags.published {
                return Err(ResolveError::NotPublished {
                    name: name.to_string(),
                    at: target.path().to_string(),
                }
                .into());
            }
            return evaluator::force(&target, name).map_err(MixinError::from);
        }
        Err(ResolveError::UnresolvedName {
            name: name.to_string(),
            origin: target.path().to_string(),
            searched: target.path().to_string(),
        }
        .into())
    }

    fn call(&self, args: CallArgs) -> MixinResult<ScopeLink> {
        let target = self.resolve_target()?;
        let instance = instance::call_scope(&target, args)?;
        Ok(ScopeLink(Arc::new(Proxy::bound(instance))))
    }

    fn parameter_names(&self) -> MixinResult<Vec<String>> {
        Ok(self.resolve_target()?.node().parameter_names())
    }

    fn published_names(&self) -> MixinResult<Vec<String>> {
        Ok(self.resolve_target()?.node().published_names())
    }
}
