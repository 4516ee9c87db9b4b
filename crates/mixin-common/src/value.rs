//! 动态值定义
//!
//! 资源体的输入输出统一用 [`Value`] 承载, 按名称注入时不依赖具体类型

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 资源体抛出的错误类型
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// 自同态补丁值
///
/// 资源基础贡献的补丁输出即为该类型: 接收前值, 返回替换值。
pub type Endo = Arc<dyn Fn(Value) -> Result<Value, BodyError> + Send + Sync>;

/// 资源求值产生的动态值
///
/// 内部为 `Arc<dyn Any + Send + Sync>`, 克隆为浅拷贝, 同一备忘表条目
/// 的所有读取者共享同一份数据。
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// 包装任意值
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 包装已有的 Arc
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// 包装自同态函数
    pub fn endo<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BodyError> + Send + Sync + 'static,
    {
        Self::new::<Endo>(Arc::new(f))
    }

    /// 完整类型名称
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 简短类型名称（不包含模块路径）
    pub fn short_type_name(&self) -> &str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    /// 检查内部值是否为指定类型
    pub fn is<T: Any>(&self) -> bool {
        self.inner.as_ref().is::<T>()
    }

    /// 按类型借用内部值
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_ref().downcast_ref::<T>()
    }

    /// 按类型取出共享所有权
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// 按类型借用内部值, 失败时返回可抛出的错误
    pub fn expect_ref<T: Any>(&self) -> Result<&T, BodyError> {
        self.downcast_ref::<T>().ok_or_else(|| {
            format!(
                "值类型转换失败: 期望 {}, 实际 {}",
                std::any::type_name::<T>(),
                self.type_name
            )
            .into()
        })
    }

    /// 按自同态类型取出补丁函数
    pub fn expect_endo(&self) -> Option<Endo> {
        self.downcast_ref::<Endo>().cloned()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type_name", &self.type_name)
            .finish()
    }
}
