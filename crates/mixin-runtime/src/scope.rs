//! 运行时作用域实例
//!
//! 组合节点加一张按名称写一次的备忘表。组合作用域与实例作用域共用
//! 本类型: 前者 `supplied` 为空, 后者携带调用时传入的参数值。
//!
//! 父链向上为弱引用, 子实例缓存向下为强引用, 整棵树随根句柄释放。

use crate::composed::ComposedScope;
use crate::instance::InstanceTracker;
use chrono::{DateTime, Utc};
use mixin_common::{EvaluateError, ResolveError, ResolveResult, ScopePath, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

/// 默认最大解析深度
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// 求值计数器
///
/// 整棵树共享一份, 供运行统计使用。
#[derive(Debug, Default)]
pub struct EvalCounters {
    forced: AtomicU64,
    cache_hits: AtomicU64,
}

impl EvalCounters {
    pub(crate) fn forced(&self) {
        self.forced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// （已强制求值次数, 缓存命中次数）
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.forced.load(Ordering::Relaxed),
            self.cache_hits.load(Ordering::Relaxed),
        )
    }
}

/// 备忘表条目
#[derive(Debug, Clone)]
pub enum MemoEntry {
    /// 求值中, 重入即为循环依赖
    InProgress,
    /// 最终值
    Ready(Value),
    /// 已缓存的求值错误, 重复访问返回同一错误
    Failed(EvaluateError),
    /// 符号链接, 每次访问重新解析目标, 目标具体化后升级为最终值
    Linked(ScopePath),
}

/// 备忘表占位结果
pub(crate) enum MemoBegin {
    Ready(Value),
    Failed(EvaluateError),
    Linked(ScopePath),
    InProgressConflict,
    Started,
}

/// 运行时作用域实例
pub struct ScopeInstance {
    node: Arc<ComposedScope>,
    parent: Option<Weak<ScopeInstance>>,
    supplied: BTreeMap<String, Value>,
    memo: Mutex<HashMap<String, MemoEntry>>,
    links: Mutex<HashMap<String, ScopePath>>,
    children: Mutex<HashMap<String, Arc<ScopeInstance>>>,
    tracker: Option<Arc<InstanceTracker>>,
    counters: Arc<EvalCounters>,
    depth_limit: usize,
    /// 实例标识
    pub id: Uuid,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl ScopeInstance {
    /// 创建根实例
    pub fn new_root(
        node: Arc<ComposedScope>,
        depth_limit: usize,
        tracker: Option<Arc<InstanceTracker>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            node,
            parent: None,
            supplied: BTreeMap::new(),
            memo: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
            children: Mutex::new(HashMap::new()),
            tracker,
            counters: Arc::new(EvalCounters::default()),
            depth_limit,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        })
    }

    fn new_child(parent: &Arc<Self>, node: Arc<ComposedScope>) -> Arc<Self> {
        Arc::new(Self {
            node,
            parent: Some(Arc::downgrade(parent)),
            supplied: BTreeMap::new(),
            memo: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
            children: Mutex::new(HashMap::new()),
            tracker: parent.tracker.clone(),
            counters: Arc::clone(&parent.counters),
            depth_limit: parent.depth_limit,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        })
    }

    /// 创建调用产生的实例作用域
    ///
    /// 父链与被调用作用域共享, 备忘表独立, 传入值直接安装为最终值。
    pub(crate) fn new_instance(
        called: &Arc<Self>,
        supplied: BTreeMap<String, Value>,
    ) -> Arc<Self> {
        let memo: HashMap<String, MemoEntry> = supplied
            .iter()
            .filter(|(name, _)| {
                called
                    .node
                    .binding(name)
                    .map(|binding| matches!(binding.role, crate::composed::BindingRole::ExternParam))
                    .unwrap_or(false)
            })
            .map(|(name, value)| (name.clone(), MemoEntry::Ready(value.clone())))
            .collect();
        Arc::new(Self {
            node: Arc::clone(&called.node),
            parent: called.parent.clone(),
            supplied,
            memo: Mutex::new(memo),
            links: Mutex::new(HashMap::new()),
            children: Mutex::new(HashMap::new()),
            tracker: called.tracker.clone(),
            counters: Arc::clone(&called.counters),
            depth_limit: called.depth_limit,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
        })
    }

    /// 组合节点
    pub fn node(&self) -> &Arc<ComposedScope> {
        &self.node
    }

    /// 绝对路径
    pub fn path(&self) -> &ScopePath {
        self.node.path()
    }

    /// 最大解析深度
    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    /// 实例追踪器
    pub(crate) fn tracker(&self) -> Option<&Arc<InstanceTracker>> {
        self.tracker.as_ref()
    }

    /// 求值计数器
    pub fn counters(&self) -> &Arc<EvalCounters> {
        &self.counters
    }

    /// 父实例
    ///
    /// 根实例返回 `Ok(None)`; 父实例已随根句柄释放时报错。
    pub fn parent_instance(&self) -> ResolveResult<Option<Arc<ScopeInstance>>> {
        match &self.parent {
            None => Ok(None),
            Some(weak) => match weak.upgrade() {
                Some(parent) => Ok(Some(parent)),
                None => Err(ResolveError::ScopeReleased {
                    at: self.path().to_string(),
                }),
            },
        }
    }

    /// 调用时传入的参数值
    pub fn supplied(&self, name: &str) -> Option<Value> {
        self.supplied.get(name).cloned()
    }

    /// 子作用域实例, 同名重复访问返回同一实例
    pub fn child_instance(self: &Arc<Self>, name: &str) -> Option<Arc<ScopeInstance>> {
        let node = Arc::clone(self.node.child(name)?);
        let mut children = self.children.lock().expect("子实例缓存锁");
        Some(
            children
                .entry(name.to_string())
                .or_insert_with(|| Self::new_child(self, node))
                .clone(),
        )
    }

    /// 占位备忘表条目
    ///
    /// 单次加锁完成检查与占位, 返回既有结果或开始求值的许可。
    pub(crate) fn memo_begin(&self, name: &str) -> MemoBegin {
        let mut memo = self.memo.lock().expect("备忘表锁");
        match memo.get(name) {
            Some(MemoEntry::Ready(value)) => MemoBegin::Ready(value.clone()),
            Some(MemoEntry::Failed(error)) => MemoBegin::Failed(error.clone()),
            Some(MemoEntry::Linked(path)) => MemoBegin::Linked(path.clone()),
            Some(MemoEntry::InProgress) => MemoBegin::InProgressConflict,
            None => {
                memo.insert(name.to_string(), MemoEntry::InProgress);
                MemoBegin::Started
            }
        }
    }

    /// 写入最终条目
    pub(crate) fn memo_finish(&self, name: &str, entry: MemoEntry) {
        let mut memo = self.memo.lock().expect("备忘表锁");
        memo.insert(name.to_string(), entry);
    }

    /// 撤销占位（不缓存的失败场景）
    pub(crate) fn memo_abandon(&self, name: &str) {
        let mut memo = self.memo.lock().expect("备忘表锁");
        if matches!(memo.get(name), Some(MemoEntry::InProgress)) {
            memo.remove(name);
        }
    }

    /// 当前备忘表条目
    pub fn memo_entry(&self, name: &str) -> Option<MemoEntry> {
        self.memo.lock().expect("备忘表锁").get(name).cloned()
    }

    /// 记录符号链接目标
    pub(crate) fn record_link(&self, name: &str, target: ScopePath) {
        let mut links = self.links.lock().expect("链接表锁");
        links.insert(name.to_string(), target);
    }

    /// 查询符号链接目标
    pub fn link_target(&self, name: &str) -> Option<ScopePath> {
        self.links.lock().expect("链接表锁").get(name).cloned()
    }
}

impl Drop for ScopeInstance {
    fn drop(&mut self) {
        if let Some(tracker) = &self.tracker {
            tracker.remove(self.id);
        }
    }
}

impl std::fmt::Debug for ScopeInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeInstance")
            .field("path", &self.path().to_string())
            .field("id", &self.id)
            .field("supplied", &self.supplied.len())
            .finish()
    }
}
