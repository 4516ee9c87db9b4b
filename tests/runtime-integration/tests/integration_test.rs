//! 混入注入框架的端到端场景测试

use mixin_abstractions::{call_args, params, ContributionDecl, ScopeDecl};
use mixin_common::Value;
use mixin_composition::{evaluate, RootBuilder};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 场景: 基础加外部声明
///
/// `Sqlite` 声明外部的 `database_path` 与依赖它的 `connection`;
/// 调用组合根供给路径后读取连接。
#[test]
fn test_base_plus_extern_scenario() {
    let sqlite = ScopeDecl::builder("Sqlite")
        .extern_param("database_path")
        .resource("connection", params(["database_path"]), |injected| {
            let path: &String = injected.get("database_path")?;
            Ok(Value::new(format!("sqlite-handle[{}]", path)))
        })
        .build();

    let root = evaluate([sqlite]).unwrap();
    let instance = root
        .call(call_args([(
            "database_path",
            Value::new(":memory:".to_string()),
        )]))
        .unwrap();
    assert_eq!(
        instance
            .read("connection")
            .unwrap()
            .expect_ref::<String>()
            .unwrap(),
        "sqlite-handle[:memory:]"
    );
}

/// 场景: 聚合基础加多个补丁, 其中一个补丁依赖外部声明
#[test]
fn test_aggregate_pragmas_with_extern_patch() {
    let pragma_base = ScopeDecl::builder("PragmaBase")
        .aggregate("startup_pragmas", params(["startup_pragmas"]), |injected| {
            let outputs: &Vec<Value> = injected.get("startup_pragmas")?;
            let set: BTreeSet<String> = outputs
                .iter()
                .map(|value| value.expect_ref::<String>().map(Clone::clone))
                .collect::<Result<_, _>>()?;
            Ok(Value::new(set))
        })
        .build();
    let wal_mode = ScopeDecl::builder("WalMode")
        .patch("startup_pragmas", params([]), |_, _| {
            Ok(Value::new("PRAGMA journal_mode=WAL".to_string()))
        })
        .build();
    let foreign_keys = ScopeDecl::builder("ForeignKeys")
        .patch("startup_pragmas", params([]), |_, _| {
            Ok(Value::new("PRAGMA foreign_keys=ON".to_string()))
        })
        .build();
    let user_version = ScopeDecl::builder("UserVersionPragma")
        .extern_param("schema_version")
        .patch("startup_pragmas", params(["schema_version"]), |_, injected| {
            let version: &i64 = injected.get("schema_version")?;
            Ok(Value::new(format!("PRAGMA user_version={}", version)))
        })
        .build();

    let root = evaluate([pragma_base, wal_mode, foreign_keys, user_version]).unwrap();
    assert_eq!(root.parameter_names(), vec!["schema_version".to_string()]);

    let instance = root
        .call(call_args([("schema_version", Value::new(3i64))]))
        .unwrap();
    let pragmas = instance.read("startup_pragmas").unwrap();
    let expected: BTreeSet<String> = [
        "PRAGMA journal_mode=WAL".to_string(),
        "PRAGMA foreign_keys=ON".to_string(),
        "PRAGMA user_version=3".to_string(),
    ]
    .into();
    assert_eq!(pragmas.expect_ref::<BTreeSet<String>>().unwrap(), &expected);
}

/// 场景: 立即求值预热
///
/// 带副作用的立即资源在 `evaluate` 返回前写入, 未读取任何发布名称
/// 即可观察到副作用。
#[test]
fn test_eager_prewarm_runs_before_any_access() {
    let database: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&database);
    let decl = ScopeDecl::builder("App")
        .contribution(
            ContributionDecl::resource("seed_row", params([]), move |_| {
                sink.lock().unwrap().push("seed".to_string());
                Ok(Value::new(()))
            })
            .eager(),
        )
        .build();

    let _root = evaluate([decl]).unwrap();
    // 未触碰任何发布名称, 行已写入
    assert_eq!(database.lock().unwrap().as_slice(), ["seed".to_string()]);
}

/// 场景: 工厂子作用域
///
/// 外层资源声明 `RequestScope` 参数, 两次调用产生备忘独立的实例。
#[test]
fn test_request_scope_factory_independent_instances() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evaluations);
    let request_scope = ScopeDecl::builder("RequestScope")
        .extern_param("request")
        .resource("user_id", params(["request"]), move |injected| {
            counter.fetch_add(1, Ordering::SeqCst);
            let request: &String = injected.get("request")?;
            let id: i64 = request.rsplit('/').next().unwrap_or("0").parse()?;
            Ok(Value::new(id))
        })
        .build();
    let app = ScopeDecl::builder("App").child(request_scope).build();

    let root = evaluate([app]).unwrap();
    let factory = root.scope("RequestScope");

    let first = factory
        .call(call_args([(
            "request",
            Value::new("/users/42".to_string()),
        )]))
        .unwrap();
    let second = factory
        .call(call_args([("request", Value::new("/users/7".to_string()))]))
        .unwrap();

    assert_eq!(*first.read("user_id").unwrap().expect_ref::<i64>().unwrap(), 42);
    assert_eq!(*second.read("user_id").unwrap().expect_ref::<i64>().unwrap(), 7);
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);

    // 同一实例重复读取命中备忘表
    assert_eq!(*first.read("user_id").unwrap().expect_ref::<i64>().unwrap(), 42);
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);

    assert_eq!(root.active_instances(), 2);
    drop(first);
    drop(second);
    assert_eq!(root.active_instances(), 0);
}

/// 场景: 路径依赖的联合挂载线性化
///
/// `Base` 经两条扩展链可达, 基础贡献只挂载一次:
/// 10 (Base) + 1 (object1.MyInner) + 2 (object2.MyInner) + 100 (MyObjectA)。
#[test]
fn test_path_dependent_extend_linearization() {
    let base = ScopeDecl::builder("Base")
        .resource("foo", params([]), |_| Ok(Value::new(10i64)))
        .build();

    let inner_of = |amount: i64| {
        ScopeDecl::builder("MyInner")
            .extend(Arc::clone(&base))
            .patch("foo", params([]), move |prev, _| {
                let previous: i64 = *prev.unwrap().expect_ref::<i64>()?;
                Ok(Value::new(previous + amount))
            })
            .build()
    };
    let inner1 = inner_of(1);
    let inner2 = inner_of(2);

    let combined = ScopeDecl::builder("MyObjectA")
        .extend(inner1)
        .extend(inner2)
        .patch("foo", params([]), |prev, _| {
            let previous: i64 = *prev.unwrap().expect_ref::<i64>()?;
            Ok(Value::new(100 + previous))
        })
        .build();
    let root_decl = ScopeDecl::builder("Root").child(combined).build();

    let root = evaluate([root_decl]).unwrap();
    let foo = root.scope("MyObjectA").read("foo").unwrap();
    assert_eq!(*foo.expect_ref::<i64>().unwrap(), 113);
}

/// 场景: 跨命名空间的依赖注入
///
/// 不同声明中的资源通过裸参数名称互相引用。
#[test]
fn test_cross_namespace_references_by_bare_name() {
    let branch0 = ScopeDecl::builder("branch0")
        .aggregate("deduplicated_tags", params(["deduplicated_tags"]), |injected| {
            let outputs: &Vec<Value> = injected.get("deduplicated_tags")?;
            let set: BTreeSet<String> = outputs
                .iter()
                .map(|value| value.expect_ref::<String>().map(Clone::clone))
                .collect::<Result<_, _>>()?;
            Ok(Value::new(set))
        })
        .build();
    let branch1 = ScopeDecl::builder("branch1")
        .patch("deduplicated_tags", params([]), |_, _| {
            Ok(Value::new("tag1".to_string()))
        })
        .resource("another_dependency", params([]), |_| {
            Ok(Value::new("dependency_value".to_string()))
        })
        .build();
    let branch2 = ScopeDecl::builder("branch2")
        .extern_param("another_dependency")
        .patch("deduplicated_tags", params(["another_dependency"]), |_, injected| {
            let dependency: &String = injected.get("another_dependency")?;
            Ok(Value::new(format!("tag2_{}", dependency)))
        })
        .build();

    let root = evaluate([branch0, branch1, branch2]).unwrap();
    let tags = root.get("deduplicated_tags").unwrap();
    let expected: BTreeSet<String> =
        ["tag1".to_string(), "tag2_dependency_value".to_string()].into();
    assert_eq!(tags.expect_ref::<BTreeSet<String>>().unwrap(), &expected);
}

/// 场景: 资源体返回已调度的任务句柄
///
/// 框架不等待异步工作; 资源体返回已经启动的任务句柄, 全部依赖方
/// 共享同一句柄。
#[tokio::test]
async fn test_shared_task_handle_between_dependents() {
    type SharedHandle = tokio::sync::Mutex<Option<tokio::task::JoinHandle<i64>>>;

    let decl = ScopeDecl::builder("App")
        .resource("warmup_task", params([]), |_| {
            let handle = tokio::spawn(async { 21i64 * 2 });
            Ok(Value::new(tokio::sync::Mutex::new(Some(handle))))
        })
        .resource("first_user", params(["warmup_task"]), |injected| {
            let task = injected.value("warmup_task")?;
            Ok(task.clone())
        })
        .resource("second_user", params(["warmup_task"]), |injected| {
            let task = injected.value("warmup_task")?;
            Ok(task.clone())
        })
        .build();

    let root = evaluate([decl]).unwrap();
    let first = root.get("first_user").unwrap();
    let second = root.get("second_user").unwrap();

    let first_handle = first.downcast_arc::<SharedHandle>().unwrap();
    let second_handle = second.downcast_arc::<SharedHandle>().unwrap();
    // 两个依赖方拿到的是同一个任务句柄
    assert!(Arc::ptr_eq(&first_handle, &second_handle));

    let handle = first_handle.lock().await.take().unwrap();
    assert_eq!(handle.await.unwrap(), 42);
}

/// 场景: 构建器与静态验证协同
#[test]
fn test_builder_with_validation_and_conventions() {
    let session_factory = ScopeDecl::builder("SessionFactory")
        .extern_param("session_id")
        .resource("session", params(["session_id"]), |injected| {
            let id: &String = injected.get("session_id")?;
            Ok(Value::new(format!("session-{}", id)))
        })
        .build();
    let app = ScopeDecl::builder("App")
        .child(session_factory)
        .resource("ready", params([]), |_| Ok(Value::new(true)))
        .build();

    let root = RootBuilder::new()
        .add_declaration(app)
        .enable_validation(true)
        .build()
        .unwrap();

    assert!(root.validate().is_empty());
    assert!(*root.get("ready").unwrap().expect_ref::<bool>().unwrap());

    // 名称约定将 SessionFactory 识别为工厂, 每次调用产生新实例
    let factory = root.scope("SessionFactory");
    let session = factory
        .call(call_args([("session_id", Value::new("abc".to_string()))]))
        .unwrap();
    assert_eq!(
        session.read("session").unwrap().expect_ref::<String>().unwrap(),
        "session-abc"
    );
}
