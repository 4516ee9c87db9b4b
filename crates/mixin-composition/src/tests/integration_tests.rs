//! 组合层集成测试

use crate::builder::RootBuilder;
use crate::declare::ModuleSource;
use crate::evaluate::{evaluate, evaluate_with};
use crate::options::EvaluateOptions;
use mixin_abstractions::{call_args, params, ContributionDecl, ScopeDecl};
use mixin_common::{MixinError, Value};
use std::sync::Arc;

fn base_scope() -> Arc<ScopeDecl> {
    ScopeDecl::builder("Base")
        .resource("max_connections", params([]), |_| Ok(Value::new(10i64)))
        .build()
}

#[test]
fn test_patch_multiplier_via_facade() {
    let high_load = ScopeDecl::builder("HighLoad")
        .patch("max_connections", params([]), |prev, _| {
            let previous: i64 = *prev.unwrap().expect_ref::<i64>()?;
            Ok(Value::new(previous * 2))
        })
        .build();

    let root = evaluate([base_scope(), high_load]).unwrap();
    let value = root.get("max_connections").unwrap();
    assert_eq!(*value.expect_ref::<i64>().unwrap(), 20);
}

#[test]
fn test_extern_parameter_makes_root_callable() {
    let sqlite = ScopeDecl::builder("Sqlite")
        .extern_param("database_path")
        .resource("connection", params(["database_path"]), |injected| {
            let path: &String = injected.get("database_path")?;
            Ok(Value::new(format!("open({})", path)))
        })
        .build();

    let root = evaluate([sqlite]).unwrap();
    assert_eq!(root.parameter_names(), vec!["database_path".to_string()]);

    let instance = root
        .call(call_args([(
            "database_path",
            Value::new(":memory:".to_string()),
        )]))
        .unwrap();
    let connection = instance.read("connection").unwrap();
    assert_eq!(connection.expect_ref::<String>().unwrap(), "open(:memory:)");
}

#[test]
fn test_union_mount_of_complementary_namespaces() {
    let first = ScopeDecl::builder("First")
        .resource("a", params([]), |_| Ok(Value::new("a".to_string())))
        .build();
    let second = ScopeDecl::builder("Second")
        .resource("b", params([]), |_| Ok(Value::new("b".to_string())))
        .build();

    let root = evaluate([first, second]).unwrap();
    assert_eq!(root.get("a").unwrap().expect_ref::<String>().unwrap(), "a");
    assert_eq!(root.get("b").unwrap().expect_ref::<String>().unwrap(), "b");
    assert_eq!(root.published_names(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_extern_satisfied_by_sibling_declaration() {
    let provider = ScopeDecl::builder("Provider")
        .resource("base_value", params([]), |_| {
            Ok(Value::new("base".to_string()))
        })
        .build();
    let consumer = ScopeDecl::builder("Consumer")
        .extern_param("base_value")
        .resource("derived", params(["base_value"]), |injected| {
            let base: &String = injected.get("base_value")?;
            Ok(Value::new(format!("{}_derived", base)))
        })
        .build();

    let root = evaluate([provider, consumer]).unwrap();
    // 外部声明被兄弟声明的基础贡献满足, 根不再需要参数
    assert!(root.parameter_names().is_empty());
    assert_eq!(
        root.get("derived").unwrap().expect_ref::<String>().unwrap(),
        "base_derived"
    );
}

#[test]
fn test_local_binding_hidden_from_facade() {
    let decl = ScopeDecl::builder("App")
        .contribution(
            ContributionDecl::resource("secret", params([]), |_| {
                Ok(Value::new("hidden".to_string()))
            })
            .local(),
        )
        .resource("greeting", params(["secret"]), |injected| {
            let secret: &String = injected.get("secret")?;
            Ok(Value::new(format!("Hello, {}!", secret)))
        })
        .build();

    let root = evaluate([decl]).unwrap();
    // 局部贡献可以作为依赖注入
    assert_eq!(
        root.get("greeting").unwrap().expect_ref::<String>().unwrap(),
        "Hello, hidden!"
    );
    // 但外部读取被拒绝
    assert!(matches!(
        root.get("secret"),
        Err(MixinError::Resolve { .. })
    ));
    assert_eq!(root.published_names(), vec!["greeting".to_string()]);
}

#[test]
fn test_module_source_honors_modules_public_mode() {
    let module = || {
        ModuleSource::new("settings")
            .item(ContributionDecl::resource("timeout", params([]), |_| {
                Ok(Value::new(30i64))
            }))
            .public_item(ContributionDecl::resource("app_name", params([]), |_| {
                Ok(Value::new("demo".to_string()))
            }))
    };

    // 公开模式: 未标注项默认发布
    let public_root = RootBuilder::new()
        .add_module(module())
        .modules_public(true)
        .build()
        .unwrap();
    let settings = public_root.scope("settings");
    assert!(settings.read("timeout").is_ok());

    // 仅显式声明才发布的模式
    let private_root = RootBuilder::new()
        .add_module(module())
        .modules_public(false)
        .build()
        .unwrap();
    let settings = private_root.scope("settings");
    assert!(settings.read("timeout").is_err());
    assert!(settings.read("app_name").is_ok());
}

#[test]
fn test_validation_before_eval_fails_fast() {
    let broken = ScopeDecl::builder("Broken")
        .resource("greeting", params(["nonexistent"]), |injected| {
            Ok(injected.value("nonexistent")?.clone())
        })
        .build();

    let result = evaluate_with(
        [broken],
        EvaluateOptions::default().with_validation(true),
    );
    assert!(matches!(
        result,
        Err(MixinError::ValidationFailed { count: 1, .. })
    ));
}

#[test]
fn test_symlink_transparency_through_facade() {
    let postgres = ScopeDecl::builder("Postgres")
        .resource("dsn", params([]), |_| {
            Ok(Value::new("postgres://localhost".to_string()))
        })
        .build();
    let app = ScopeDecl::builder("App")
        .child(postgres)
        .resource(
            "database",
            vec![mixin_abstractions::ParameterSpec::proxy("Postgres")],
            |injected| {
                let handle = injected.scope("Postgres")?;
                Ok(Value::new(handle))
            },
        )
        .build();

    let root = evaluate([app]).unwrap();
    let database = root.get("database").unwrap();
    let via_link = database
        .expect_ref::<mixin_abstractions::ScopeLink>()
        .unwrap()
        .read("dsn")
        .unwrap();
    let direct = root.scope("Postgres").read("dsn").unwrap();
    // 符号链接透明: 经链接读取与直接强制目标得到相同的值
    assert_eq!(
        via_link.expect_ref::<String>().unwrap(),
        direct.expect_ref::<String>().unwrap()
    );
}

#[test]
fn test_stats_reflect_forcing_and_cache_hits() {
    let root = evaluate([base_scope()]).unwrap();
    let before = root.stats();
    assert_eq!(before.scopes, 1);
    assert_eq!(before.bindings, 1);
    assert_eq!(before.forced, 0);

    let _ = root.get("max_connections").unwrap();
    let _ = root.get("max_connections").unwrap();
    let after = root.stats();
    assert_eq!(after.forced, 1);
    assert_eq!(after.cache_hits, 1);
    assert_eq!(after.active_instances, 0);
}

#[test]
fn test_json_payload_rides_as_opaque_value() {
    let decl = ScopeDecl::builder("App")
        .resource("manifest", params([]), |_| {
            Ok(Value::new(serde_json::json!({
                "name": "demo",
                "features": ["wal", "foreign_keys"],
            })))
        })
        .resource("feature_count", params(["manifest"]), |injected| {
            let manifest: &serde_json::Value = injected.get("manifest")?;
            let count = manifest["features"]
                .as_array()
                .map(|features| features.len())
                .unwrap_or(0);
            Ok(Value::new(count as i64))
        })
        .build();

    let root = evaluate([decl]).unwrap();
    assert_eq!(
        *root.get("feature_count").unwrap().expect_ref::<i64>().unwrap(),
        2
    );
}

#[test]
fn test_logging_config_directives_and_builder_init() {
    use crate::logging::LoggingConfig;

    // 开发配置调高组合与求值模块的级别
    let development = LoggingConfig::development();
    let directives = development.directives();
    assert!(directives.starts_with("debug"));
    assert!(directives.contains("mixin_runtime::composer=debug"));
    assert!(directives.contains("mixin_runtime::evaluator=trace"));
    assert!(directives.contains("mixin_runtime::resolver=trace"));

    // 生产配置不放大任何模块
    let production = LoggingConfig::production();
    assert_eq!(production.directives(), "info");
    assert!(production.json_format);

    assert_eq!(
        LoggingConfig::default()
            .with_level(tracing::Level::WARN)
            .directives(),
        "warn"
    );

    // 构建组合根时一并初始化日志订阅器
    let root = RootBuilder::new()
        .add_declaration(base_scope())
        .with_logging(development)
        .build()
        .unwrap();
    assert_eq!(
        *root.get("max_connections").unwrap().expect_ref::<i64>().unwrap(),
        10
    );
}

#[test]
fn test_lift_custom_declaration_source() {
    use mixin_abstractions::DeclarationSource;

    /// 类形声明来源: 一个容器对象给出贡献与嵌套子声明
    struct DatabaseModule;

    impl DeclarationSource for DatabaseModule {
        fn name(&self) -> &str {
            "Database"
        }

        fn contributions(&self) -> Vec<ContributionDecl> {
            vec![ContributionDecl::resource("dsn", params([]), |_| {
                Ok(Value::new("sqlite://app.db".to_string()))
            })]
        }

        fn children(&self) -> Vec<Arc<dyn DeclarationSource>> {
            Vec::new()
        }
    }

    let root = RootBuilder::new()
        .add_source(Arc::new(DatabaseModule))
        .build()
        .unwrap();
    assert_eq!(
        root.get("dsn").unwrap().expect_ref::<String>().unwrap(),
        "sqlite://app.db"
    );
}

#[test]
fn test_relative_navigation_between_siblings() {
    use mixin_common::RelativePath;

    let metrics = ScopeDecl::builder("metrics")
        .resource("endpoint", params([]), |_| {
            Ok(Value::new("/metrics".to_string()))
        })
        .build();
    let web = ScopeDecl::builder("web").build();
    let app = ScopeDecl::builder("App").child(metrics).child(web).build();

    let root = evaluate([app]).unwrap();
    let web_scope = root.scope("web");
    // 从 web 上溯一层再下钻到兄弟作用域 metrics
    let sibling = web_scope
        .navigate_relative(&RelativePath::new(1, ["metrics"]))
        .unwrap();
    assert_eq!(sibling.path().to_string(), "/metrics");
    assert_eq!(
        sibling.read("endpoint").unwrap().expect_ref::<String>().unwrap(),
        "/metrics"
    );
}

#[test]
fn test_evaluate_twice_yields_structurally_identical_roots() {
    let decls = || {
        vec![
            base_scope(),
            ScopeDecl::builder("HighLoad")
                .patch("max_connections", params([]), |prev, _| {
                    let previous: i64 = *prev.unwrap().expect_ref::<i64>()?;
                    Ok(Value::new(previous * 2))
                })
                .build(),
        ]
    };

    let left = evaluate(decls()).unwrap();
    let right = evaluate(decls()).unwrap();
    assert_eq!(left.published_names(), right.published_names());
    assert_eq!(left.parameter_names(), right.parameter_names());
    assert_eq!(
        *left.get("max_connections").unwrap().expect_ref::<i64>().unwrap(),
        *right.get("max_connections").unwrap().expect_ref::<i64>().unwrap(),
    );
}
