//! # 示例应用程序
//!
//! 演示如何使用混入注入框架组装应用依赖图: 联合挂载、补丁、
//! 外部参数与按请求的工厂作用域。

use clap::Parser;
use mixin_abstractions::{call_args, params, ContributionDecl, ScopeDecl};
use mixin_common::Value;
use mixin_composition::{ComposedRoot, LoggingConfig, RootBuilder};
use tracing::info;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "混入注入框架示例应用")]
struct Args {
    /// 数据库路径
    #[arg(long, default_value = ":memory:")]
    database_path: String,

    /// 是否启用高负载配置
    #[arg(long)]
    high_load: bool,

    /// 日志配置: info/warn/error, debug 打开组合与求值细节, json 用于生产聚合
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // 日志订阅器随组合根一起初始化（RootBuilder::with_logging）
    let root = build_root(&args)?;
    info!("示例应用启动完成");

    // 演示配置读取与补丁
    demonstrate_configuration(&root)?;

    // 演示按请求的工厂作用域
    demonstrate_request_scope(&root)?;

    // 演示运行统计
    let stats = root.stats();
    info!(
        "运行统计: 作用域 {} 个, 绑定 {} 个, 已强制求值 {} 次, 缓存命中 {} 次",
        stats.scopes, stats.bindings, stats.forced, stats.cache_hits
    );

    info!("示例应用结束");
    Ok(())
}

/// 组装应用依赖图
fn build_root(args: &Args) -> Result<ComposedRoot, Box<dyn std::error::Error + Send + Sync>> {
    // 基础配置作用域
    let base = ScopeDecl::builder("Base")
        .resource("max_connections", params([]), |_| Ok(Value::new(10i64)))
        .contribution(
            ContributionDecl::resource("banner", params(["max_connections"]), |injected| {
                let max: &i64 = injected.get("max_connections")?;
                Ok(Value::new(format!("连接池上限: {}", max)))
            })
            .eager(),
        )
        .build();

    // 数据库作用域: 连接参数来自词法链上的基础配置
    let database_path = args.database_path.clone();
    let sqlite = ScopeDecl::builder("Sqlite")
        .resource("connection", params(["max_connections"]), move |injected| {
            let max: &i64 = injected.get("max_connections")?;
            Ok(Value::new(format!(
                "sqlite[{}] (池上限 {})",
                database_path, max
            )))
        })
        .build();

    // 按请求的工厂作用域
    let request_scope = ScopeDecl::builder("RequestScope")
        .extern_param("request")
        .resource("user_id", params(["request"]), |injected| {
            let request: &String = injected.get("request")?;
            let id: i64 = request.rsplit('/').next().unwrap_or("0").parse()?;
            Ok(Value::new(id))
        })
        .build();

    let mut builder = RootBuilder::new()
        .add_declaration(base)
        .add_declaration(
            ScopeDecl::builder("App")
                .child(sqlite)
                .child(request_scope)
                .build(),
        )
        .enable_validation(true)
        .with_logging(logging_config(&args.log_level));

    // 高负载配置: 给连接池上限打补丁
    if args.high_load {
        builder = builder.add_declaration(
            ScopeDecl::builder("HighLoad")
                .patch("max_connections", params([]), |prev, _| {
                    let previous: i64 = *prev.unwrap().expect_ref::<i64>()?;
                    Ok(Value::new(previous * 4))
                })
                .build(),
        );
    }

    let root = builder.build()?;
    info!("应用依赖图组装完成");
    Ok(root)
}

/// 演示配置读取
fn demonstrate_configuration(root: &ComposedRoot) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let max_connections = root.get("max_connections")?;
    info!("连接池上限: {}", max_connections.expect_ref::<i64>()?);

    let connection = root.scope("Sqlite").read("connection")?;
    info!("数据库连接: {}", connection.expect_ref::<String>()?);
    Ok(())
}

/// 演示按请求的工厂作用域
fn demonstrate_request_scope(root: &ComposedRoot) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let factory = root.scope("RequestScope");

    for request in ["/users/42", "/users/7"] {
        let instance = factory.call(call_args([(
            "request",
            Value::new(request.to_string()),
        )]))?;
        let user_id = instance.read("user_id")?;
        info!(
            "请求 {} 解析到用户: {}",
            request,
            user_id.expect_ref::<i64>()?
        );
    }

    info!("活跃实例作用域: {} 个", root.active_instances());
    Ok(())
}

/// 按命令行参数选择日志配置
fn logging_config(level: &str) -> LoggingConfig {
    match level.to_lowercase().as_str() {
        "trace" | "debug" => LoggingConfig::development(),
        "json" => LoggingConfig::production(),
        "warn" => LoggingConfig::default().with_level(tracing::Level::WARN),
        "error" => LoggingConfig::default().with_level(tracing::Level::ERROR),
        _ => LoggingConfig::default(),
    }
}
