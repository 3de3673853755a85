//! # 示例应用程序
//!
//! 演示如何用 Bean 定义组装对象图并管理其生命周期

mod beans;
mod processors;

use anyhow::Context as _;
use beans::{AwareDemo, Car, InitializingDemo, Student};
use clap::Parser;
use ioc_context::{ApplicationContext, ContextBuilder, PropertyOverrideConfigurer};
use processors::{AgeProcessorOne, AgeProcessorTwo, LoggingPostProcessor};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn IoC 示例应用")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config/app.toml")]
    config: String,

    /// 属性覆盖，格式为 beanName.property=value，可重复
    #[arg(long = "override", value_name = "BEAN.PROPERTY=VALUE")]
    overrides: Vec<String>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 以 JSON 输出统计信息
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .init();

    info!("启动 Lorn IoC 示例应用");

    let context = build_context(&args)?;
    let logging = Arc::new(LoggingPostProcessor::default());
    context.add_bean_post_processor(Arc::clone(&logging) as _);

    context.refresh().context("刷新应用上下文失败")?;
    info!("已完成初始化的 Bean 数量: {}", logging.initialized());

    demonstrate_beans(&context)?;

    let stats = context.stats();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        info!(
            "上下文 {} 状态: {}, 单例数量: {}",
            stats.display_name, stats.status, stats.container.active_singletons
        );
    }

    context.close().context("关闭应用上下文失败")?;
    info!("应用已关闭");
    Ok(())
}

/// 构建应用上下文
fn build_context(args: &Args) -> anyhow::Result<ApplicationContext> {
    let mut builder = ContextBuilder::new().display_name("example-app");

    // 添加配置文件（如果存在）
    if Path::new(&args.config).exists() {
        builder = builder.add_config_toml(&args.config)?;
    } else {
        warn!("配置文件不存在, 使用默认配置: {}", args.config);
    }

    let context = builder.build()?;
    beans::register_types(&context);
    beans::register_definitions(&context)?;

    context.add_bean_factory_post_processor(Arc::new(AgeProcessorTwo));
    context.add_bean_factory_post_processor(Arc::new(AgeProcessorOne));
    if !args.overrides.is_empty() {
        let configurer = PropertyOverrideConfigurer::from_entries(args.overrides.iter().map(String::as_str))
            .map_err(|e| anyhow::anyhow!(e))?;
        context.add_bean_factory_post_processor(Arc::new(configurer));
    }
    Ok(context)
}

/// 演示已装配的 Bean
fn demonstrate_beans(context: &ApplicationContext) -> anyhow::Result<()> {
    info!("=== 属性注入 ===");
    let student = context.get_bean_typed::<Student>("student")?;
    info!("student: {}", student);
    let inline = context.get_bean_typed::<Student>("inlineStudent")?;
    info!("inlineStudent: {}", inline);

    let by_alias = context.get_bean("studentInfo")?;
    let by_name = context.get_bean("studentService")?;
    info!("别名与名称指向同一实例: {}", Arc::ptr_eq(&by_alias, &by_name));

    info!("=== 工厂方法 ===");
    for name in ["audi", "bmw", "tesla"] {
        let car = context.get_bean_typed::<Car>(name)?;
        info!("{}: brand={}, price={}", name, car.brand, car.price);
    }

    info!("=== 生命周期 ===");
    let demo = context.get_bean_typed::<InitializingDemo>("initializingDemo")?;
    info!("initializingDemo.name = {}", demo.name.lock());

    let aware = context.get_bean_typed::<AwareDemo>("awareDemo")?;
    let has_factory = aware
        .factory
        .lock()
        .as_ref()
        .is_some_and(|factory| factory.contains_bean("student"));
    info!(
        "awareDemo: bean_name={}, known_types={}, 工厂可用={}",
        aware.bean_name.lock(),
        aware.known_types.lock(),
        has_factory
    );
    Ok(())
}
