//! 应用上下文
//!
//! 在 Bean 工厂之上增加启动与关闭编排：
//!
//! - `refresh`: 执行工厂后置处理器 → 冻结定义 → 预先实例化非延迟单例
//! - `close`: 按创建的逆序销毁单例，失败汇总后返回
//!
//! 上下文只能刷新一次，刷新失败后已创建的单例会被销毁，上下文进入关闭状态。

use crate::error::{ContextError, ContextResult};
use chrono::{DateTime, Utc};
use di_abstractions::{
    BeanClass, BeanDefinition, BeanDefinitionRegistryPostProcessor, BeanFactory, BeanFactoryPostProcessor,
    BeanPostProcessor, BeanRef, ContainerConfig, ContainerStats, FactoryPostProcessor,
};
use di_impl::{DefaultBeanFactory, FactoryPostProcessorPipeline};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 上下文运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextStatus {
    /// 已创建，尚未刷新
    Created,
    /// 刷新完成
    Active,
    /// 已关闭
    Closed,
}

impl fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "Created",
            Self::Active => "Active",
            Self::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// 上下文统计信息
#[derive(Debug, Clone, Serialize)]
pub struct ContextStats {
    pub id: Uuid,
    pub display_name: String,
    pub status: ContextStatus,
    /// 刷新开始时间
    pub startup_time: Option<DateTime<Utc>>,
    /// 刷新耗时（毫秒）
    pub refresh_duration_ms: Option<u64>,
    /// 关闭时间
    pub close_time: Option<DateTime<Utc>>,
    pub factory_post_processors: usize,
    pub container: ContainerStats,
}

#[derive(Debug, Default)]
struct Timeline {
    startup_time: Option<DateTime<Utc>>,
    refresh_duration_ms: Option<u64>,
    close_time: Option<DateTime<Utc>>,
}

/// 应用上下文
pub struct ApplicationContext {
    id: Uuid,
    display_name: String,
    factory: Arc<DefaultBeanFactory>,
    pipeline: Mutex<FactoryPostProcessorPipeline>,
    /// 串行化 refresh 与 close
    startup_shutdown: Mutex<()>,
    status: RwLock<ContextStatus>,
    timeline: RwLock<Timeline>,
}

impl ApplicationContext {
    /// 使用默认配置创建上下文
    pub fn new(display_name: impl Into<String>) -> Self {
        Self::with_config(display_name, ContainerConfig::default())
    }

    pub fn with_config(display_name: impl Into<String>, config: ContainerConfig) -> Self {
        Self::with_factory(display_name, DefaultBeanFactory::new(config))
    }

    /// 包装已有的 Bean 工厂
    pub fn with_factory(display_name: impl Into<String>, factory: Arc<DefaultBeanFactory>) -> Self {
        let id = Uuid::new_v4();
        let display_name = display_name.into();
        info!("创建应用上下文: {} ({})", display_name, id);
        Self {
            id,
            display_name,
            factory,
            pipeline: Mutex::new(FactoryPostProcessorPipeline::new()),
            startup_shutdown: Mutex::new(()),
            status: RwLock::new(ContextStatus::Created),
            timeline: RwLock::new(Timeline::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn status(&self) -> ContextStatus {
        *self.status.read()
    }

    pub fn is_active(&self) -> bool {
        self.status() == ContextStatus::Active
    }

    /// 底层 Bean 工厂
    pub fn bean_factory(&self) -> &Arc<DefaultBeanFactory> {
        &self.factory
    }

    // ---- 刷新前的注册 ----

    pub fn register_type(&self, class: BeanClass) -> &Self {
        self.factory.register_type(class);
        self
    }

    pub fn register_bean_definition(&self, bean_name: &str, definition: BeanDefinition) -> ContextResult<()> {
        Ok(self.factory.register_bean_definition(bean_name, definition)?)
    }

    pub fn register_alias(&self, bean_name: &str, alias: &str) -> ContextResult<()> {
        Ok(self.factory.register_alias(bean_name, alias)?)
    }

    pub fn register_singleton(&self, bean_name: &str, bean: BeanRef) -> ContextResult<()> {
        Ok(self.factory.register_singleton(bean_name, bean)?)
    }

    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.factory.add_bean_post_processor(processor);
    }

    /// 添加工厂后置处理器，刷新之后添加的处理器不会再执行
    pub fn add_bean_factory_post_processor(&self, processor: Arc<dyn BeanFactoryPostProcessor>) {
        self.add_factory_post_processor(FactoryPostProcessor::Factory(processor));
    }

    pub fn add_registry_post_processor(&self, processor: Arc<dyn BeanDefinitionRegistryPostProcessor>) {
        self.add_factory_post_processor(FactoryPostProcessor::Registry(processor));
    }

    fn add_factory_post_processor(&self, processor: FactoryPostProcessor) {
        if self.status() != ContextStatus::Created {
            warn!("上下文 '{}' 已刷新, 工厂后置处理器 '{}' 不会执行", self.display_name, processor.name());
        }
        self.pipeline.lock().add(processor);
    }

    // ---- 启动与关闭 ----

    /// 刷新上下文
    ///
    /// 第二次调用返回 [`ContextError::AlreadyRefreshed`]，已关闭的上下文返回 [`ContextError::Closed`]。
    /// 并发调用时只有一个会执行刷新，其余在刷新结束后按结束时的状态返回。
    pub fn refresh(&self) -> ContextResult<()> {
        let _startup = self.startup_shutdown.lock();
        {
            let status = self.status.read();
            match *status {
                ContextStatus::Created => {}
                ContextStatus::Active => {
                    return Err(ContextError::AlreadyRefreshed {
                        display_name: self.display_name.clone(),
                    })
                }
                ContextStatus::Closed => return Err(self.closed_error()),
            }
        }

        let started = Instant::now();
        self.timeline.write().startup_time = Some(Utc::now());
        info!("开始刷新上下文: {}", self.display_name);

        if let Err(e) = self.do_refresh() {
            error!("上下文 '{}' 刷新失败: {}", self.display_name, e);
            self.cancel_refresh();
            return Err(e);
        }

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.timeline.write().refresh_duration_ms = Some(elapsed);
        *self.status.write() = ContextStatus::Active;
        info!(
            "上下文 '{}' 刷新完成, 单例 {} 个, 耗时 {}ms",
            self.display_name,
            self.factory.singleton_names().len(),
            elapsed
        );
        Ok(())
    }

    fn do_refresh(&self) -> ContextResult<()> {
        {
            let pipeline = self.pipeline.lock();
            self.factory.with_registry_mut(|registry| pipeline.apply(registry))?;
        }
        self.factory.freeze_configuration();
        debug!("Bean 定义已冻结, 共 {} 个", self.factory.bean_definition_count());

        if self.factory.config().pre_instantiate_singletons {
            self.factory.pre_instantiate_singletons()?;
        }
        Ok(())
    }

    fn cancel_refresh(&self) {
        if let Err(errors) = self.factory.destroy_singletons() {
            warn!("刷新失败后清理单例时 {}", errors);
        }
        *self.status.write() = ContextStatus::Closed;
        self.timeline.write().close_time = Some(Utc::now());
    }

    /// 关闭上下文，重复关闭不做任何事
    pub fn close(&self) -> ContextResult<()> {
        let _shutdown = self.startup_shutdown.lock();
        {
            let mut status = self.status.write();
            if *status == ContextStatus::Closed {
                debug!("上下文 '{}' 已关闭", self.display_name);
                return Ok(());
            }
            *status = ContextStatus::Closed;
        }
        info!("关闭上下文: {}", self.display_name);
        self.timeline.write().close_time = Some(Utc::now());
        self.factory.destroy_singletons()?;
        info!("上下文 '{}' 已关闭", self.display_name);
        Ok(())
    }

    // ---- 获取 Bean ----

    fn check_active(&self) -> ContextResult<()> {
        match self.status() {
            ContextStatus::Active => Ok(()),
            ContextStatus::Created => Err(ContextError::NotActive {
                display_name: self.display_name.clone(),
            }),
            ContextStatus::Closed => Err(self.closed_error()),
        }
    }

    fn closed_error(&self) -> ContextError {
        ContextError::Closed {
            display_name: self.display_name.clone(),
        }
    }

    pub fn get_bean(&self, bean_name: &str) -> ContextResult<BeanRef> {
        self.check_active()?;
        Ok(self.factory.get_bean(bean_name)?)
    }

    pub fn get_bean_typed<T: Any + Send + Sync>(&self, bean_name: &str) -> ContextResult<Arc<T>> {
        self.check_active()?;
        Ok(self.factory.get_bean_typed::<T>(bean_name)?)
    }

    pub fn contains_bean(&self, bean_name: &str) -> bool {
        self.factory.contains_bean(bean_name)
    }

    pub fn bean_definition_names(&self) -> Vec<String> {
        self.factory.bean_definition_names()
    }

    pub fn stats(&self) -> ContextStats {
        let timeline = self.timeline.read();
        ContextStats {
            id: self.id,
            display_name: self.display_name.clone(),
            status: self.status(),
            startup_time: timeline.startup_time,
            refresh_duration_ms: timeline.refresh_duration_ms,
            close_time: timeline.close_time,
            factory_post_processors: self.pipeline.lock().len(),
            container: self.factory.stats(),
        }
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
