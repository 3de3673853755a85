//! 实例构建
//!
//! 解析顺序：实例工厂 Bean 的工厂方法 → 目标类型上的静态工厂方法 → 构造器。
//! 参数在调用之前解析，构造参数指向仍在创建中的单例时无法打破循环，直接报告循环依赖。

use crate::factory::{wrap_unless_circular, DefaultBeanFactory};
use crate::populator::{DependencyPopulator, PendingArgument};
use di_abstractions::{BeanClass, BeanDefinition, BeanRef, Executable, Value};
use ioc_common::{BeanError, BeanResult};
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

/// 实例的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FactoryDescriptor {
    Constructor { class: String },
    StaticFactory { class: String, method: String },
    InstanceFactory { factory_bean: String, method: String },
}

impl fmt::Display for FactoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor { class } => write!(f, "{class} 构造器"),
            Self::StaticFactory { class, method } => write!(f, "静态工厂方法 {class}.{method}"),
            Self::InstanceFactory { factory_bean, method } => {
                write!(f, "工厂 Bean '{factory_bean}' 的方法 {method}")
            }
        }
    }
}

/// 未填充属性的原始实例
pub(crate) struct BuiltInstance {
    pub(crate) bean: BeanRef,
    /// 实例具体类型的描述符，工厂产物的类型未注册时为空
    pub(crate) class: Option<Arc<BeanClass>>,
    pub(crate) descriptor: FactoryDescriptor,
}

pub(crate) struct InstanceBuilder<'a> {
    factory: &'a DefaultBeanFactory,
    populator: DependencyPopulator<'a>,
}

impl<'a> InstanceBuilder<'a> {
    pub(crate) fn new(factory: &'a DefaultBeanFactory) -> Self {
        Self {
            factory,
            populator: DependencyPopulator::new(factory),
        }
    }

    pub(crate) fn build(&self, bean_name: &str, definition: &BeanDefinition) -> BeanResult<BuiltInstance> {
        if let Some(factory_bean) = &definition.factory_bean_name {
            let method = definition.factory_method_name.as_deref().ok_or_else(|| {
                BeanError::creation_msg(bean_name, format!("工厂 Bean '{factory_bean}' 没有指定工厂方法"))
            })?;
            return self.build_from_factory_bean(bean_name, factory_bean, method, definition);
        }

        let class_name = definition
            .bean_class
            .as_deref()
            .ok_or_else(|| BeanError::creation_msg(bean_name, "定义没有指定类型"))?;
        let class = self.factory.type_registry().get(class_name).ok_or_else(|| {
            BeanError::creation_msg(bean_name, format!("类型 '{class_name}' 未在类型注册表中注册"))
        })?;

        match &definition.factory_method_name {
            Some(method) => {
                let candidates = class.static_factories(method);
                if candidates.is_empty() {
                    return Err(BeanError::creation_msg(
                        bean_name,
                        format!("类型 '{class_name}' 没有静态工厂方法 '{method}'"),
                    ));
                }
                let arguments = self.resolve_arguments(bean_name, definition)?;
                let (executable, values) = self.select(bean_name, candidates, &arguments)?;
                let bean = (executable.invoke)(values).map_err(|e| {
                    BeanError::creation(bean_name, format!("静态工厂方法 '{class_name}.{method}' 执行失败"), e)
                })?;
                Ok(BuiltInstance {
                    class: self.factory.type_registry().for_bean(&bean),
                    bean,
                    descriptor: FactoryDescriptor::StaticFactory {
                        class: class_name.to_string(),
                        method: method.clone(),
                    },
                })
            }
            None => {
                if class.constructors().is_empty() {
                    return Err(BeanError::creation_msg(
                        bean_name,
                        format!("类型 '{class_name}' 没有声明构造器"),
                    ));
                }
                let arguments = self.resolve_arguments(bean_name, definition)?;
                let (executable, values) = self.select(bean_name, class.constructors(), &arguments)?;
                let bean = (executable.invoke)(values)
                    .map_err(|e| BeanError::creation(bean_name, format!("类型 '{class_name}' 的构造器执行失败"), e))?;
                Ok(BuiltInstance {
                    bean,
                    descriptor: FactoryDescriptor::Constructor {
                        class: class_name.to_string(),
                    },
                    class: Some(class),
                })
            }
        }
    }

    fn build_from_factory_bean(
        &self,
        bean_name: &str,
        factory_bean: &str,
        method: &str,
        definition: &BeanDefinition,
    ) -> BeanResult<BuiltInstance> {
        if self.factory.canonical_name(factory_bean) == bean_name {
            return Err(BeanError::creation_msg(bean_name, "工厂 Bean 不能是自身"));
        }
        let factory = self.factory.resolve_reference(bean_name, factory_bean).map_err(|e| {
            wrap_unless_circular(e, |e| {
                BeanError::creation(bean_name, format!("工厂 Bean '{factory_bean}' 获取失败"), e)
            })
        })?;
        let factory_class = self.factory.type_registry().for_bean(&factory).ok_or_else(|| {
            BeanError::creation_msg(bean_name, format!("工厂 Bean '{factory_bean}' 的类型未注册"))
        })?;
        let candidates = factory_class.instance_factories(method);
        if candidates.is_empty() {
            return Err(BeanError::creation_msg(
                bean_name,
                format!("类型 '{}' 没有工厂方法 '{method}'", factory_class.name()),
            ));
        }

        let arguments = self.resolve_arguments(bean_name, definition)?;
        let (executable, values) = self.select(bean_name, candidates, &arguments)?;
        let bean = (executable.invoke)(&factory, values).map_err(|e| {
            BeanError::creation(bean_name, format!("工厂 Bean '{factory_bean}' 的方法 '{method}' 执行失败"), e)
        })?;
        Ok(BuiltInstance {
            class: self.factory.type_registry().for_bean(&bean),
            bean,
            descriptor: FactoryDescriptor::InstanceFactory {
                factory_bean: factory_bean.to_string(),
                method: method.to_string(),
            },
        })
    }

    fn resolve_arguments(&self, bean_name: &str, definition: &BeanDefinition) -> BeanResult<Vec<PendingArgument>> {
        definition
            .constructor_args
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                self.populator.resolve_argument(bean_name, spec).map_err(|e| {
                    wrap_unless_circular(e, |e| {
                        BeanError::creation(bean_name, format!("构造参数 #{index} 解析失败"), e)
                    })
                })
            })
            .collect()
    }

    /// 选择参数个数一致、且全部参数都能满足的候选
    ///
    /// 多个候选都满足时优先声明了更多具体类型参数的那个，其余按声明顺序。
    fn select<'e, F>(
        &self,
        bean_name: &str,
        candidates: &'e [Executable<F>],
        arguments: &[PendingArgument],
    ) -> BeanResult<(&'e Executable<F>, Vec<Value>)> {
        let mut matching: Vec<&Executable<F>> = candidates
            .iter()
            .filter(|candidate| candidate.params.len() == arguments.len())
            .collect();
        if matching.is_empty() {
            return Err(BeanError::creation_msg(
                bean_name,
                format!("没有参数个数为 {} 的构造器或工厂方法", arguments.len()),
            ));
        }
        matching.sort_by_key(|candidate| Reverse(candidate.typed_param_count()));

        let mut last_error = None;
        for candidate in matching {
            let bound: BeanResult<Vec<Value>> = candidate
                .params
                .iter()
                .zip(arguments)
                .map(|(kind, argument)| self.populator.bind_argument(bean_name, argument, kind))
                .collect();
            match bound {
                Ok(values) => return Ok((candidate, values)),
                Err(e) => last_error = Some(e),
            }
        }
        Err(match last_error {
            Some(e) => BeanError::creation(bean_name, "没有参数类型匹配的构造器或工厂方法", e),
            None => BeanError::creation_msg(bean_name, "没有参数类型匹配的构造器或工厂方法"),
        })
    }
}
