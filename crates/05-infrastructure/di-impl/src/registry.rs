//! Bean 定义注册表实现

use di_abstractions::{BeanDefinition, BeanDefinitionRegistry, ContainerConfig};
use ioc_common::{BeanError, BeanResult};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 默认定义注册表
///
/// 保存定义的注册顺序与别名表，并缓存合并父定义之后的只读副本。
/// 任何修改都会使合并缓存失效；冻结之后拒绝一切修改。
#[derive(Debug)]
pub struct DefaultDefinitionRegistry {
    definitions: HashMap<String, BeanDefinition>,
    names: Vec<String>,
    /// 别名 -> 目标名称（目标本身也可能是别名）
    aliases: BTreeMap<String, String>,
    merged: Mutex<HashMap<String, Arc<BeanDefinition>>>,
    allow_definition_overriding: bool,
    allow_alias_overriding: bool,
    frozen: bool,
}

impl DefaultDefinitionRegistry {
    pub fn new(config: &ContainerConfig) -> Self {
        Self {
            definitions: HashMap::new(),
            names: Vec::new(),
            aliases: BTreeMap::new(),
            merged: Mutex::new(HashMap::new()),
            allow_definition_overriding: config.allow_definition_overriding,
            allow_alias_overriding: config.allow_alias_overriding,
            frozen: false,
        }
    }

    /// 冻结注册表，之后的注册、删除、别名与修改都会失败
    pub fn freeze(&mut self) {
        if !self.frozen {
            info!("冻结 Bean 定义注册表, 共 {} 个定义", self.definitions.len());
            self.frozen = true;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    fn check_mutable(&self, bean_name: &str) -> BeanResult<()> {
        if self.frozen {
            return Err(BeanError::definition_store(bean_name, "注册表已冻结，不能再修改定义"));
        }
        Ok(())
    }

    fn invalidate_merged(&mut self) {
        self.merged.get_mut().clear();
    }

    /// 获取合并父定义后的只读定义
    pub fn merged_definition(&self, bean_name: &str) -> BeanResult<Arc<BeanDefinition>> {
        let canonical = self.canonical_name(bean_name);
        if let Some(merged) = self.merged.lock().get(&canonical) {
            return Ok(Arc::clone(merged));
        }
        let merged = Arc::new(self.merge(&canonical, &mut Vec::new())?);
        self.merged.lock().insert(canonical, Arc::clone(&merged));
        Ok(merged)
    }

    /// 合并一个不在注册表中的定义（内嵌 Bean）
    pub fn merge_detached(&self, bean_name: &str, definition: &BeanDefinition) -> BeanResult<BeanDefinition> {
        match &definition.parent_name {
            Some(parent) => {
                let parent = self.merged_definition(parent).map_err(|e| {
                    BeanError::creation(bean_name, format!("父定义 '{parent}' 解析失败"), e)
                })?;
                Ok(definition.merge_with_parent(&parent))
            }
            None => Ok(definition.clone()),
        }
    }

    fn merge(&self, bean_name: &str, visiting: &mut Vec<String>) -> BeanResult<BeanDefinition> {
        let definition = self
            .definitions
            .get(bean_name)
            .ok_or_else(|| BeanError::NoSuchBeanDefinition {
                bean_name: bean_name.to_string(),
            })?;
        let Some(parent_name) = &definition.parent_name else {
            return Ok(definition.clone());
        };
        visiting.push(bean_name.to_string());
        let parent_name = self.canonical_name(parent_name);
        if visiting.contains(&parent_name) {
            visiting.push(parent_name);
            return Err(BeanError::definition_store(
                bean_name,
                format!("父定义形成环: {}", visiting.join(" -> ")),
            ));
        }
        let parent = self.merge(&parent_name, visiting).map_err(|e| match e {
            BeanError::NoSuchBeanDefinition { .. } => {
                BeanError::definition_store(bean_name, format!("父定义 '{parent_name}' 不存在"))
            }
            other => other,
        })?;
        debug!("合并 Bean 定义 '{}' 与父定义 '{}'", bean_name, parent_name);
        Ok(definition.merge_with_parent(&parent))
    }

    /// `alias` 沿别名链是否会回到 `bean_name`
    fn alias_leads_back(&self, bean_name: &str, alias: &str) -> bool {
        let mut current = bean_name;
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(current) {
                Some(next) if next == alias => return true,
                Some(next) => current = next,
                None => return false,
            }
        }
        true
    }
}

impl BeanDefinitionRegistry for DefaultDefinitionRegistry {
    fn register_bean_definition(&mut self, bean_name: &str, definition: BeanDefinition) -> BeanResult<()> {
        self.check_mutable(bean_name)?;
        if bean_name.trim().is_empty() {
            return Err(BeanError::definition_store(bean_name, "Bean 名称不能为空"));
        }
        definition.validate(bean_name)?;

        let replaces = self.definitions.contains_key(bean_name);
        if replaces && !self.allow_definition_overriding {
            return Err(BeanError::DuplicateDefinition {
                bean_name: bean_name.to_string(),
            });
        }
        if self.aliases.contains_key(bean_name) && !self.allow_alias_overriding {
            return Err(BeanError::DuplicateDefinition {
                bean_name: bean_name.to_string(),
            });
        }

        // 别名注册失败时整个注册回滚
        let aliases_before = self.aliases.clone();
        if self.aliases.remove(bean_name).is_some() {
            warn!("Bean 名称 '{}' 原为别名, 移除该别名", bean_name);
        }
        let aliases = definition.aliases.clone();
        let previous = self.definitions.insert(bean_name.to_string(), definition);
        if !replaces {
            self.names.push(bean_name.to_string());
        }
        self.invalidate_merged();

        for alias in &aliases {
            if let Err(e) = self.register_alias(bean_name, alias) {
                warn!("Bean '{}' 的别名 '{}' 注册失败, 回滚定义", bean_name, alias);
                self.aliases = aliases_before;
                match previous {
                    Some(previous) => {
                        self.definitions.insert(bean_name.to_string(), previous);
                    }
                    None => {
                        self.definitions.remove(bean_name);
                        self.names.retain(|name| name != bean_name);
                    }
                }
                self.invalidate_merged();
                return Err(e);
            }
        }

        if replaces {
            info!("覆盖 Bean 定义: {}", bean_name);
        } else {
            debug!("注册 Bean 定义: {}", bean_name);
        }
        Ok(())
    }

    fn remove_bean_definition(&mut self, bean_name: &str) -> BeanResult<BeanDefinition> {
        self.check_mutable(bean_name)?;
        let canonical = self.canonical_name(bean_name);
        let definition = self
            .definitions
            .remove(&canonical)
            .ok_or_else(|| BeanError::NoSuchBeanDefinition {
                bean_name: bean_name.to_string(),
            })?;
        self.names.retain(|name| name != &canonical);
        for alias in self.aliases_of(&canonical) {
            self.aliases.remove(&alias);
        }
        self.invalidate_merged();
        info!("删除 Bean 定义: {}", canonical);
        Ok(definition)
    }

    fn bean_definition(&self, bean_name: &str) -> BeanResult<&BeanDefinition> {
        self.definitions
            .get(&self.canonical_name(bean_name))
            .ok_or_else(|| BeanError::NoSuchBeanDefinition {
                bean_name: bean_name.to_string(),
            })
    }

    fn bean_definition_mut(&mut self, bean_name: &str) -> BeanResult<&mut BeanDefinition> {
        self.check_mutable(bean_name)?;
        self.invalidate_merged();
        let canonical = self.canonical_name(bean_name);
        self.definitions
            .get_mut(&canonical)
            .ok_or_else(|| BeanError::NoSuchBeanDefinition {
                bean_name: bean_name.to_string(),
            })
    }

    fn contains_bean_definition(&self, bean_name: &str) -> bool {
        self.definitions.contains_key(&self.canonical_name(bean_name))
    }

    fn bean_definition_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn bean_definition_count(&self) -> usize {
        self.definitions.len()
    }

    fn register_alias(&mut self, bean_name: &str, alias: &str) -> BeanResult<()> {
        self.check_mutable(alias)?;
        let invalid = |reason: String| BeanError::InvalidAlias {
            alias: alias.to_string(),
            bean_name: bean_name.to_string(),
            reason,
        };

        if alias.trim().is_empty() {
            return Err(invalid("别名不能为空".to_string()));
        }
        if alias == bean_name {
            self.aliases.remove(alias);
            debug!("别名 '{}' 与名称相同, 忽略", alias);
            return Ok(());
        }
        if self.definitions.contains_key(alias) {
            return Err(invalid("别名与已注册的 Bean 名称冲突".to_string()));
        }
        match self.aliases.get(alias) {
            Some(existing) if existing == bean_name => return Ok(()),
            Some(existing) if !self.allow_alias_overriding => {
                return Err(invalid(format!("别名已指向 '{existing}'")));
            }
            Some(existing) => info!("别名 '{}' 由 '{}' 改为指向 '{}'", alias, existing, bean_name),
            None => {}
        }
        if self.alias_leads_back(bean_name, alias) {
            return Err(invalid("别名形成环".to_string()));
        }

        self.aliases.insert(alias.to_string(), bean_name.to_string());
        self.invalidate_merged();
        debug!("注册别名: {} -> {}", alias, bean_name);
        Ok(())
    }

    fn remove_alias(&mut self, alias: &str) -> BeanResult<()> {
        self.check_mutable(alias)?;
        match self.aliases.remove(alias) {
            Some(_) => {
                self.invalidate_merged();
                Ok(())
            }
            None => Err(BeanError::InvalidAlias {
                alias: alias.to_string(),
                bean_name: String::new(),
                reason: "别名未注册".to_string(),
            }),
        }
    }

    fn canonical_name(&self, name: &str) -> String {
        let mut current = name;
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current.to_string()
    }

    fn aliases_of(&self, bean_name: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut pending = vec![bean_name.to_string()];
        while let Some(target) = pending.pop() {
            for (alias, registered) in &self.aliases {
                if registered == &target && !result.contains(alias) {
                    result.push(alias.clone());
                    pending.push(alias.clone());
                }
            }
        }
        result
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }
}
