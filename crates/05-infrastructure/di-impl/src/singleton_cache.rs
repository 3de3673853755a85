//! 三级单例缓存
//!
//! 一个名称在创建过程中依次经历：不存在 → 创建中（可能登记了提前暴露的引用）→ 完全初始化。
//! 所有状态由同一把互斥锁保护，提升到完全初始化在一个临界区内完成，
//! 其他线程不会同时看到某个名称既在创建中又已完全初始化。
//!
//! 顶层单例的整个创建过程持有可重入的创建锁：同一线程的嵌套创建可以重入，
//! 其他线程请求正在创建的单例时会等待创建结束。

use crate::lifecycle::DisposableAdapter;
use di_abstractions::BeanRef;
use ioc_common::{BeanError, BeanResult, DestructionErrors};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// 产生提前暴露引用的一次性函数
pub(crate) type EarlyThunk = Box<dyn FnOnce() -> BeanResult<BeanRef> + Send>;

enum EarlyReference {
    /// 已登记，尚未被请求
    Pending(EarlyThunk),
    /// 正在执行
    Resolving,
    /// 已执行，后续请求直接返回
    Resolved(BeanRef),
}

#[derive(Default)]
struct SingletonState {
    singletons: HashMap<String, BeanRef>,
    early: HashMap<String, EarlyReference>,
    in_creation: HashSet<String>,
    registration_order: Vec<String>,
    /// Bean -> 依赖它的 Bean
    dependent_beans: HashMap<String, Vec<String>>,
    /// Bean -> 它依赖的 Bean
    dependencies: HashMap<String, Vec<String>>,
    disposables: Vec<(String, DisposableAdapter)>,
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}

/// 单例缓存
#[derive(Default)]
pub struct SingletonCache {
    creation_lock: ReentrantMutex<()>,
    state: Mutex<SingletonState>,
    early_resolved: AtomicUsize,
}

impl SingletonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找单例
    ///
    /// 先查完全初始化缓存；名称正在创建中且 `allow_early` 为真时，
    /// 取提前暴露的引用，登记的函数只会执行一次。
    pub fn get_singleton(&self, bean_name: &str, allow_early: bool) -> BeanResult<Option<BeanRef>> {
        {
            let state = self.state.lock();
            if let Some(bean) = state.singletons.get(bean_name) {
                return Ok(Some(bean.clone()));
            }
            if !allow_early || !state.in_creation.contains(bean_name) {
                return Ok(None);
            }
        }
        // 正在创建的单例只对持有创建锁的线程可见
        let _creation = self.creation_lock.lock();
        self.early_reference(bean_name)
    }

    fn early_reference(&self, bean_name: &str) -> BeanResult<Option<BeanRef>> {
        let thunk = {
            let mut state = self.state.lock();
            if let Some(bean) = state.singletons.get(bean_name) {
                return Ok(Some(bean.clone()));
            }
            let Some(slot) = state.early.get_mut(bean_name) else {
                return Ok(None);
            };
            match std::mem::replace(slot, EarlyReference::Resolving) {
                EarlyReference::Pending(thunk) => thunk,
                EarlyReference::Resolved(bean) => {
                    *slot = EarlyReference::Resolved(bean.clone());
                    return Ok(Some(bean));
                }
                EarlyReference::Resolving => return Ok(None),
            }
        };

        trace!("执行 Bean '{}' 的提前暴露函数", bean_name);
        let result = thunk();
        let mut state = self.state.lock();
        match result {
            Ok(bean) => {
                if let Some(slot) = state.early.get_mut(bean_name) {
                    *slot = EarlyReference::Resolved(bean.clone());
                }
                self.early_resolved.fetch_add(1, Ordering::Relaxed);
                debug!("Bean '{}' 的提前引用已被使用", bean_name);
                Ok(Some(bean))
            }
            Err(e) => {
                state.early.remove(bean_name);
                Err(e)
            }
        }
    }

    /// 获取单例，不存在时在创建锁内调用 `create` 创建
    ///
    /// 名称已在创建中（且没有可用的提前引用）时返回 `on_cycle` 产生的错误。
    pub(crate) fn get_or_create(
        &self,
        bean_name: &str,
        on_cycle: impl FnOnce() -> BeanError,
        create: impl FnOnce() -> BeanResult<BeanRef>,
    ) -> BeanResult<BeanRef> {
        let _creation = self.creation_lock.lock();
        {
            let mut state = self.state.lock();
            if let Some(bean) = state.singletons.get(bean_name) {
                return Ok(bean.clone());
            }
            if !state.in_creation.insert(bean_name.to_string()) {
                drop(state);
                return Err(on_cycle());
            }
        }
        trace!("单例 '{}' 进入创建中", bean_name);

        match create() {
            Ok(bean) => {
                self.promote(bean_name, bean.clone());
                Ok(bean)
            }
            Err(e) => {
                self.discard(bean_name);
                Err(e)
            }
        }
    }

    /// 登记提前暴露函数，只允许在名称创建中且尚未登记时调用
    pub(crate) fn register_early_thunk(&self, bean_name: &str, thunk: EarlyThunk) -> BeanResult<()> {
        let mut state = self.state.lock();
        if !state.in_creation.contains(bean_name) || state.singletons.contains_key(bean_name) {
            return Err(BeanError::creation_msg(bean_name, "只有创建中的单例才能提前暴露引用"));
        }
        if state.early.contains_key(bean_name) {
            return Err(BeanError::creation_msg(bean_name, "提前暴露引用已登记"));
        }
        state.early.insert(bean_name.to_string(), EarlyReference::Pending(thunk));
        trace!("登记 Bean '{}' 的提前暴露函数", bean_name);
        Ok(())
    }

    /// 已被其他 Bean 取走的提前引用
    pub(crate) fn resolved_early_reference(&self, bean_name: &str) -> Option<BeanRef> {
        match self.state.lock().early.get(bean_name) {
            Some(EarlyReference::Resolved(bean)) => Some(bean.clone()),
            _ => None,
        }
    }

    fn promote(&self, bean_name: &str, bean: BeanRef) {
        let mut state = self.state.lock();
        state.early.remove(bean_name);
        state.in_creation.remove(bean_name);
        state.singletons.insert(bean_name.to_string(), bean);
        push_unique(&mut state.registration_order, bean_name);
        debug!("单例 '{}' 进入完全初始化缓存", bean_name);
    }

    fn discard(&self, bean_name: &str) {
        let mut state = self.state.lock();
        state.early.remove(bean_name);
        state.in_creation.remove(bean_name);
        trace!("单例 '{}' 创建失败, 清理创建中状态", bean_name);
    }

    /// 直接注册已创建好的单例
    pub fn register_singleton(&self, bean_name: &str, bean: BeanRef) -> BeanResult<()> {
        let _creation = self.creation_lock.lock();
        let mut state = self.state.lock();
        if state.singletons.contains_key(bean_name) || state.in_creation.contains(bean_name) {
            return Err(BeanError::definition_store(bean_name, "单例已存在"));
        }
        state.singletons.insert(bean_name.to_string(), bean);
        push_unique(&mut state.registration_order, bean_name);
        debug!("注册单例实例: {}", bean_name);
        Ok(())
    }

    pub fn contains_singleton(&self, bean_name: &str) -> bool {
        self.state.lock().singletons.contains_key(bean_name)
    }

    pub fn is_in_creation(&self, bean_name: &str) -> bool {
        self.state.lock().in_creation.contains(bean_name)
    }

    /// 完全初始化的单例名称（按完成顺序）
    pub fn singleton_names(&self) -> Vec<String> {
        self.state.lock().registration_order.clone()
    }

    pub fn singleton_count(&self) -> usize {
        self.state.lock().singletons.len()
    }

    /// 提前引用被使用的次数
    pub fn early_references_resolved(&self) -> usize {
        self.early_resolved.load(Ordering::Relaxed)
    }

    /// 记录 `dependent` 依赖于 `bean_name`
    pub fn register_dependent(&self, bean_name: &str, dependent: &str) {
        let mut state = self.state.lock();
        push_unique(state.dependent_beans.entry(bean_name.to_string()).or_default(), dependent);
        push_unique(state.dependencies.entry(dependent.to_string()).or_default(), bean_name);
    }

    /// 直接依赖 `bean_name` 的 Bean
    pub fn dependents_of(&self, bean_name: &str) -> Vec<String> {
        self.state
            .lock()
            .dependent_beans
            .get(bean_name)
            .cloned()
            .unwrap_or_default()
    }

    /// `bean_name` 直接依赖的 Bean
    pub fn dependencies_of(&self, bean_name: &str) -> Vec<String> {
        self.state
            .lock()
            .dependencies
            .get(bean_name)
            .cloned()
            .unwrap_or_default()
    }

    /// `dependent` 是否直接或间接依赖于 `bean_name`
    pub fn is_dependent(&self, bean_name: &str, dependent: &str) -> bool {
        let state = self.state.lock();
        let mut seen = HashSet::new();
        let mut pending = vec![bean_name.to_string()];
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(dependents) = state.dependent_beans.get(&current) {
                if dependents.iter().any(|d| d == dependent) {
                    return true;
                }
                pending.extend(dependents.iter().cloned());
            }
        }
        false
    }

    pub(crate) fn register_disposable(&self, bean_name: &str, adapter: DisposableAdapter) {
        let mut state = self.state.lock();
        state.disposables.retain(|(name, _)| name != bean_name);
        state.disposables.push((bean_name.to_string(), adapter));
    }

    /// 按创建的逆序销毁全部单例，依赖某个 Bean 的 Bean 先于它销毁
    ///
    /// 每个 Bean 的销毁独立进行，失败汇总到返回值中。
    pub fn destroy_singletons(&self) -> DestructionErrors {
        let _creation = self.creation_lock.lock();
        let names: Vec<String> = {
            let state = self.state.lock();
            state.disposables.iter().rev().map(|(name, _)| name.clone()).collect()
        };
        debug!("开始销毁 {} 个可销毁单例", names.len());

        let mut errors = DestructionErrors::default();
        for name in names {
            self.destroy_singleton(&name, &mut errors);
        }

        let mut state = self.state.lock();
        state.singletons.clear();
        state.early.clear();
        state.registration_order.clear();
        state.dependent_beans.clear();
        state.dependencies.clear();
        state.disposables.clear();
        errors
    }

    fn destroy_singleton(&self, bean_name: &str, errors: &mut DestructionErrors) {
        let (adapter, dependents) = {
            let mut state = self.state.lock();
            state.singletons.remove(bean_name);
            state.early.remove(bean_name);
            state.registration_order.retain(|name| name != bean_name);
            let adapter = state
                .disposables
                .iter()
                .position(|(name, _)| name == bean_name)
                .map(|index| state.disposables.remove(index).1);
            let dependents = state.dependent_beans.remove(bean_name).unwrap_or_default();
            (adapter, dependents)
        };

        for dependent in dependents {
            trace!("销毁 '{}' 之前先销毁依赖它的 '{}'", bean_name, dependent);
            self.destroy_singleton(&dependent, errors);
        }
        if let Some(adapter) = adapter {
            adapter.destroy(errors);
        }

        let mut state = self.state.lock();
        state.dependencies.remove(bean_name);
        for dependents in state.dependent_beans.values_mut() {
            dependents.retain(|name| name != bean_name);
        }
    }
}
