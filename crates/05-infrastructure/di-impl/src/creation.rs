//! 按线程记录的创建路径
//!
//! 单例的循环检测由单例缓存的"创建中"集合完成，这里的路径用于：
//! 生成循环依赖的依赖链、检测原型作用域的循环、限制创建深度。

use ioc_common::{BeanError, BeanResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

#[derive(Debug)]
pub(crate) struct CreationTracker {
    paths: Mutex<HashMap<ThreadId, Vec<String>>>,
    max_depth: usize,
}

impl CreationTracker {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            paths: Mutex::new(HashMap::new()),
            max_depth,
        }
    }

    /// 进入一次创建，返回的守卫在离开作用域时出栈
    ///
    /// `detect_cycle` 为真时，名称已在当前线程的路径上即视为循环依赖。
    pub(crate) fn enter(&self, bean_name: &str, detect_cycle: bool) -> BeanResult<CreationGuard<'_>> {
        let thread = thread::current().id();
        let mut paths = self.paths.lock();
        let path = paths.entry(thread).or_default();
        if detect_cycle && path.iter().any(|name| name == bean_name) {
            return Err(BeanError::CircularDependency {
                bean_name: bean_name.to_string(),
                path: cycle_path(path, bean_name),
            });
        }
        if path.len() >= self.max_depth {
            return Err(BeanError::CreationDepthExceeded {
                bean_name: bean_name.to_string(),
                depth: path.len() + 1,
                max_depth: self.max_depth,
            });
        }
        path.push(bean_name.to_string());
        Ok(CreationGuard {
            tracker: self,
            thread,
        })
    }

    /// 以当前线程的路径构造循环依赖错误
    pub(crate) fn cycle_error(&self, bean_name: &str) -> BeanError {
        let thread = thread::current().id();
        let paths = self.paths.lock();
        let path = paths.get(&thread).map(Vec::as_slice).unwrap_or_default();
        BeanError::CircularDependency {
            bean_name: bean_name.to_string(),
            path: cycle_path(path, bean_name),
        }
    }

    /// 当前线程正在创建的 Bean
    pub(crate) fn current(&self) -> Option<String> {
        let thread = thread::current().id();
        self.paths.lock().get(&thread).and_then(|path| path.last().cloned())
    }

    fn exit(&self, thread: ThreadId) {
        let mut paths = self.paths.lock();
        if let Some(path) = paths.get_mut(&thread) {
            path.pop();
            if path.is_empty() {
                paths.remove(&thread);
            }
        }
    }
}

/// 从名称首次出现的位置截取路径，并以该名称结尾
fn cycle_path(path: &[String], bean_name: &str) -> Vec<String> {
    let start = path.iter().position(|name| name == bean_name).unwrap_or(0);
    let mut cycle = path[start..].to_vec();
    cycle.push(bean_name.to_string());
    cycle
}

pub(crate) struct CreationGuard<'a> {
    tracker: &'a CreationTracker,
    thread: ThreadId,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.exit(self.thread);
    }
}
