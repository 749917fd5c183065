// ==========================================
// 报名分配引擎 - 按池串行化
// ==========================================
// 红线: 同一池的所有写操作串行执行 (读 → 校验 → 写)
// 说明: 不同池的锁互不影响; 临界区内不做外部 I/O
// 说明: 锁内无业务数据, 中毒后直接恢复 (状态以数据库为准)
// 说明: 注册表只持有弱引用, 无人持有的池锁在下次登记时清理
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// 池锁注册表
#[derive(Debug, Default)]
pub struct PoolLocks {
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl PoolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, pool_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(pool_id).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(pool_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// 在池锁内执行 f
    pub fn with_pool<T>(&self, pool_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(pool_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// 当前被持有或等待中的池锁数量
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 注册表中的条目数 (含尚未清理的失效条目)
    pub fn registered(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_pool_is_serialized() {
        let locks = Arc::new(PoolLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    locks.with_pool("FAIR-1", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
        assert!(locks.registered() <= 1);
    }

    #[test]
    fn test_distinct_pools_get_distinct_locks() {
        let locks = PoolLocks::new();
        // 在 A 的锁内可以再获取 B 的锁 (不同池互不阻塞)
        let value = locks.with_pool("A", || {
            locks.with_pool("B", || {
                assert_eq!(locks.len(), 2);
                42
            })
        });
        assert_eq!(value, 42);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_released_locks_are_pruned() {
        let locks = PoolLocks::new();
        for i in 0..1000 {
            locks.with_pool(&format!("unknown-{}", i), || ());
        }
        assert!(locks.is_empty());
        assert_eq!(locks.registered(), 1);

        // 持有中的锁不会被清理
        locks.with_pool("HELD", || {
            locks.with_pool("OTHER", || ());
            assert_eq!(locks.len(), 1);
            assert_eq!(locks.registered(), 2);
        });
    }
}
