use crate::config::SimplifierConfig;
use deobf_expr::Expr;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::VecDeque;

/// A memoized simplification result. `is_final` mirrors
/// [`Expr::is_simplified_hint`]: once set, `deobf-passes`/`deobf-pipeline`
/// can skip re-simplifying this subtree entirely.
#[derive(Clone)]
struct CacheEntry {
    simplified: Expr,
    is_final: bool,
}

/// The simplifier's per-thread scratch state (§4.6): a bounded cache, the
/// join-rewrite reentrancy depth, and a stack of in-flight expressions used
/// to detect cyclic re-entry (a rule whose template ends up invoking
/// `simplify` on the very node currently being simplified).
pub(crate) struct SimplifierState {
    cache: FxHashMap<Expr, CacheEntry>,
    /// Insertion order, parallel to `cache`, so pruning can drop the oldest
    /// entries first without scanning for true LRU recency.
    order: VecDeque<Expr>,
    join_depth: u32,
    in_progress: Vec<u64>,
}

impl SimplifierState {
    fn new() -> Self {
        SimplifierState {
            cache: FxHashMap::default(),
            order: VecDeque::new(),
            join_depth: 0,
            in_progress: Vec::new(),
        }
    }

    fn get(&self, e: &Expr) -> Option<(Expr, bool)> {
        self.cache.get(e).map(|entry| (entry.simplified.clone(), entry.is_final))
    }

    fn insert(&mut self, config: &SimplifierConfig, key: Expr, simplified: Expr, is_final: bool) {
        if !self.cache.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.cache.insert(key, CacheEntry { simplified, is_final });
        if self.cache.len() > config.max_cache_entries {
            self.prune(config);
        }
    }

    fn prune(&mut self, config: &SimplifierConfig) {
        let drop_count = ((self.cache.len() as f64) * config.cache_prune_fraction).ceil() as usize;
        log::debug!("simplifier cache over {} entries, pruning {drop_count}", config.max_cache_entries);
        for _ in 0..drop_count {
            match self.order.pop_front() {
                Some(key) => {
                    self.cache.remove(&key);
                }
                None => break,
            }
        }
    }

    fn enter(&mut self, e: &Expr) -> bool {
        if self.in_progress.contains(&e.hash_value()) {
            return false;
        }
        self.in_progress.push(e.hash_value());
        true
    }

    fn exit(&mut self) {
        self.in_progress.pop();
    }

    fn clear(&mut self) {
        self.cache.clear();
        self.order.clear();
        self.join_depth = 0;
        self.in_progress.clear();
    }
}

thread_local! {
    static STATE: RefCell<SimplifierState> = RefCell::new(SimplifierState::new());
}

pub(crate) fn cache_get(e: &Expr) -> Option<(Expr, bool)> {
    STATE.with(|s| s.borrow().get(e))
}

pub(crate) fn cache_insert(config: &SimplifierConfig, key: Expr, simplified: Expr, is_final: bool) {
    STATE.with(|s| s.borrow_mut().insert(config, key, simplified, is_final));
}

/// Attempt to mark `e` as in-progress; returns `false` if it already is
/// (reentrant simplification of the same node), in which case the caller
/// should return `e` unchanged rather than recurse further.
pub(crate) fn enter(e: &Expr) -> bool {
    STATE.with(|s| s.borrow_mut().enter(e))
}

pub(crate) fn exit() {
    STATE.with(|s| s.borrow_mut().exit());
}

/// Current join-rewrite nesting depth.
pub(crate) fn join_depth() -> u32 {
    STATE.with(|s| s.borrow().join_depth)
}

pub(crate) fn join_enter() {
    STATE.with(|s| s.borrow_mut().join_depth += 1);
}

pub(crate) fn join_exit() {
    STATE.with(|s| s.borrow_mut().join_depth -= 1);
}

/// Drop all cached entries and reset the join-depth/reentrancy trackers for
/// the current thread. Callers that simplify unrelated routines in sequence
/// on a long-lived worker thread use this to bound memory growth.
pub fn purge_state() {
    STATE.with(|s| s.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_bitvec::BvInt;

    #[test]
    fn cache_round_trips() {
        purge_state();
        let config = SimplifierConfig::default();
        let e = Expr::constant(BvInt::new(42, 32));
        assert!(cache_get(&e).is_none());
        cache_insert(&config, e.clone(), e.clone(), true);
        let (hit, is_final) = cache_get(&e).unwrap();
        assert_eq!(hit, e);
        assert!(is_final);
    }

    #[test]
    fn reentrant_enter_is_rejected_until_exit() {
        purge_state();
        let e = Expr::constant(BvInt::new(7, 16));
        assert!(enter(&e));
        assert!(!enter(&e));
        exit();
        assert!(enter(&e));
        exit();
    }
}
