/// Tunables for [`crate::simplify`], threaded through rather than read from
/// free-standing constants.
#[derive(Debug, Clone, Copy)]
pub struct SimplifierConfig {
    /// Upper bound on the number of entries kept in the per-thread
    /// memoization cache before a prune runs.
    pub max_cache_entries: usize,
    /// Fraction of the cache dropped, oldest-first, on overflow.
    pub cache_prune_fraction: f64,
    /// Join descriptors (associativity/distribution) stop firing once the
    /// reentrant join-rewrite depth reaches this bound.
    pub join_depth_limit: u32,
    /// Default for `simplify`'s `pretty` argument when using
    /// [`SimplifierConfig::simplify_default`]-style convenience callers.
    pub pretty: bool,
    /// Default for `simplify`'s `unpack` argument.
    pub unpack: bool,
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        SimplifierConfig {
            max_cache_entries: 65_536,
            cache_prune_fraction: 0.35,
            join_depth_limit: 20,
            pretty: false,
            unpack: false,
        }
    }
}

impl SimplifierConfig {
    pub fn with_max_cache_entries(mut self, n: usize) -> Self {
        self.max_cache_entries = n;
        self
    }

    pub fn with_cache_prune_fraction(mut self, f: f64) -> Self {
        self.cache_prune_fraction = f;
        self
    }

    pub fn with_join_depth_limit(mut self, n: u32) -> Self {
        self.join_depth_limit = n;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_unpack(mut self, unpack: bool) -> Self {
        self.unpack = unpack;
        self
    }
}
