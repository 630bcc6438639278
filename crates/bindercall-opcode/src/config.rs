/// Default number of cached opcodes.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Controls opcode resolution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum number of memoized opcodes. Least recently used entries are
    /// evicted beyond this. Values below 1 are treated as 1.
    pub capacity: usize,
}

impl ResolverConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}
