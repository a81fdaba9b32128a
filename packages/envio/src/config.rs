//! Engine configuration.

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of idle traversal contexts kept for reuse.
    ///
    /// Calls running at the same time beyond this still get a context; it
    /// is simply dropped instead of pooled when the call ends. Zero disables
    /// pooling.
    pub pool_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { pool_capacity: 16 }
    }
}

impl EngineConfig {
    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(EngineConfig::default().pool_capacity, 16);
        assert_eq!(
            EngineConfig::default().with_pool_capacity(2),
            EngineConfig { pool_capacity: 2 }
        );
    }
}
