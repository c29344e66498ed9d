/// Worker pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    threads: Option<usize>,
    thread_name: String,
}

impl PoolConfig {
    pub fn new(threads: Option<usize>) -> Self {
        Self {
            threads,
            thread_name: "chunkwise".to_string(),
        }
    }

    /// Prefix for worker thread names; workers are named `{prefix}-{id}`
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Requested thread count, falling back to the number of CPU cores
    pub fn resolved_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get)
    }

    pub fn name_prefix(&self) -> &str {
        &self.thread_name
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(None)
    }
}
