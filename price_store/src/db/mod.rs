//! PostgreSQL plumbing: pool creation, health checks and caller-side retry.

pub mod health;
pub mod pool;
pub mod retry;

pub use health::{check_pool_health, pool_stats, PoolStats};
pub use pool::{create_pool, create_pool_from_env, DbPoolConfig};
pub use retry::{execute_with_retry, execute_with_retry_custom};
