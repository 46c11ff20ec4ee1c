pub mod worker_pool;
pub mod worker_pool_dispatcher;
