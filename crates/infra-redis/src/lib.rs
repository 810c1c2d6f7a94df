// UWS Infrastructure - Redis Adapter
// Implements: JobQueue

mod job_queue;

pub use job_queue::RedisJobQueue;
