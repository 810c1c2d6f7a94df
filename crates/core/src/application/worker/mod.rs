// Worker concurrency helpers shared by TrackerWorker and BackendAdapter.

pub mod constants;
pub mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
