pub mod alert;
pub mod scheduler;
pub mod sync;

pub use alert::AlertJob;
pub use scheduler::JobScheduler;
pub use sync::SyncJob;
