pub mod cache;
pub mod clients;
pub mod db;
pub mod history;
pub mod jobs;
pub mod settings;
mod utils;

pub use cache::HistoryCache;
pub use db::Database;
pub use history::HistoryReader;
pub use jobs::{AlertJob, JobScheduler, SyncJob};
pub use settings::Settings;
