//! Kernel module - server infrastructure and dependencies.

pub mod crawl_client;
pub mod deps;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use crawl_client::{normalize_location, RenderServiceCrawler, RenderServiceError};
pub use deps::{run_migrations, ServerDeps};
pub use scheduled_tasks::start_scheduler;
pub use test_dependencies::MockPageCrawler;
pub use traits::*;
