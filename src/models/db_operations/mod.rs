pub mod collections_db_operations;
pub mod comments_db_operations;
pub mod notifications_db_operations;
pub mod posts_db_operations;
pub mod resources_db_operations;
pub mod subscribers_db_operations;
