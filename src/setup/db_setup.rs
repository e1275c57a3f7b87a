use redb::Database;
use thiserror::Error;

use crate::models::db_operations::collections_db_operations::{self, DbError};
use crate::models::db_operations::{posts_db_operations, resources_db_operations};

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Redb error: {0}")]
    Db(#[from] DbError),
    #[error("Redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which starter collections were written.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub posts: bool,
    pub faqs: bool,
}

pub fn setup_content_db(db: &Database) -> Result<(), SetupError> {
    println!("- Creating 'collections' table in Redb...");
    collections_db_operations::setup_content_db(db)?;
    Ok(())
}

/// Seeds posts only if the collection was never written, FAQs if the list is empty.
pub fn seed_content(db: &Database) -> Result<SeedReport, SetupError> {
    println!("- Seeding default blog posts...");
    let posts = posts_db_operations::seed_default_posts(db)?;
    println!("- Seeding default FAQs...");
    let faqs = resources_db_operations::seed_default_faqs(db)?;
    Ok(SeedReport { posts, faqs })
}
