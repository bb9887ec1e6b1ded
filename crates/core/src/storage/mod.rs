mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::{TableHandle, TableProvider};
pub use types::{Page, MAX_BATCH_WRITE_ITEMS};
