use crate::value::Item;

/// Maximum number of put requests accepted by one batch write call.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// One page of results from a query or scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Item>,
    /// Key to resume from. `None` once the last page has been returned.
    pub last_evaluated_key: Option<Item>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.last_evaluated_key.is_none()
    }
}
