// Delete operation trait and implementation
use crate::error::Result;
use opendal::Operator;

/// Trait for deleting objects from storage.
pub trait Deleter {
    /// Delete the object stored under `key`.
    ///
    /// Deleting a key that does not exist succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Implementation of Deleter for OpenDAL Operator.
pub struct OpenDalDeleter {
    operator: Operator,
}

impl OpenDalDeleter {
    /// Create a new deleter with the given OpenDAL operator.
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }
}

impl Deleter for OpenDalDeleter {
    async fn delete(&self, key: &str) -> Result<()> {
        match self.operator.delete(key).await {
            Ok(()) => Ok(()),
            // Some services report a missing key instead of treating delete as idempotent.
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
