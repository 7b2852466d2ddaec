/*!
 * Unit-of-work helper
 *
 * Every submission runs its validation reads, stock mutations and ledger
 * writes through [`with_transaction`]: commit on `Ok`, rollback on `Err`.
 */

pub use futures::future::BoxFuture;
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};
use std::time::Instant;
use tracing::{debug, warn};

/// Execute a function within a database transaction
///
/// The closure's own error type is returned unchanged on rollback, so typed
/// failures such as a rejected submission reach the caller intact.
///
/// # Example
///
/// ```rust,ignore
/// use asset_ledger::db::with_transaction;
///
/// let record = with_transaction(&db, "record_movement", move |txn| {
///     Box::pin(async move {
///         let validated = validate_movement(txn, &request).await?;
///         apply_movement(txn, &validated, actor_id).await
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T, E>(
    db: &DatabaseConnection,
    operation: &'static str,
    f: F,
) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, E>> + Send,
    T: Send,
    E: std::error::Error + From<DbErr> + Send,
{
    let start = Instant::now();
    debug!(operation, "Starting database transaction");
    counter!("asset_ledger_db.transaction.started", 1, "operation" => operation);

    let result = db.transaction::<F, T, E>(f).await;

    let elapsed = start.elapsed();
    histogram!("asset_ledger_db.transaction.duration", elapsed, "operation" => operation);

    match &result {
        Ok(_) => {
            counter!("asset_ledger_db.transaction.committed", 1, "operation" => operation);
            debug!(operation, "Transaction committed in {:?}", elapsed);
        }
        Err(e) => {
            counter!("asset_ledger_db.transaction.rolled_back", 1, "operation" => operation);
            warn!(operation, error = %e, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result.map_err(|e| match e {
        TransactionError::Connection(db_err) => E::from(db_err),
        TransactionError::Transaction(err) => err,
    })
}
