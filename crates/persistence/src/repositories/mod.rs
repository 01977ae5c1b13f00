//! Repository implementations for database operations.

pub mod apartment;
pub mod bill;
pub mod membership;
pub mod payment;
pub mod user;

pub use apartment::PgApartmentRepository;
pub use bill::PgBillRepository;
pub use membership::PgMembershipRepository;
pub use payment::PgPaymentRepository;
pub use user::PgUserRepository;

use domain::ports::RepositoryError;

/// Maps sqlx errors onto repository error kinds.
pub(crate) fn map_db_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".into()),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => RepositoryError::Conflict(
                db_err.constraint().unwrap_or("unique constraint").to_string(),
            ),
            Some("23503") => RepositoryError::NotFound(
                db_err
                    .constraint()
                    .unwrap_or("referenced row")
                    .to_string(),
            ),
            _ => RepositoryError::Backend(db_err.to_string()),
        },
        other => RepositoryError::Backend(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            RepositoryError::NotFound(_)
        ));
    }

    #[test]
    fn test_pool_errors_map_to_backend() {
        assert!(matches!(
            map_db_error(sqlx::Error::PoolTimedOut),
            RepositoryError::Backend(_)
        ));
    }
}
