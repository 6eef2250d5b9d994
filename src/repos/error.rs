use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    /// Unique-index violation; the payload is the conflicting column name.
    #[error("duplicate value for unique column {0}")]
    Duplicate(String),

    #[error("db error")]
    Db(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
