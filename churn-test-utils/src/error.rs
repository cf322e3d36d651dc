use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error(transparent)]
    RedisError(#[from] fred::error::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
