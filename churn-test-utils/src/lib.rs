pub mod error;
pub mod redis;
pub mod script;

pub use error::TestError;
pub use redis::RedisTest;

pub mod prelude {
    pub use crate::{script, RedisTest, TestError};
}
