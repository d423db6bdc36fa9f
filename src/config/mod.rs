use thiserror::Error;

mod database;
mod server;
mod uploads;

pub use self::database::Database;
pub use self::server::{Environment, Server};
pub use self::uploads::Uploads;

#[derive(Debug, Error)]
#[error("failed to load configuration: {0}")]
pub struct ParseError(#[from] Box<figment::Error>);
