pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod model;
pub mod routes;
pub mod services;
pub mod uploads;
pub mod util;

#[cfg(test)]
pub(crate) mod test_utils;

pub use self::app::App;
pub use self::routes::build_router;
