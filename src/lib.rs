#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub mod config;
pub mod error;
pub mod fetch;
pub mod materialize;
pub mod models;
pub mod page;
pub mod schema;
pub mod scraper;
pub mod storage;
pub mod util;
