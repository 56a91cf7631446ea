
#[macro_use]
extern crate derive_more;


pub mod api;
pub mod cameras;
pub mod config;
pub mod db;
mod error;
pub mod handlers;
pub mod logging;


pub use error::*;
