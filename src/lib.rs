mod database {
    pub mod actions;
    pub mod diff;
    pub mod error;
    pub mod filter;
    pub mod form;
    pub mod pagination;
    pub mod schema;
    pub mod search;
    pub mod shopping_list;
    pub mod validation;
    pub mod views;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod routes {
    pub mod filters;
    pub mod recipes;
    pub mod references;
    pub mod rejection;
    pub mod users;
}
mod config;
mod constants;
mod shortlink;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use routes::*;
pub use shortlink::*;
