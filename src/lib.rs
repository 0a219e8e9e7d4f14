pub mod api_router;
pub mod auth;
pub mod config;
pub mod notify;
pub mod policy;
pub mod shared;
pub mod store;
pub mod tickets;
pub mod users;
