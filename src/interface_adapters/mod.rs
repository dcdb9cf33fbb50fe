pub mod adapter;
pub mod binding;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod protocol;
pub mod routes;
pub mod state;
