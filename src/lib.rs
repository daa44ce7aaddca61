pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::{config::Config, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expiry_days: config.jwt_expiry_days,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}
