pub mod designs;
pub mod materials;
pub mod orders;
pub mod products;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        designs::DesignService, materials::MaterialService, orders::OrderService,
        products::ProductService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub materials: Arc<MaterialService>,
    pub orders: Arc<OrderService>,
    pub products: Arc<ProductService>,
    pub designs: Arc<DesignService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        Self {
            materials: Arc::new(MaterialService::new(
                db_pool.clone(),
                config.default_pack_size,
            )),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                config.enforce_status_transitions,
            )),
            products: Arc::new(ProductService::new(db_pool.clone())),
            designs: Arc::new(DesignService::new(db_pool)),
        }
    }
}
