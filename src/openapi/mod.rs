use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth,
    entities::{design, material, order, order_item, product, product_design, product_material},
    errors::ErrorResponse,
    handlers,
    services::{availability, designs, materials, orders, products},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tally API",
        version = "1.0.0",
        description = r#"
# Tally

Inventory and order tracking for print-on-demand sellers.

- **Materials**: blank stock (shirts, hoodies, totes) counted in units and sold in packs
- **Orders**: customer jobs that consume materials until completed or cancelled
- **Products**: bills of materials plus artwork placements, with live buildability
- **Requirements**: per-material demand from open orders, with shortages

## Authentication

Register and log in under `/api/v1/auth`, then send the token on every request:

```
Authorization: Bearer <your-jwt-token>
```

Every resource is scoped to the authenticated account.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "Materials", description = "Material stock and requirements"),
        (name = "Orders", description = "Order management endpoints"),
        (name = "Products", description = "Product catalog and buildability"),
        (name = "Designs", description = "Design artwork metadata")
    ),
    paths(
        // Auth
        auth::register_handler,
        auth::login_handler,
        auth::me_handler,
        // Materials
        handlers::materials::list_materials,
        handlers::materials::create_material,
        handlers::materials::adjust_material_quantity,
        handlers::materials::material_requirements,
        // Orders
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::create_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        // Products
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::create_order_from_product,
        // Designs
        handlers::designs::list_designs,
        handlers::designs::create_design,
    ),
    components(
        schemas(
            ErrorResponse,
            auth::RegisterRequest,
            auth::LoginCredentials,
            auth::TokenResponse,
            auth::UserProfile,
            material::Model,
            order::Model,
            order::OrderStatus,
            order_item::Model,
            product::Model,
            product_material::Model,
            product_design::Model,
            design::Model,
            availability::MaterialStatus,
            availability::MaterialRequirement,
            availability::Buildability,
            materials::CreateMaterialRequest,
            materials::AdjustQuantityRequest,
            materials::MaterialRequirementView,
            materials::OpenOrderDemand,
            orders::CreateOrderRequest,
            orders::OrderItemInput,
            orders::UpdateOrderRequest,
            orders::OrderView,
            orders::OrderItemView,
            handlers::orders::DeletedOrder,
            products::CreateProductRequest,
            products::ProductMaterialInput,
            products::ProductDesignInput,
            products::UpdateProductRequest,
            products::CreateOrderFromProductRequest,
            products::ProductView,
            products::ProductMaterialView,
            products::ProductDesignView,
            designs::CreateDesignRequest,
            designs::DesignView,
            designs::LinkedProduct,
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(Http::builder().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
