pub mod design;
pub mod material;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_design;
pub mod product_material;
