//! HTTP API handlers for crp-server

pub mod health;
pub mod items;
pub mod sharing;

pub use health::health_routes;
pub use items::{create_text_item, delete_item, update_text_item};
pub use sharing::{
    get_cluster_shared, get_item_recipients, get_regulation_sharing, set_item_visibility,
};
