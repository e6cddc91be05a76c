//! SQLite persistence for installed shops.

mod model;
mod repository;

pub use model::ShopDB;
pub use repository::ShopRepository;
