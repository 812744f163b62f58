//! Infrastructure layer: storage, configuration and application services.

pub mod checkout;
pub mod config;
pub mod repository;
pub mod services;


pub use checkout::{CheckoutError, CheckoutSession, CheckoutStep};
pub use config::{AppConfig, ConfigError};
pub use repository::{InMemoryRepository, Repository, RepositoryError};
pub use services::{
    CatalogError, CatalogService, MessageService, MessagingError, OrderService, PlaceOrderRequest,
    ProfileError, ProfileService, StockLock,
};
