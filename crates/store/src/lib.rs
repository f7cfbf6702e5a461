pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{Fault, FaultPoint, InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use records::{
    Account, CartLineItem, CartRecord, OrderLineItem, OrderRecord, Product, SaleRecord,
    Storefront,
};
pub use store::{
    AccountRepository, CartRepository, OrderRepository, ProductRepository, Store,
    StorefrontRepository, Transaction,
};
