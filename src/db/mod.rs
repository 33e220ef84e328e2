pub mod in_memory;
pub mod postgres;
pub mod store;

pub use in_memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use store::{CatalogStore, RatingStore, ShelfStore, Stores, UserStore};
