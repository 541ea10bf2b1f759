pub mod accounts;
pub mod postgres;

pub use accounts::AccountStore;
pub use postgres::create_pool;
