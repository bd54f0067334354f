mod store_timeout;

pub use store_timeout::with_store_timeout;
