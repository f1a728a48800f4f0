mod core;
mod repositories;
mod runs;
mod work_items;

pub use self::core::AdoClient;
pub(crate) use self::core::ensure_success;
