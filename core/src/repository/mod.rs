pub mod file;
pub mod rest;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

// Re-export
pub use file::FileStore;
pub use rest::SupabaseClient;
pub use session::{FileSessionStore, LocalAuth, StoredSession};
pub use traits::{select_as, select_one, AuthProvider, RowStore};
