// Adapters layer: concrete implementations for external systems (backend, session storage).

pub mod session;
pub mod supabase;

pub use session::{LocalStorage, SessionStore};
pub use supabase::SupabaseClient;
