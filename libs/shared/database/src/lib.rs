pub mod supabase;

pub use supabase::{encode, SupabaseClient, SupabaseError, SupabaseResult};
