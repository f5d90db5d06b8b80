//! Backing store access: the backend traits and their Supabase/PostgREST implementation.

mod backend;
mod client;

pub use backend::{EditorBackend, Scope, StatsBackend};
pub use client::SupabaseClient;
