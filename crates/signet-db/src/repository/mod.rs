//! Repositories — free functions over `PgPool`, one module per table group.

pub mod own_keys;
