//! Core business logic module - framework-agnostic recipe operations.
//!
//! Functions here take a `SeaORM` connection and the acting user and return
//! plain models or representation structs; the HTTP layer only translates.

pub mod auth;
pub mod catalog;
pub mod follow;
pub mod membership;
pub mod pagination;
pub mod recipe;
pub mod representation;
pub mod shopping_list;
pub mod user;
