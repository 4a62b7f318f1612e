//! Request handlers, one module per resource.
//!
//! Every protected handler checks its capability first, before touching
//! the body or the database.

pub mod bills;
pub mod exchange;
pub mod health;
pub mod items;
pub mod notifications;
pub mod reports;
pub mod returns;
