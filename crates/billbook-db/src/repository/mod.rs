//! # Repository Module
//!
//! Database repository implementations for Billbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler / workflow                                               │
//! │       │                                                                 │
//! │       │  db.bills().get_by_number("BILL-0001")                          │
//! │       ▼                                                                 │
//! │  BillRepository                                                        │
//! │  ├── get_by_id(&self, id)              own pooled connection           │
//! │  ├── fetch_by_id(&mut conn, id)        caller's transaction            │
//! │  ├── insert(&mut conn, &bill)          caller's transaction            │
//! │  └── list(&self, &filter)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Associated functions taking `&mut SqliteConnection` are the building
//! blocks of the transactional workflows in [`crate::workflow`].
//!
//! ## Available Repositories
//!
//! - [`item::ItemRepository`] - Catalog items
//! - [`bill::BillRepository`] - Bills, lines, bill-number sequence
//! - [`returns::ReturnRepository`] - Return requests and records
//! - [`user::UserRepository`] - User directory
//! - [`notification::NotificationRepository`] - In-app inbox

pub mod bill;
pub mod item;
pub mod notification;
pub mod returns;
pub mod user;
