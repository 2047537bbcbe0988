//! Request handlers, one module per resource

pub mod cases;
pub mod finances;
pub mod invoices;
pub mod directory;
pub mod utils;
pub mod health;
