// API module
//
// HTTP surface over the ledger: index page, wallet keys, transaction
// submission, mining and balance queries

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
