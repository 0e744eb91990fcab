pub mod models;

// Re-export models (domain models)
pub use models::hotel_listing::{HotelListing, NewHotelListing, DEFAULT_CHUNK_SIZE};
