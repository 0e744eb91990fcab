pub mod hotel_listing;

pub use hotel_listing::*;
