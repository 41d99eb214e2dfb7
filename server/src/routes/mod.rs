pub mod api;
pub mod parcels;
