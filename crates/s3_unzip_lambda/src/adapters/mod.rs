pub mod delivery;
pub mod object_store;
