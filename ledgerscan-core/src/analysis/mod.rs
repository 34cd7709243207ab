pub mod bbox;
pub mod cluster;
