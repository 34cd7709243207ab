pub mod element;
pub mod page;
pub mod table;
