pub mod book;
pub mod date;
