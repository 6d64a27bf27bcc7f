pub mod connectivity;
pub mod database;
