pub mod database;
pub mod documents;
pub mod seed;
