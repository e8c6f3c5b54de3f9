pub mod prelude;

pub mod client_cases;
pub mod consultations;
pub mod favorites;
pub mod process_files;
pub mod services;
pub mod users;
