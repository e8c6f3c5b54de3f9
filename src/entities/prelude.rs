pub use super::client_cases::Entity as ClientCases;
pub use super::consultations::Entity as Consultations;
pub use super::favorites::Entity as Favorites;
pub use super::process_files::Entity as ProcessFiles;
pub use super::services::Entity as Services;
pub use super::users::Entity as Users;
