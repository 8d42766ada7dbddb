pub mod profiles;
pub mod settings;
