pub mod messages;
pub mod settings;
pub mod worker;
