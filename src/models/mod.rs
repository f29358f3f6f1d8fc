pub mod audit;
pub mod category;
pub mod custom_field;
pub mod settings;
pub mod topic;
pub mod user;
