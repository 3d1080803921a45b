pub mod error;
pub mod hierarchy;
pub mod indices;
pub mod layout;
pub mod tech;
