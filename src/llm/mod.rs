pub mod decision;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod types;
