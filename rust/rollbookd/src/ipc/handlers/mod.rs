pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod grid;
pub mod sessions;
pub mod settings;
pub mod students;
