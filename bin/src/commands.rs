pub mod compare;
pub mod edit;
pub mod generate;
pub mod health;
pub mod init;
pub mod keys;
pub mod models;
pub mod new;
pub mod panels;
pub mod prefs;
pub mod setup;
pub mod tree;
