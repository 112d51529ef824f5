pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod use_cases;
