pub mod config;
pub mod controller;
pub mod helpers;
pub mod models;
pub mod providers;
pub mod repositories;
pub mod services;
