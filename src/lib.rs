pub mod app;
pub mod cache;
pub mod config;
pub mod database;
pub mod entities;
pub mod errors;
pub mod models;
pub mod providers;
pub mod repositories;
pub mod services;
pub mod utils;
pub mod web;
