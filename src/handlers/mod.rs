// src/handlers/mod.rs

pub mod admin;
pub mod anime;
pub mod auth;
pub mod comments;
pub mod community;
pub mod profile;
