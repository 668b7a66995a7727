// src/utils/mod.rs

pub mod bulk;
pub mod comment_tree;
pub mod episode_template;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod render;
pub mod session;
pub mod spoiler;
