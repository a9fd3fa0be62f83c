#![deny(warnings)]

pub mod config;
pub mod emotion;
pub mod extract;
pub mod render;
pub mod service;
pub mod session;
