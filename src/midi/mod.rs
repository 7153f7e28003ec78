pub mod controller;
pub mod handler;
pub mod message;
