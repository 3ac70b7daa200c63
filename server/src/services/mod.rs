pub mod auth;
pub mod board;
pub mod persistence;
pub mod room;
pub mod session;
