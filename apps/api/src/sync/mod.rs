pub mod background;
pub mod engine;
pub mod handlers;
