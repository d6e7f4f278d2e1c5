pub mod license;
pub mod photo;
