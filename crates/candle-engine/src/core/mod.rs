pub mod time;
pub mod timeline;
