pub mod boot;
pub mod dir;
pub mod fat;
