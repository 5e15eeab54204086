pub mod fill;
pub mod init;
pub mod queries;
pub mod show;
pub mod status;
