pub mod init;
pub mod pull;
pub mod serve;
pub mod status;
