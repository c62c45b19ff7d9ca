pub mod audit;
pub mod autosubmit;
pub mod brief;
pub mod chat;
pub mod relay;
pub mod submission;
pub mod upload;
