pub mod conversation;
pub mod media;
