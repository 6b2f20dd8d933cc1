pub mod password;
pub mod slug;
pub mod token;
