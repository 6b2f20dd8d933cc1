pub mod admin;
pub mod article;
pub mod auth;
pub mod borne;
pub mod contact;
pub mod partner;
pub mod stats;
