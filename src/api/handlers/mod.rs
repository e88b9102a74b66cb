pub mod gateway;
pub mod github;
pub mod health;
pub mod services;
pub mod user;
