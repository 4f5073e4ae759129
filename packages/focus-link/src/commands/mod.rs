pub mod health;
pub mod play;
