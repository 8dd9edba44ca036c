pub mod health;
pub mod skill;
pub mod webhooks;
