pub mod accounts;
pub mod articles;
pub mod autoschedule;
pub mod health;
pub mod jobs;
pub mod settings;
