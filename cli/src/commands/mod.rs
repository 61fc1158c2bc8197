pub mod config;
pub mod health;
pub mod iam;
pub mod policy;
pub mod seed;
pub mod serve;
