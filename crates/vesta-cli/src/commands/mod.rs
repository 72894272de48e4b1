pub mod config;
pub mod run;
pub mod score;
pub mod stack;
