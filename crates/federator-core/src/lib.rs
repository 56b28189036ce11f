pub mod error;
pub mod instance;
pub mod merger;
pub mod search;
pub mod tags;
pub mod trace;
