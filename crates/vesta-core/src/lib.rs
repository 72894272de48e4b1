pub mod error;
pub mod consts;
pub mod frame;
pub mod stack;
pub mod analysis;
pub mod correct;
pub mod validate;
pub mod quality;
pub mod storage;
pub mod metadata;
pub mod io;
pub mod job;
