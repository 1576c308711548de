pub mod dispatch;
pub mod entity;
pub mod error;
pub mod query;
pub mod storage;
pub mod systems;
pub mod world;
