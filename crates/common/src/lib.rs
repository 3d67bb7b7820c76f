// subsync-common: value types shared by the subsync crates

pub mod display;
pub mod event;
pub mod path;
pub mod protocol;
pub mod types;
