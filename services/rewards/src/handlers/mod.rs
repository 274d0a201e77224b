pub mod ops;
pub mod webhook;
