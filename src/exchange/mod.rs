pub mod client;

pub use client::{FuturesClient, LimitOrderRequest};
