pub mod candles;
pub mod stream;
pub mod tick_buffer;

pub use candles::{aggregate, last_closed, Candle};
pub use tick_buffer::{Tick, TickBuffer};
