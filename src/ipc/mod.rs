//! Hand-off between the capture-completion context and the foreground.

pub mod spsc;

pub use spsc::{Consumer, Producer, RxBuffer};
