//! Interest rate products.
//!
//! - [`SimpleSwap`]: fixed-for-floating swap with closed-form rate sensitivities
//! - [`SwapDirection`]: pay or receive fixed

mod simple_swap;

pub use simple_swap::{SimpleSwap, SwapDirection};
