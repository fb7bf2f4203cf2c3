pub mod core;
mod error;
pub mod stream;

pub use self::core::{decode, decode_bytes, encode};
pub use error::Z85Error;
