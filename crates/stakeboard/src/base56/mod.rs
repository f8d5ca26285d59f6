mod codec;
mod error;
mod token;

pub use codec::{ALPHABET, TOKEN_LEN};
use codec::{decode_base56, encode_base56};
pub use error::*;
pub use token::*;
