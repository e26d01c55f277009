//! # mmodb Codec
//!
//! Versioned flat-file record codec for mmodb accounts.
//!
//! The account flat file has been written in several layouts over the years.
//! This crate reads all of them and always writes the current one:
//!
//! - A line holding only an integer declares the format version for the
//!   lines that follow
//! - The version plus the number of tab-separated columns selects a
//!   [`Layout`]; unknown combinations are rejected, never guessed
//! - The last column carries the account registry as `key,value ` groups
//! - The file ends with `<next id>\t%newid%`
//!
//! No I/O happens here beyond writing into a caller-supplied [`std::io::Write`].
//!
//! ## Usage
//!
//! ```
//! use mmodb_codec::{decode_account, encode_account, Account, CURRENT_VERSION};
//!
//! let mut account = Account::new("hero", "secret", 'M');
//! account.id = 2000000;
//! account.set_registry("zeny", "100");
//!
//! let line = encode_account(&account);
//! let decoded = decode_account(&line, CURRENT_VERSION).unwrap();
//! assert_eq!(account, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod account;
mod decoder;
mod encoder;
mod error;
mod layout;

pub use account::{
    bounded, Account, RegistryEntry, EMAIL_MAX, LASTLOGIN_MAX, LAST_IP_MAX, PASSWORD_MAX,
    REGISTRY_KEY_MAX, REGISTRY_MAX, REGISTRY_VALUE_MAX, USERID_MAX,
};
pub use decoder::{decode_account, decode_registry, Line, LineDecoder, COMMENT_PREFIX, NEXT_ID_MARKER};
pub use encoder::{encode_account, AccountEncoder};
pub use error::{CodecError, CodecResult};
pub use layout::{Layout, CURRENT_VERSION, LEGACY_VERSION};
