//! Daily delivery of NASA's Astronomy Picture of the Day to a chat bot.
//!
//! The picture is read from the APOD API, or scraped from the APOD web page
//! when the API is unavailable, normalized into a [`types::Record`], and sent
//! through the Telegram or TamTam bot API.

pub mod acquisition;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod notifier;
pub mod runner;
pub mod senders;
pub mod sources;
pub mod status;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
