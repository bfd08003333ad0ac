//! `txstore` is a small embedded key/value storage engine. Keys and values
//! are arbitrary byte strings, kept in lexicographical order so callers can
//! build prefix- and range-scannable keyspaces on top of it.
//!
//! Entries are appended to a single log file and a [`storage::KeyDir`] keeps
//! an in-memory index from key to file position. Deletes write a tombstone
//! to the log; [`storage::log_cask::LogCask::compact`] rewrites the log to
//! drop replaced values and tombstones.
//!
//! ## Getting started
//!
//! ```rust
//! use txstore::error::Error;
//! use txstore::storage::engine::Engine;
//! use txstore::storage::log_cask::LogCask;
//!
//! fn run() -> Result<(), Error> {
//!     let storage_path = tempdir::TempDir::new("demo")?.path().join("txstoredb");
//!
//!     let mut engine = LogCask::new(storage_path)?;
//!     engine.set(b"a", vec![0x01])?;
//!     engine.set(b"b", vec![0x02])?;
//!     engine.delete(b"a")?;
//!
//!     assert_eq!(
//!         vec![(b"b".to_vec(), vec![0x02])],
//!         engine.scan(..).collect::<Result<Vec<_>, Error>>()?,
//!     );
//!
//!     engine.flush()?;
//!     Ok(())
//! }
//! # run().unwrap();
//! ```

pub mod error;
pub mod storage;
