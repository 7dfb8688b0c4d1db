//! # FiltDB — embeddable keyed storage with byte-level filtering
//!
//! FiltDB is a single-process storage engine: records addressed by a
//! 32-bit key live in a disk-backed B+Tree, and a predicate matcher
//! filters records by interpreting their raw bytes at declared offsets.
//!
//! ## Quick Start
//!
//! ```ignore
//! use filtdb::{Pager, Table};
//! use filtdb::matcher::{predicate_to_matcher, Expression, Predicate, ValueKind};
//!
//! let pager = Pager::open("./records.db")?;
//! let mut table = Table::open(pager, 10)?;
//!
//! table.insert(7, &record_bytes)?;
//!
//! let predicate = Predicate::expression(Expression::ge(
//!     Expression::load_at(0, ValueKind::U64Le),
//!     Expression::scalar_u64(50),
//! ));
//! let matcher = predicate_to_matcher(&predicate)?;
//!
//! let mut cursor = table.start()?;
//! while !cursor.end() {
//!     let (key, value) = cursor.value()?;
//!     if matcher.matches(value)? {
//!         println!("{key} matches");
//!     }
//!     cursor.next();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Statements (Insert / Select)        │
//! ├─────────────────────────────────────┤
//! │  Table + Cursor (B+Tree manager)     │      Predicate tree
//! ├─────────────────────────────────────┤           │ compile
//! │  Node views (leaf / branch)          │           ▼
//! ├─────────────────────────────────────┤        Matcher ── record bytes
//! │  Pager (page cache + file I/O)       │
//! └─────────────────────────────────────┘
//! ```
//!
//! The storage side and the matcher share only serialization conventions
//! (little-endian integers) and the fact that cursors hand record bytes
//! to matchers; they have no other coupling.
//!
//! ## Module Overview
//!
//! - [`storage`]: pager, page cache, on-page node layout
//! - [`btree`]: table, node views, cursor, statements
//! - [`matcher`]: predicate tree, width promotion, compiled matchers
//!
//! ## Concurrency
//!
//! A table is single-threaded: operations run to completion on the
//! calling thread, and a cursor holds a mutable borrow of its table, so
//! the borrow checker rules out scans racing inserts. Durability covers
//! completed inserts only; there is no crash recovery for an insert cut
//! short mid-split.

pub mod btree;
pub mod matcher;
pub mod storage;

pub use btree::{
    Cursor, InsertStatement, KeyType, Query, SelectStatement, Statement, Table, TreeError,
};
pub use matcher::{predicate_to_matcher, CompileError, MatchError, Matcher, Predicate};
pub use storage::{CorruptionError, PagePointer, Pager, PAGE_SIZE};
