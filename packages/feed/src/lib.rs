//! Review & like coordination for a book-review feed.
//!
//! The service layer between a UI and two external stores: a document
//! database holding review and like records, and a media store holding
//! review images. [`repository::ReviewRepository`] owns the review
//! lifecycle, [`ledger::LikeLedger`] owns like relationships, and
//! [`projection::FeedProjection`] composes both into view-ready records.

pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod projection;
pub mod repository;

pub use error::FeedError;
