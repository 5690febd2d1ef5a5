//! # Daily Wisdom
//!
//! Fetches the chapter of Proverbs for the day and pairs it with an
//! AI-generated reflection: an interpretation, practical steps, a
//! reflection question and a historical note.
//!
//! Scripture text always comes from the most trustworthy source that can
//! supply it. Model output only fills in the text when no trusted source
//! could.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌─────────────┐   ┌───────────┐
//! │ Sources              │──▶│  Generator  │──▶│ Assembler │──▶ ChapterContent
//! │ bundled / API / file │   │  (Gemini)   │   │ defaults  │
//! └──────────┬───────────┘   └─────────────┘   └───────────┘
//!            │
//!       ┌────┴────┐
//!       │  cache  │
//!       └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wisdom sources                 # show configured sources
//! wisdom chapter 3               # print Proverbs 3 as JSON
//! wisdom chapter                 # today's chapter
//! wisdom serve                   # HTTP API for the UI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`sources`] | Source trait and priority resolver |
//! | [`source_bundled`] | Bundled dataset source |
//! | [`source_api`] | Remote verse API source |
//! | [`source_file`] | Cached whole-book file source |
//! | [`cache`] | Byte cache backends |
//! | [`model`] | Generative model abstraction |
//! | [`generator`] | Reflection prompts, schemas and validation |
//! | [`assembler`] | Record assembly with defaults |
//! | [`pipeline`] | End-to-end request flow |
//! | [`server`] | HTTP API |
//! | [`error`] | Classified errors |

pub mod assembler;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod source_api;
pub mod source_bundled;
pub mod source_file;
pub mod sources;
