//! DeSo Circulation
//!
//! Reconciled breakdown of the DeSo native coin supply into staked,
//! classified unstaked and free-float portions, plus DESO-equivalent
//! sections for CCv1 locked value, project tokens and wrapped assets.
//!
//! This crate provides the core implementation for the
//! `deso-circulation` CLI tool.
//!
//! ## Pipeline
//!
//! One polling cycle ([`cycle::run_cycle`]):
//! 1. Read the Cached snapshot from the [`store`]
//! 2. Fetch a Live snapshot through the [`sources`] traits
//! 3. Merge Live, Cached and Static (roster) snapshots field by field
//! 4. Classify accounts, split stakes and build the circulation trees
//! 5. Promote the Live snapshot when it carries data
//!
//! Steps 3 and 4 live in [`reconcile::reconcile`], a pure function of its
//! inputs. [`poller::run_watch`] repeats cycles on an interval and polls
//! prices on a separate one.
//!
//! ## Getting Started
//!
//! ```bash
//! deso-circulation report --roster roster.toml --summary
//! deso-circulation watch --roster roster.toml --interval 300
//! deso-circulation validate --file circulation.json
//! ```

pub mod aggregator;
pub mod commands;
pub mod cycle;
pub mod model;
pub mod output;
pub mod poller;
pub mod reconcile;
pub mod roster;
pub mod sources;
pub mod store;
pub mod utils;
