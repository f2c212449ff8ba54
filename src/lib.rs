// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Pluck files out of remote repositories.
//!
//! Users name what they want as path specs like `owner/repo/src/**/*.rs`.
//! Gitpluck turns a list of those into a plan with one entry per repository
//! ([`plan`]), then runs the plan against a fetch engine ([`exec`],
//! [`fetch`]).
//!
//! ```text
//! raw specs -> plan::resolve -> [ResolvedGroup] -> exec::execute -> Fetcher
//! ```

pub mod config;
pub mod exec;
pub mod fetch;
pub mod path;
pub mod plan;
pub mod store;

pub use exec::{execute, DownloadSettings, ListSettings, Mode};
pub use fetch::{Fetcher, Git2Fetcher, RepoTarget, Typo};
pub use plan::{resolve, ResolvedGroup, Selection};
pub use store::Store;
