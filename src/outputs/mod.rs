//! Output generation for dashboard snapshots.
//!
//! # Submodules
//!
//! - [`json`]: Writes the [`DashboardSnapshot`](crate::render::DashboardSnapshot) as JSON for API consumption
//! - [`markdown`]: Converts the snapshot to a Markdown page for reading
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── dashboard.json       # Rewritten after every render
//!
//! markdown_output_dir/
//! └── dashboard.md         # Rewritten after every render
//! ```
//!
//! Files are written to a temporary name first and renamed into place, so a
//! reader never sees a half-written snapshot.

pub mod json;
pub mod markdown;
