//! diagrameval-report: rendering of scoring reports and overviews.
//!
//! Renders a single report as self-contained HTML, compares many reports in
//! a settings overview, and merges their comparison rows into one table.

pub mod combined;
pub mod html;
pub mod overview;

#[cfg(test)]
mod testutil;
