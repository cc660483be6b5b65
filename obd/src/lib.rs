//! Expose obd's internal API for use in unit and integration testing. The
//! reusable converter lives in `obd-usfm`; this crate only adds the site
//! around it.
pub mod cli;
pub mod page;
pub mod postprocess;
pub mod render;
pub mod units;
