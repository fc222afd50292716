//! # gps-strip
//!
//! Remove GPS location metadata from JPEG photos before sharing them. Only the
//! Exif APP1 segment is rewritten; the compressed image data and every other
//! segment are copied byte for byte.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gps_strip::pipeline::{StripOptions, strip_gps_from_file};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let options = StripOptions::default();
//!     let report = strip_gps_from_file(
//!         Path::new("photo.jpg"),
//!         Path::new("photo-clean.jpg"),
//!         &options,
//!     )?;
//!     if report.had_gps {
//!         println!("GPS removed");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Whole folders go through [`pipeline::strip_gps_from_folder`], which
//! processes files concurrently and reports every file separately:
//!
//! ```rust,no_run
//! use gps_strip::config::Config;
//! use gps_strip::pipeline::{StripOptions, strip_gps_from_folder};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let options = StripOptions::from_config(&config);
//!
//!     for outcome in strip_gps_from_folder(Path::new("./photos"), None, &options).await? {
//!         match outcome.result {
//!             Ok(report) => println!("{}: had_gps={}", outcome.file_name, report.had_gps),
//!             Err(e) => eprintln!("{}: {e}", outcome.file_name),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The codec works on byte slices and never touches the filesystem:
//!
//! ```rust,no_run
//! use gps_strip::exif::{decode, encode, jpeg, strip_gps};
//!
//! # fn run(file: &[u8]) -> gps_strip::error::Result<()> {
//! let layout = jpeg::scan(file)?;
//! if let Some(segment) = layout.exif_segment() {
//!     let (doc, had_gps) = strip_gps(decode(jpeg::exif_tiff(file, segment))?);
//!     let cleaned = jpeg::splice_exif(file, &layout, &encode(&doc)?)?;
//!     println!("had_gps={had_gps}, {} bytes", cleaned.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`exif`]: JPEG segment scanner and TIFF/IFD codec
//! - [`pipeline`]: file and folder entry points, atomic writes
//! - [`config`]: configuration types and loading/saving
//! - [`error`]: the [`StripError`] kinds

pub mod config;
pub mod error;
pub mod exif;
pub mod pipeline;

pub use error::StripError;
