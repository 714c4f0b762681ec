// lib.rs      neugif crate.
//
// Copyright (c) 2026  Douglas Lau
//
//! A library for encoding animated GIF images from full-color rasters.
//!
//! Each frame is reduced to its own 256-entry palette with NeuQuant
//! neural-network color quantization, compressed with LZW, and framed
//! into a GIF89a byte stream.
//!
//! ## Example: encode a 2-frame animation
//! ```
//! use neugif::Encoder;
//! use pix::{rgb::SRgb8, Raster};
//!
//! # fn main() -> Result<(), neugif::Error> {
//! let mut gif = Vec::new();
//! let mut enc = Encoder::new();
//! enc.set_delay_millis(200);
//! enc.set_loop_count(Some(0));
//! enc.start(&mut gif)?;
//! for frame in 0..2u8 {
//!     let mut raster = Raster::<SRgb8>::with_clear(8, 8);
//!     for (x, y) in [(2, 2), (5, 5)] {
//!         *raster.pixel_mut(x + i32::from(frame), y) =
//!             SRgb8::new(255, 208, 0);
//!     }
//!     enc.add_frame(&raster)?;
//! }
//! enc.finish()?;
//! drop(enc);
//! assert!(gif.starts_with(b"GIF89a"));
//! assert_eq!(gif.last(), Some(&0x3B));
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod block;
mod encode;
mod error;
mod lzw;
mod quant;

pub use crate::encode::Encoder;
pub use crate::error::{Error, Result};
pub use crate::quant::NeuQuant;
