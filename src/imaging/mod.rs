//! Image processing: decode, normalize to a fixed frame, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Decode** | `image::ImageReader` (format sniffed) |
//! | **Letterbox** | cover-crop + Lanczos3 + blur, fitted foreground pasted centered |
//! | **Encode** | `webp` (lossy WebP) or `image` AVIF (rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a conversion
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Pixel-level transforms combining calculations with `image`

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{ConvertError, Dimensions, ImageBackend};
pub use operations::letterbox;
pub use params::{ConvertParams, Frame, OutputFormat, Quality};
pub use rust_backend::RustBackend;
