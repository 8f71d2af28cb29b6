//! An animated GIF89a encoder: truecolor RGBA frames in, a compliant GIF89a byte stream
//! out, via a from-scratch NeuQuant color quantizer and GIF-flavored LZW compressor.
//!
//! ```no_run
//! use gif89a_encoder::{Encoder, ByteSink};
//!
//! let mut out: Vec<u8> = Vec::new();
//! let mut enc = Encoder::new(64, 64);
//! enc.set_repeat(0);
//! enc.set_delay(100);
//!
//! let frame = vec![0u8; 4 * 64 * 64]; // opaque black RGBA frame
//! enc.add_frame(&frame, &mut out).unwrap();
//! enc.finish(&mut out).unwrap();
//! assert_eq!(&out[0..6], b"GIF89a");
//! ```

pub mod buffer;
pub mod encoder;
pub mod error;
pub mod lzw;
pub mod quant;
pub mod sink;

pub use buffer::ByteBuffer;
pub use encoder::Encoder;
pub use error::{EncodeError, Result};
pub use lzw::LzwEncoder;
pub use quant::NeuQuant;
pub use sink::{ByteSink, WriteSink};
