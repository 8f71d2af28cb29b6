//! A write-only destination for encoded bytes. The core never assumes anything about the
//! sink beyond that single `write(bytes)` operation, so it can target a `Vec<u8>`, a file,
//! or a socket without the encoder knowing which.

/// A write-only destination for encoded GIF bytes.
///
/// Implemented for `Vec<u8>` out of the box (append-only), and for anything that is already
/// `std::io::Write` via [`WriteSink`] for callers that want to stream straight to a file or
/// socket.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]) -> crate::error::Result<()>;
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> crate::error::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Adapts any `std::io::Write` into a [`ByteSink`].
pub struct WriteSink<W: std::io::Write>(pub W);

impl<W: std::io::Write> ByteSink for WriteSink<W> {
    fn write(&mut self, bytes: &[u8]) -> crate::error::Result<()> {
        self.0.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_appends() {
        let mut sink: Vec<u8> = Vec::new();
        sink.write(&[1, 2, 3]).unwrap();
        sink.write(&[4]).unwrap();
        assert_eq!(sink, vec![1, 2, 3, 4]);
    }

    #[test]
    fn write_sink_forwards_to_io_write() {
        let mut buf = Vec::new();
        {
            let mut sink = WriteSink(&mut buf);
            sink.write(&[5, 6]).unwrap();
        }
        assert_eq!(buf, vec![5, 6]);
    }
}
