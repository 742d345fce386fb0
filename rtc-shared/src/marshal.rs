#[cfg(test)]
mod marshal_test;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, Result};

/// MarshalSize reports the number of bytes a value occupies on the wire.
pub trait MarshalSize {
    fn marshal_size(&self) -> usize;
}

/// Marshal writes a value into a caller-provided buffer.
pub trait Marshal: MarshalSize {
    /// marshal_to writes into `buf` and returns the number of bytes written.
    fn marshal_to(&self, buf: &mut [u8]) -> Result<usize>;

    fn marshal(&self) -> Result<BytesMut> {
        let l = self.marshal_size();
        let mut buf = BytesMut::with_capacity(l);
        buf.resize(l, 0);
        let n = self.marshal_to(&mut buf)?;
        if n != l {
            Err(Error::Other(format!(
                "marshal_to output size {n}, but expect {l}"
            )))
        } else {
            Ok(buf)
        }
    }

    fn marshal_frozen(&self) -> Result<Bytes> {
        Ok(self.marshal()?.freeze())
    }
}

/// Unmarshal parses a value out of any `bytes::Buf`.
pub trait Unmarshal: MarshalSize {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        Self: Sized,
        B: Buf;
}
