use super::*;
use bytes::BufMut;

struct Pair(u8, u16);

impl MarshalSize for Pair {
    fn marshal_size(&self) -> usize {
        3
    }
}

impl Marshal for Pair {
    fn marshal_to(&self, mut buf: &mut [u8]) -> Result<usize> {
        buf.put_u8(self.0);
        buf.put_u16(self.1);
        Ok(3)
    }
}

impl Unmarshal for Pair {
    fn unmarshal<B>(buf: &mut B) -> Result<Self>
    where
        B: Buf,
    {
        if buf.remaining() < 3 {
            return Err(Error::UnexpectedEndOfBuffer {
                expected: 3,
                actual: buf.remaining(),
            });
        }
        Ok(Pair(buf.get_u8(), buf.get_u16()))
    }
}

struct Liar;

impl MarshalSize for Liar {
    fn marshal_size(&self) -> usize {
        4
    }
}

impl Marshal for Liar {
    fn marshal_to(&self, _buf: &mut [u8]) -> Result<usize> {
        Ok(2)
    }
}

#[test]
fn test_marshal_writes_big_endian() -> Result<()> {
    let raw = Pair(7, 0x0102).marshal()?;
    assert_eq!(&raw[..], &[7, 1, 2]);

    let frozen = Pair(7, 0x0102).marshal_frozen()?;
    assert_eq!(&frozen[..], &raw[..]);

    let mut buf = &raw[..];
    let p = Pair::unmarshal(&mut buf)?;
    assert_eq!(p.0, 7);
    assert_eq!(p.1, 0x0102);
    Ok(())
}

#[test]
fn test_marshal_size_mismatch_is_error() {
    assert!(Liar.marshal().is_err());
}

#[test]
fn test_unmarshal_short_buffer() {
    let mut buf: &[u8] = &[1, 2];
    assert_eq!(
        Pair::unmarshal(&mut buf).err(),
        Some(Error::UnexpectedEndOfBuffer {
            expected: 3,
            actual: 2
        })
    );
}
