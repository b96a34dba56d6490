use crate::XdrError;

/// Cursor over an XDR encoded buffer (RFC 4506).
pub struct XdrReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

pub trait Decode: Sized {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError>;
}

/// Decode a single value that must span the whole buffer.
pub fn from_bytes<T: Decode>(bytes: &[u8]) -> Result<T, XdrError> {
    let mut reader = XdrReader::new(bytes);
    let value = T::decode(&mut reader)?;
    reader.finish()?;
    Ok(value)
}

impl<'a> XdrReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], XdrError> {
        if self.remaining() < needed {
            return Err(XdrError::UnexpectedEof {
                offset: self.pos,
                needed,
            });
        }
        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], XdrError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn skip_padding(&mut self, len: usize) -> Result<(), XdrError> {
        let pad = (4 - len % 4) % 4;
        let offset = self.pos;
        if self.take(pad)?.iter().any(|b| *b != 0) {
            return Err(XdrError::NonZeroPadding { offset });
        }
        Ok(())
    }

    pub fn read_u32(&mut self) -> Result<u32, XdrError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, XdrError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, XdrError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, XdrError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, XdrError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(XdrError::InvalidBool { value }),
        }
    }

    /// Fixed-length opaque data, `opaque name[N]`.
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], XdrError> {
        let out = self.take_array::<N>()?;
        self.skip_padding(N)?;
        Ok(out)
    }

    fn read_length(&mut self, max: usize) -> Result<usize, XdrError> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(XdrError::LengthExceeded { len, max });
        }
        Ok(len)
    }

    /// Variable-length opaque data, `opaque name<max>`.
    pub fn read_opaque(&mut self, max: usize) -> Result<Vec<u8>, XdrError> {
        let len = self.read_length(max)?;
        let data = self.take(len)?.to_vec();
        self.skip_padding(len)?;
        Ok(data)
    }

    pub fn read_string(&mut self, max: usize) -> Result<String, XdrError> {
        let offset = self.pos;
        let bytes = self.read_opaque(max)?;
        String::from_utf8(bytes).map_err(|_| XdrError::InvalidUtf8 { offset })
    }

    /// Optional data, `type *name`.
    pub fn read_option<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, XdrError>,
    ) -> Result<Option<T>, XdrError> {
        if self.read_bool()? {
            Ok(Some(f(self)?))
        } else {
            Ok(None)
        }
    }

    /// Variable-length array, `type name<max>`.
    pub fn read_array<T>(
        &mut self,
        max: usize,
        mut f: impl FnMut(&mut Self) -> Result<T, XdrError>,
    ) -> Result<Vec<T>, XdrError> {
        let len = self.read_length(max)?;
        // Every element occupies at least four bytes.
        let mut items = Vec::with_capacity(len.min(self.remaining() / 4));
        for _ in 0..len {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// Reads a union arm selector that only has the `v0` (void) arm.
    pub fn read_empty_ext(&mut self, type_name: &'static str) -> Result<(), XdrError> {
        match self.read_i32()? {
            0 => Ok(()),
            value => Err(XdrError::UnknownDiscriminant { type_name, value }),
        }
    }

    pub fn finish(self) -> Result<(), XdrError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(XdrError::TrailingBytes { remaining }),
        }
    }
}

impl Decode for u32 {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        r.read_u32()
    }
}

impl Decode for i64 {
    fn decode(r: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        r.read_i64()
    }
}
