/// Append-only XDR encoder. Maximum lengths are the caller's responsibility.
#[derive(Debug, Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

pub trait Encode {
    fn encode(&self, w: &mut XdrWriter);
}

pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut w = XdrWriter::new();
    value.encode(&mut w);
    w.into_bytes()
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn pad(&mut self, len: usize) {
        let pad = (4 - len % 4) % 4;
        self.buf.extend(std::iter::repeat(0u8).take(pad));
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u32(v as u32);
    }

    pub fn write_fixed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.pad(data.len());
    }

    pub fn write_opaque(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.write_fixed(data);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_opaque(s.as_bytes());
    }

    pub fn write_option<T>(&mut self, value: Option<&T>, f: impl FnOnce(&mut Self, &T)) {
        match value {
            Some(v) => {
                self.write_bool(true);
                f(self, v);
            }
            None => self.write_bool(false),
        }
    }

    pub fn write_array<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.write_u32(items.len() as u32);
        for item in items {
            f(self, item);
        }
    }
}

impl Encode for u32 {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_u32(*self);
    }
}

impl Encode for i64 {
    fn encode(&self, w: &mut XdrWriter) {
        w.write_i64(*self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_is_padded_to_four_bytes() {
        let mut w = XdrWriter::new();
        w.write_opaque(b"hello");
        assert_eq!(
            w.into_bytes(),
            vec![0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', 0, 0, 0]
        );
    }

    #[test]
    fn test_option_writes_presence_flag() {
        let mut w = XdrWriter::new();
        w.write_option(Some(&7u32), |w, v| w.write_u32(*v));
        w.write_option(None::<&u32>, |w, v| w.write_u32(*v));
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 1, 0, 0, 0, 7, 0, 0, 0, 0]);
    }
}
