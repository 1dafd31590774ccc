use thiserror::Error;

/**
    Error returned when a [`Reader`] is asked for more bytes than remain.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unexpected end of data at offset {offset}: needed {needed} bytes, {remaining} remaining")]
pub struct ReadError {
    pub offset: usize,
    pub needed: usize,
    pub remaining: usize,
}

/**
    Cursor over a borrowed byte buffer.

    Every read is bounds-checked and advances the cursor only on success,
    so a failed read leaves the position where it was. Multi-byte integers
    come in explicit big-endian (`_be`) and little-endian (`_le`) flavors
    since PlayReady mixes both: ISO-BMFF and XMR framing are big-endian,
    PlayReady header objects are little-endian.
*/
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /**
        Current offset from the start of the buffer.
    */
    pub const fn position(&self) -> usize {
        self.pos
    }

    /**
        Number of unread bytes.
    */
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /**
        The whole underlying buffer, independent of the cursor.
    */
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /**
        Move the cursor back to the start of the buffer.
    */
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        self.take(n).map(|_| ())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        self.take(n)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /**
        Consume and return everything up to the end of the buffer.
    */
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, ReadError> {
        self.read_array().map(u16::from_be_bytes)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, ReadError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, ReadError> {
        self.read_array().map(u32::from_be_bytes)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, ReadError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /**
        Read a little-endian u16 without advancing the cursor.
    */
    pub fn peek_u16_le(&self) -> Result<u16, ReadError> {
        self.clone().read_u16_le()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        if n > self.remaining() {
            return Err(ReadError {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }
}
