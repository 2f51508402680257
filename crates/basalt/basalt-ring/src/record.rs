/// One stored line: an owned, non-empty byte sequence including its trailing
/// newline.
///
/// Records enter the ring whole and leave it whole; eviction returns the
/// `Record` itself so the producer decides when the payload is released.
#[derive(Debug, PartialEq, Eq)]
pub struct Record {
    data: Box<[u8]>,
}

impl Record {
    /// Wraps an assembled line. The framing layer only commits complete lines,
    /// so an empty payload is a caller bug.
    ///
    /// # Panics
    /// Panics if `data` is empty.
    pub fn new(data: Box<[u8]>) -> Self {
        assert!(!data.is_empty(), "records must hold at least one byte");
        Self { data }
    }

    /// Payload length in bytes. Always at least 1.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Record {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data.into_boxed_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reports_its_size() {
        let r = Record::from(b"hello\n".to_vec());
        assert_eq!(r.len(), 6);
        assert_eq!(r.as_bytes(), b"hello\n");
    }

    #[test]
    #[should_panic(expected = "at least one byte")]
    fn empty_record_is_rejected() {
        let _ = Record::new(Box::new([]));
    }
}
