use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// In-memory destination for rendered lines.
///
/// Clones share the same storage, so one clone can be handed to a handler
/// while another is kept to inspect what was written. Useful in tests and
/// for embedding the output elsewhere.
#[derive(Clone, Default, Debug)]
pub struct MemorySink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as text.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Written lines without their terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_all(b"a\nb\n").unwrap();
        assert_eq!(sink.lines(), ["a", "b"]);

        sink.clear();
        assert_eq!(sink.contents(), "");
    }
}
