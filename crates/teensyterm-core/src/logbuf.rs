/// Where a log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Status and error messages meant for the operator.
    System,
    /// Decoded text received from the board.
    Device,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub source: Source,
    pub text: String,
}

/// Append-only record of everything shown to the user. Entries are never
/// edited; device output can only be cleared as a whole.
///
/// Both panes are rendered incrementally as entries arrive, and each carries
/// a revision that moves whenever its text changes.
#[derive(Debug, Default)]
pub struct LogStore {
    entries: Vec<LogEntry>,
    system_text: String,
    output_text: String,
    output_raw: Vec<u8>,
    system_rev: u64,
    output_rev: u64,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.system_text.push_str(&text);
        self.system_text.push('\n');
        self.system_rev += 1;
        self.entries.push(LogEntry {
            source: Source::System,
            text,
        });
    }

    /// Records a device line: `raw` as received, `text` as decoded for display.
    pub fn push_device(&mut self, raw: &[u8], text: impl Into<String>) {
        let text = text.into();
        self.output_text.push_str(&text);
        self.output_raw.extend_from_slice(raw);
        self.output_rev += 1;
        self.entries.push(LogEntry {
            source: Source::Device,
            text,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn iter(&self, source: Source) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.source == source)
    }

    /// Drops all device output, keeping system messages.
    pub fn clear_output(&mut self) {
        self.entries.retain(|e| e.source != Source::Device);
        self.output_text.clear();
        self.output_raw.clear();
        self.output_rev += 1;
    }

    /// System messages, one per line.
    pub fn system_text(&self) -> &str {
        &self.system_text
    }

    /// Device output as displayed; lines carry their own terminators.
    pub fn output_text(&self) -> &str {
        &self.output_text
    }

    /// Device output exactly as it came off the wire.
    pub fn output_bytes(&self) -> &[u8] {
        &self.output_raw
    }

    pub fn system_revision(&self) -> u64 {
        self.system_rev
    }

    pub fn output_revision(&self) -> u64 {
        self.output_rev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_text_concatenates_device_lines_verbatim() {
        let mut log = LogStore::new();
        log.push_device(b"a\r\n", "a\r\n");
        log.push_system("Command Sent: 3");
        log.push_device(b"b", "b");
        assert_eq!(log.output_text(), "a\r\nb");
        assert_eq!(log.system_text(), "Command Sent: 3\n");
    }

    #[test]
    fn output_bytes_keep_what_was_received() {
        let mut log = LogStore::new();
        log.push_device(b"21\xb0C\n", "21\u{b0}C\n");
        assert_eq!(log.output_bytes(), b"21\xb0C\n");
        assert_eq!(log.output_text(), "21°C\n");
    }

    #[test]
    fn clear_output_keeps_system_messages_in_order() {
        let mut log = LogStore::new();
        log.push_system("one");
        log.push_device(b"x\n", "x\n");
        log.push_system("two");
        log.clear_output();
        assert_eq!(log.output_text(), "");
        assert!(log.output_bytes().is_empty());
        assert_eq!(log.system_text(), "one\ntwo\n");
        assert_eq!(log.entries().len(), 2);
    }

    #[test]
    fn revisions_track_each_pane() {
        let mut log = LogStore::new();
        assert_eq!((log.system_revision(), log.output_revision()), (0, 0));
        log.push_system("hello");
        assert_eq!((log.system_revision(), log.output_revision()), (1, 0));
        log.push_device(b"x\n", "x\n");
        log.clear_output();
        assert_eq!((log.system_revision(), log.output_revision()), (1, 2));
    }
}
