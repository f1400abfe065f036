/// Splits decoded text into newline-terminated logical lines.
///
/// Text after the last `\n` is held in the carry-over buffer until a later
/// push terminates it. An unterminated tail is never emitted.
#[derive(Debug, Default)]
pub struct LineSplitter {
    carry: String,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` and returns every line it completed, in order, without
    /// the trailing `\n`.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        // The carry never holds a newline, so only the new text needs scanning.
        let Some(in_text) = text.rfind('\n') else {
            self.carry.push_str(text);
            return Vec::new();
        };
        let last_newline = self.carry.len() + in_text;
        self.carry.push_str(text);

        let tail = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, tail);
        complete[..last_newline]
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    pub fn carry(&self) -> &str {
        &self.carry
    }

    /// Drops the carry-over buffer, returning it if it held anything.
    pub fn take_carry(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.carry))
        }
    }
}
