/// Model-readable transcript of a piece of source.
///
/// Blank lines, full-line `//` comments and block comments are stripped
/// before transmission. Block comments are tracked line-wise from the
/// trimmed prefix (`/*`) and suffix (`*/`) only; comments opened and closed
/// mid-line are not recognized.
use crate::symbols::document::split_lines;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    text: String,
    /// `index_map[i]` is the original line of transcript line `i`.
    index_map: Vec<usize>,
}

impl Transcript {
    pub fn encode(source: &str) -> Self {
        let mut text = String::new();
        let mut index_map = Vec::new();
        let mut in_block_comment = false;

        for (index, line) in split_lines(source).into_iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("/*") {
                in_block_comment = true;
            }
            if !trimmed.is_empty() && !in_block_comment && !trimmed.starts_with("//") {
                text.push_str(line);
                text.push('\n');
                index_map.push(index);
            }
            if trimmed.ends_with("*/") {
                in_block_comment = false;
            }
        }

        Self { text, index_map }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.index_map.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.index_map.len()
    }

    /// Original line index of transcript line `index`.
    pub fn original_line(&self, index: usize) -> Option<usize> {
        self.index_map.get(index).copied()
    }

    pub fn index_map(&self) -> &[usize] {
        &self.index_map
    }
}
