use tracing::*;

use crate::{
    consts::{X_TOLERANCE, Y_TOLERANCE},
    layout::element::{Line, Word},
};

/// Tolerances of the word clustering engine, in pixels.
#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
    /// Largest horizontal gap bridged when fusing fragments.
    pub x_tolerance: i32,
    /// Largest vertical distance from a line's anchor for a word to join it.
    pub y_tolerance: i32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            x_tolerance: X_TOLERANCE,
            y_tolerance: Y_TOLERANCE,
        }
    }
}

/// Turns the unordered words of one table region into ordered lines of
/// whole tokens.
#[derive(Debug, Clone, Default)]
pub struct WordClusterer {
    config: ClusterConfig,
}

impl WordClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Groups words into rows, fuses fragments inside each row and returns
    /// the rows top to bottom.
    pub fn cluster(&self, words: Vec<Word>) -> Vec<Line> {
        let word_count = words.len();

        let mut lines = self
            .group_lines(words)
            .into_iter()
            .map(|line| Line::new(self.merge_words(line.words)))
            .collect::<Vec<_>>();
        lines.sort_by(|a, b| a.y_position.total_cmp(&b.y_position));

        debug!("clustered {} words into {} lines", word_count, lines.len());
        lines
    }

    /// Single sweep over the words sorted by vertical center.
    ///
    /// The anchor of a line is the vertical center of its first word, it does
    /// not drift as words are added.
    pub fn group_lines(&self, mut words: Vec<Word>) -> Vec<Line> {
        if words.is_empty() {
            return Vec::new();
        }

        words.sort_by(|a, b| a.y_center().total_cmp(&b.y_center()));

        let tolerance = self.config.y_tolerance as f32;
        let mut lines = Vec::new();
        let mut words = words.into_iter();
        let Some(first) = words.next() else {
            return lines;
        };

        let mut current_y = first.y_center();
        let mut current_line = vec![first];

        for word in words {
            if (word.y_center() - current_y).abs() <= tolerance {
                current_line.push(word);
            } else {
                current_y = word.y_center();
                let finished = std::mem::replace(&mut current_line, vec![word]);
                lines.push(Line::new(finished));
            }
        }
        lines.push(Line::new(current_line));

        lines.sort_by(|a, b| a.y_position.total_cmp(&b.y_position));
        lines
    }

    /// Fuses horizontally adjacent fragments of the same type.
    ///
    /// The gap is measured from the right edge of the previous fragment of
    /// the group, and a number never fuses with text however close they are.
    pub fn merge_words(&self, mut words: Vec<Word>) -> Vec<Word> {
        if words.is_empty() {
            return Vec::new();
        }

        words.sort_by(|a, b| a.x_center().total_cmp(&b.x_center()));

        let mut merged = Vec::with_capacity(words.len());
        let mut group: Vec<Word> = Vec::new();

        for word in words {
            let joins = group.last().is_some_and(|last| {
                word.bbox.x1 - last.bbox.x2 <= self.config.x_tolerance && word.is_same_type(last)
            });

            if !joins && !group.is_empty() {
                merged.extend(Word::merge(&group));
                group.clear();
            }
            group.push(word);
        }
        merged.extend(Word::merge(&group));

        merged
    }
}
