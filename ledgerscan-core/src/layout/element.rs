use serde::Serialize;

use crate::analysis::bbox::Bbox;

/// Integer pixel box with `x1 <= x2` and `y1 <= y2`.
///
/// Boxes are never grown in place: merging produces a new box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Builds a box, swapping coordinates so the ordering invariant holds.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn x_center(&self) -> f32 {
        (self.x1 + self.x2) as f32 / 2.0
    }

    pub fn y_center(&self) -> f32 {
        (self.y1 + self.y2) as f32 / 2.0
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Smallest box enclosing every box of the iterator.
    pub fn enclosing<'a, I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        boxes.into_iter().fold(None, |acc, bbox| {
            Some(match acc {
                None => *bbox,
                Some(acc) => Self {
                    x1: acc.x1.min(bbox.x1),
                    y1: acc.y1.min(bbox.y1),
                    x2: acc.x2.max(bbox.x2),
                    y2: acc.y2.max(bbox.y2),
                },
            })
        })
    }
}

impl From<Bbox> for BoundingBox {
    /// Truncates toward zero, the way detector boxes are snapped to pixels.
    fn from(bbox: Bbox) -> Self {
        Self::new(
            bbox.min.x as i32,
            bbox.min.y as i32,
            bbox.max.x as i32,
            bbox.max.y as i32,
        )
    }
}

/// One OCR token with its page-space position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Word {
    pub text: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Word {
    pub fn new(text: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
        }
    }

    pub fn x_center(&self) -> f32 {
        self.bbox.x_center()
    }

    pub fn y_center(&self) -> f32 {
        self.bbox.y_center()
    }

    /// `true` when every character is a digit or one of `.` `,` and space.
    ///
    /// An empty string counts as numeric.
    pub fn is_number(text: &str) -> bool {
        text.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | ' '))
    }

    pub fn is_numeric(&self) -> bool {
        Self::is_number(&self.text)
    }

    /// Numbers only fuse with numbers, prose only with prose.
    pub fn is_same_type(&self, other: &Word) -> bool {
        self.is_numeric() == other.is_numeric()
    }

    /// Fuses a group of fragments into one token.
    ///
    /// The text is the concatenation of the fragments with every space
    /// removed, the box encloses all fragments and the confidence is their
    /// mean. A single fragment comes back unchanged.
    pub fn merge(group: &[Word]) -> Option<Word> {
        match group {
            [] => None,
            [single] => Some(single.clone()),
            _ => {
                let text = group
                    .iter()
                    .flat_map(|word| word.text.chars())
                    .filter(|c| *c != ' ')
                    .collect::<String>();
                let confidence =
                    group.iter().map(|word| word.confidence).sum::<f32>() / group.len() as f32;
                let bbox = BoundingBox::enclosing(group.iter().map(|word| &word.bbox))?;

                Some(Word {
                    text,
                    confidence,
                    bbox,
                })
            }
        }
    }
}

/// A row of words read left to right.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Line {
    pub words: Vec<Word>,
    /// Mean vertical center of the words.
    pub y_position: f32,
}

impl Line {
    /// Orders the words by horizontal center and computes the row position.
    pub fn new(mut words: Vec<Word>) -> Self {
        words.sort_by(|a, b| a.x_center().total_cmp(&b.x_center()));
        let y_position = if words.is_empty() {
            0.0
        } else {
            words.iter().map(Word::y_center).sum::<f32>() / words.len() as f32
        };

        Self { words, y_position }
    }

    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|word| word.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Mean confidence of the words, `0.0` for an empty line.
    pub fn confidence(&self) -> f32 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.words.iter().map(|word| word.confidence).sum::<f32>() / self.words.len() as f32
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
