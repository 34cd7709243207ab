use serde::{Deserialize, Serialize};

/// Word geometry as two normalized corners `((x0, y0), (x1, y1))`.
pub type Geometry = [[f32; 2]; 2];

/// Hierarchical OCR output for one image.
///
/// The layout follows the common `pages → blocks → lines → words` export
/// shape, so the JSON of an external OCR program deserializes directly;
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrDocument {
    #[serde(default)]
    pub pages: Vec<OcrPage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    #[serde(default)]
    pub blocks: Vec<OcrBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrBlock {
    #[serde(default)]
    pub lines: Vec<OcrLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    #[serde(default)]
    pub words: Vec<OcrWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub value: String,
    pub confidence: f32,
    /// Corners relative to the recognized image, each coordinate in `[0, 1]`.
    pub geometry: Geometry,
}

impl OcrDocument {
    /// Every word of every page in export order.
    pub fn words(&self) -> impl Iterator<Item = &OcrWord> {
        self.pages
            .iter()
            .flat_map(|page| page.blocks.iter())
            .flat_map(|block| block.lines.iter())
            .flat_map(|line| line.words.iter())
    }

    /// Wraps a flat list of lines into a single page and block.
    pub fn from_lines(lines: Vec<OcrLine>) -> Self {
        Self {
            pages: vec![OcrPage {
                blocks: vec![OcrBlock { lines }],
            }],
        }
    }
}
