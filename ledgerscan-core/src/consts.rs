/// Environment variable holding the directory of the pdfium dynamic library.
pub const PDFIUM_LIB_PATH_ENV_NAME: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Maximum vertical distance (pixels) between a word's center and the anchor
/// of the line being built for the word to join that line.
pub const Y_TOLERANCE: i32 = 10;

/// Maximum horizontal gap (pixels) between two fragments that are fused into
/// one token.
pub const X_TOLERANCE: i32 = 15;

/// Maximum horizontal distance (pixels) between an amount and the `DEBIT`
/// header for the amount to be read as a debit.
pub const DEBIT_X_TOLERANCE: i32 = 10;

/// Header text that marks the debit column of a statement table.
pub const DEBIT_HEADER: &str = "DEBIT";

/// PDF user space is 72 points per inch.
pub const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Resolution pages are rasterized at before table detection and OCR.
pub const RENDER_DPI: f32 = 200.0;

/// Square input side of the table detector.
pub const TABLE_INPUT_SIZE: usize = 640;

/// Minimum class score for a table candidate.
pub const TABLE_PROBA_THRESHOLD: f32 = 0.25;

/// Overlap ratio above which two table candidates are merged.
pub const TABLE_IOU_THRESHOLD: f32 = 0.45;

/// Center-size values at the head of every YOLO candidate vector.
pub const CXYWH_OFFSET: usize = 4;

/// Gray used to pad the detector canvas around the resized page.
pub const BACKGROUND_FILL_VALUE: f32 = 144.0 / 255.0;

/// Colors cycled through when drawing detected tables.
pub const TABLE_COLORS: [[u8; 3]; 5] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [255, 0, 255],
];
