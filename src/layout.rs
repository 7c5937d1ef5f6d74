use crate::error::ThumbforgeResult;

/// Line advance as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.1;
/// Font-size decrement used by the fitting loop, logical px.
pub const FONT_SIZE_STEP: f32 = 2.0;

/// Width measurement capability of the drawing surface.
///
/// `fit_text` only reads widths; implementations must be deterministic for a
/// given `(text, family, weight, font_size)` tuple.
pub trait TextMeasure {
    fn line_width(
        &mut self,
        text: &str,
        family: &str,
        weight: u16,
        font_size: f32,
    ) -> ThumbforgeResult<f32>;
}

/// One fitted text block: the chosen font size and its wrapped lines.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedBlock {
    pub font_size: f32,
    pub lines: Vec<String>,
}

impl FittedBlock {
    pub fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_FACTOR
    }

    /// Total block height: `lines * fontSize * 1.1`.
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Fold to uppercase and greedily wrap `text` into lines of measured width
/// <= `max_width`.
///
/// A line is only broken once it already holds at least one word, so a single
/// word wider than `max_width` stays on its own overflowing line. Empty lines
/// are dropped.
pub fn wrap_words(
    measure: &mut dyn TextMeasure,
    text: &str,
    family: &str,
    weight: u16,
    font_size: f32,
    max_width: f32,
) -> ThumbforgeResult<Vec<String>> {
    let folded = text.to_uppercase();
    if folded.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut line = String::new();
    let mut lines = Vec::<String>::new();
    for (i, word) in folded.split(' ').enumerate() {
        let mut candidate = line.clone();
        candidate.push_str(word);
        candidate.push(' ');

        let width = measure.line_width(&candidate, family, weight, font_size)?;
        if width > max_width && i > 0 {
            lines.push(line.trim().to_string());
            line.clear();
            line.push_str(word);
            line.push(' ');
        } else {
            line = candidate;
        }
    }
    lines.push(line.trim().to_string());
    lines.retain(|l| !l.is_empty());
    Ok(lines)
}

/// Find the largest font size in `[min_font_size, initial_font_size]`
/// (stepping down by 2) whose wrapped lines fit `max_height` vertically.
///
/// Never fails: when even `min_font_size` overflows, the block is returned at
/// the minimum size and the caller draws it overflowing its box.
#[allow(clippy::too_many_arguments)]
pub fn fit_text(
    measure: &mut dyn TextMeasure,
    text: &str,
    family: &str,
    weight: u16,
    max_width: f32,
    max_height: f32,
    initial_font_size: f32,
    min_font_size: f32,
) -> ThumbforgeResult<FittedBlock> {
    let mut font_size = initial_font_size;
    while font_size >= min_font_size {
        let lines = wrap_words(measure, text, family, weight, font_size, max_width)?;
        let total_height = lines.len() as f32 * font_size * LINE_HEIGHT_FACTOR;
        if total_height <= max_height {
            return Ok(FittedBlock { font_size, lines });
        }
        font_size -= FONT_SIZE_STEP;
    }

    let lines = wrap_words(measure, text, family, weight, min_font_size, max_width)?;
    Ok(FittedBlock {
        font_size: min_font_size,
        lines,
    })
}

/// Vertical placement of the combined title+subtitle block, centered on the
/// canvas midline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StackedBlocks {
    /// Top of the title block.
    pub title_y: f32,
    /// Top of the subtitle block (meaningless when the subtitle is empty).
    pub subtitle_y: f32,
    /// Combined height including inter-block spacing.
    pub total_height: f32,
}

/// Center the combined block vertically. Spacing is reserved whenever a
/// subtitle block exists, even when the title is empty.
pub fn stack_blocks(
    canvas_height: f32,
    title_height: f32,
    subtitle_height: f32,
    spacing: f32,
) -> StackedBlocks {
    let gap = if subtitle_height > 0.0 { spacing } else { 0.0 };
    let total_height = title_height + gap + subtitle_height;
    let title_y = canvas_height / 2.0 - total_height / 2.0;
    let subtitle_y = title_y + title_height + gap;
    StackedBlocks {
        title_y,
        subtitle_y,
        total_height,
    }
}
