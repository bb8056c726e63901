//! Block-glyph text for the date/time overlay.
//!
//! Glyphs are 5 cells wide and 7 cells tall; `size` is the glyph height in
//! pixels, so one cell is `size / 7` pixels square. Glyphs advance by 6 cells.

const GLYPH_ROWS: usize = 7;
const GLYPH_COLS: usize = 5;
const ADVANCE_CELLS: f32 = 6.0;

/// A lit cell in pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

fn glyph(c: char) -> Option<[&'static str; GLYPH_ROWS]> {
    Some(match c.to_ascii_uppercase() {
        '0' => [" ### ", "#   #", "#  ##", "# # #", "##  #", "#   #", " ### "],
        '1' => ["  #  ", " ##  ", "  #  ", "  #  ", "  #  ", "  #  ", " ### "],
        '2' => [" ### ", "#   #", "    #", "  ## ", " #   ", "#    ", "#####"],
        '3' => [" ### ", "#   #", "    #", "  ## ", "    #", "#   #", " ### "],
        '4' => ["   # ", "  ## ", " # # ", "#  # ", "#####", "   # ", "   # "],
        '5' => ["#####", "#    ", "#### ", "    #", "    #", "#   #", " ### "],
        '6' => [" ### ", "#    ", "#    ", "#### ", "#   #", "#   #", " ### "],
        '7' => ["#####", "    #", "   # ", "  #  ", " #   ", " #   ", " #   "],
        '8' => [" ### ", "#   #", "#   #", " ### ", "#   #", "#   #", " ### "],
        '9' => [" ### ", "#   #", "#   #", " ####", "    #", "    #", " ### "],
        '/' => ["    #", "    #", "   # ", "  #  ", " #   ", "#    ", "#    "],
        ':' => ["     ", "  #  ", "  #  ", "     ", "  #  ", "  #  ", "     "],
        '.' => ["     ", "     ", "     ", "     ", "     ", " ##  ", " ##  "],
        '-' => ["     ", "     ", "     ", "#####", "     ", "     ", "     "],
        ' ' => ["     "; GLYPH_ROWS],
        'A' => [" ### ", "#   #", "#   #", "#####", "#   #", "#   #", "#   #"],
        'P' => ["#### ", "#   #", "#   #", "#### ", "#    ", "#    ", "#    "],
        'M' => ["#   #", "## ##", "# # #", "# # #", "#   #", "#   #", "#   #"],
        _ => return None,
    })
}

fn cell(size: f32) -> f32 {
    size / GLYPH_ROWS as f32
}

/// Pixel width of `text` at `size`. No trailing gap after the last glyph.
pub fn measure(text: &str, size: f32) -> f32 {
    let count = text.chars().count();
    if count == 0 {
        return 0.0;
    }
    let cell = cell(size);
    count as f32 * ADVANCE_CELLS * cell - cell
}

/// Quads for every lit cell of `text` with its top-left corner at (`x`, `y`).
///
/// Characters without a glyph advance like a space.
pub fn layout(text: &str, x: f32, y: f32, size: f32) -> Vec<GlyphQuad> {
    let cell = cell(size);
    let mut quads = Vec::new();
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let origin_x = x + i as f32 * ADVANCE_CELLS * cell;
        for (row, bits) in rows.iter().enumerate() {
            for (col, b) in bits.bytes().take(GLYPH_COLS).enumerate() {
                if b == b'#' {
                    quads.push(GlyphQuad {
                        x: origin_x + col as f32 * cell,
                        y: y + row as f32 * cell,
                        width: cell,
                        height: cell,
                    });
                }
            }
        }
    }
    quads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_glyphs_are_well_formed() {
        for c in "0123456789/:.- APM".chars() {
            let rows = glyph(c).unwrap();
            for row in rows {
                assert_eq!(row.len(), GLYPH_COLS, "glyph {c:?}");
            }
        }
    }

    #[test]
    fn test_measure() {
        assert_eq!(measure("", 28.0), 0.0);
        assert!((measure("1", 28.0) - 20.0).abs() < 1e-4);
        assert!((measure("12:00:00", 28.0) - (8.0 * 24.0 - 4.0)).abs() < 1e-3);
    }

    #[test]
    fn test_layout_positions_cells() {
        let quads = layout("-", 10.0, 10.0, 7.0);
        assert_eq!(quads.len(), 5);
        assert_eq!(quads[0], GlyphQuad { x: 10.0, y: 13.0, width: 1.0, height: 1.0 });
        assert_eq!(quads[4].x, 14.0);
    }

    #[test]
    fn test_unknown_chars_advance_blank() {
        let plain = layout("1 1", 0.0, 0.0, 7.0);
        let odd = layout("1?1", 0.0, 0.0, 7.0);
        assert_eq!(plain, odd);
        assert!(layout(" ", 0.0, 0.0, 7.0).is_empty());
    }

    #[test]
    fn test_layout_stays_within_measure() {
        let text = "01/15/24";
        let width = measure(text, 30.0);
        for q in layout(text, 0.0, 0.0, 30.0) {
            assert!(q.x + q.width <= width + 1e-3);
            assert!(q.y + q.height <= 30.0 + 1e-3);
        }
    }
}
