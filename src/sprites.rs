use tomodashi::{PetError, PetResult, Size, TextureId, TextureLoader};

/// Container units per terminal column and row; cells are roughly twice as tall as wide.
pub(crate) const UNITS_PER_COL: f32 = 4.0;
pub(crate) const UNITS_PER_ROW: f32 = 8.0;

/// Eye row shared by every sprite, where the death overlay lands.
pub(crate) const EYE_ROW: usize = 1;

const SHEET: &[(&str, &[&str])] = &[
    (
        "baby",
        &[
            "  ___  ",
            " (o o) ",
            " ( v ) ",
            "  \"-\"  ",
        ],
    ),
    (
        "child",
        &[
            "   ___   ",
            "  (o o)  ",
            " /( - )\\ ",
            "   / \\   ",
        ],
    ),
    (
        "child-2",
        &[
            " \\ ___ / ",
            "  (o o)  ",
            "  ( - )  ",
            "   / \\   ",
        ],
    ),
    (
        "teen",
        &[
            "   ___   ",
            "  (o_o)  ",
            " /|   |\\ ",
            "  |___|  ",
            "  /   \\  ",
        ],
    ),
    (
        "adult",
        &[
            "  _____  ",
            " ( o o ) ",
            "/|  ^  |\\",
            " |_____| ",
            "  |   |  ",
        ],
    ),
    (
        "senior",
        &[
            "  ~~~~~  ",
            " ( - - ) ",
            " |  ~  |\\",
            " |_____||",
            "  |   | |",
        ],
    ),
    ("dead-eyes", &["x x"]),
];

/// Resolves texture names against the built-in ASCII sheet.
pub(crate) struct AsciiSprites;

impl TextureLoader for AsciiSprites {
    fn load_texture(&mut self, name: &str) -> PetResult<TextureId> {
        SHEET
            .iter()
            .position(|(n, _)| *n == name)
            .map(|i| TextureId(i as u32))
            .ok_or_else(|| PetError::TextureUnavailable(name.to_string()))
    }
}

pub(crate) fn art(id: TextureId) -> &'static [&'static str] {
    SHEET.get(id.0 as usize).map(|(_, a)| *a).unwrap_or(&[])
}

/// Largest sprite on the sheet, in container units.
pub(crate) fn footprint() -> Size {
    let (cols, rows) = SHEET.iter().fold((0usize, 0usize), |(c, r), (_, a)| {
        let w = a.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        (c.max(w), r.max(a.len()))
    });
    Size::new(cols as f32 * UNITS_PER_COL, rows as f32 * UNITS_PER_ROW)
}
