// Built-in (base-14) faces with WinAnsi advance widths, in 1/1000 em.

// ' ' (0x20) through '~' (0x7E)
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[derive(Debug, Clone, Copy)]
enum Metrics {
    Proportional(&'static [u16; 95]),
    Monospaced(u16),
}

#[derive(Debug, Clone, Copy)]
pub struct FontFace {
    /// PostScript name written as `/BaseFont`.
    pub base_font: &'static str,
    metrics: Metrics,
}

impl FontFace {
    const fn proportional(base_font: &'static str, widths: &'static [u16; 95]) -> Self {
        Self {
            base_font,
            metrics: Metrics::Proportional(widths),
        }
    }

    const fn monospaced(base_font: &'static str, advance: u16) -> Self {
        Self {
            base_font,
            metrics: Metrics::Monospaced(advance),
        }
    }

    fn glyph_width(&self, byte: u8) -> u16 {
        let widths = match self.metrics {
            Metrics::Monospaced(advance) => return advance,
            Metrics::Proportional(widths) => widths,
        };
        match byte {
            0x20..=0x7E => widths[(byte - 0x20) as usize],
            0x95 => 350,
            0x96 => 556,
            0x97 => 1000,
            0x91..=0x94 => 333,
            0xA0 => widths[0],
            _ => match latin1_base(byte) {
                Some(base) => widths[(base - 0x20) as usize],
                None => 556,
            },
        }
    }

    /// Advance width of `text` at `size` points.
    pub fn width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| u32::from(self.glyph_width(b)))
            .sum();
        units as f32 * size / 1000.0
    }
}

/// Regular and bold faces, chosen once at startup.
#[derive(Debug, Clone, Copy)]
pub struct FontSet {
    pub regular: FontFace,
    pub bold: FontFace,
}

impl FontSet {
    pub const HELVETICA: FontSet = FontSet {
        regular: FontFace::proportional("Helvetica", &HELVETICA),
        bold: FontFace::proportional("Helvetica-Bold", &HELVETICA_BOLD),
    };

    pub const COURIER: FontSet = FontSet {
        regular: FontFace::monospaced("Courier", 600),
        bold: FontFace::monospaced("Courier-Bold", 600),
    };

    /// Pick a family by name; unknown or absent names use Helvetica.
    pub fn resolve(family: Option<&str>) -> Self {
        match family.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("helvetica") => Self::HELVETICA,
            Some("courier") => Self::COURIER,
            Some(other) => {
                tracing::warn!("font family {:?} is not built in, using Helvetica", other);
                Self::HELVETICA
            }
        }
    }

    pub fn face(&self, bold: bool) -> &FontFace {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }
}

// Accented Latin-1 letters measured as their unaccented base.
fn latin1_base(byte: u8) -> Option<u8> {
    let base = match byte {
        0xC0..=0xC5 => b'A',
        0xC7 => b'C',
        0xC8..=0xCB => b'E',
        0xCC..=0xCF => b'I',
        0xD1 => b'N',
        0xD2..=0xD6 | 0xD8 => b'O',
        0xD9..=0xDC => b'U',
        0xDD => b'Y',
        0xE0..=0xE5 => b'a',
        0xE7 => b'c',
        0xE8..=0xEB => b'e',
        0xEC..=0xEF => b'i',
        0xF1 => b'n',
        0xF2..=0xF6 | 0xF8 => b'o',
        0xF9..=0xFC => b'u',
        0xFD | 0xFF => b'y',
        _ => return None,
    };
    Some(base)
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '\t' | '\n' | '\r' => b' ',
        '€' => 0x80,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        _ => return None,
    };
    Some(byte)
}

/// Encode text for a `/WinAnsiEncoding` simple font. Unmappable characters
/// become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| win_ansi_byte(c).unwrap_or(b'?')).collect()
}

/// Distinct characters of `text` that [`encode_win_ansi`] replaces with `?`,
/// in order of first appearance.
pub fn unencodable(text: &str) -> Vec<char> {
    let mut missing = Vec::new();
    for c in text.chars() {
        if win_ansi_byte(c).is_none() && !missing.contains(&c) {
            missing.push(c);
        }
    }
    missing
}
