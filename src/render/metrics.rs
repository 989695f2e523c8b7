//! Metrics and encodings of the fonts the builder draws with.
//!
//! Latin text is drawn in the Helvetica family with WinAnsi encoding, so
//! only its advance widths are carried. Characters outside WinAnsi switch
//! to the non-embedded `STSong-Light` CID font (Adobe-GB1, `UniGB-UCS2-H`),
//! where every glyph is one em wide. Widths are in 1/1000 em.

/// Helvetica and Helvetica-Oblique, codes 32..=126.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold, codes 32..=126.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Advance used for Latin-1 letters outside the ASCII table.
const LATIN1_DEFAULT: u16 = 556;

/// Advance of every glyph drawn with the CJK font.
pub const CJK_ADVANCE: u16 = 1000;

/// Width table for a standard font name, if we know it.
pub(crate) fn standard_widths(base_font: &str) -> Option<&'static [u16; 95]> {
    match base_font {
        "Helvetica" | "Helvetica-Oblique" | "Arial" | "ArialMT" | "Arial-ItalicMT" => {
            Some(&HELVETICA)
        }
        "Helvetica-Bold" | "Helvetica-BoldOblique" | "Arial-BoldMT" | "Arial,Bold" => {
            Some(&HELVETICA_BOLD)
        }
        _ => None,
    }
}

/// The fonts the builder draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    /// Type0 fallback for characters WinAnsi cannot encode.
    SongLight,
}

impl StandardFont {
    pub const ALL: [StandardFont; 4] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::SongLight,
    ];

    /// PostScript name written as `/BaseFont`.
    pub fn base_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::SongLight => "STSong-Light",
        }
    }

    /// Resource name used in page `/Font` dictionaries.
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "RpF1",
            StandardFont::HelveticaBold => "RpF2",
            StandardFont::HelveticaOblique => "RpF3",
            StandardFont::SongLight => "RpF4",
        }
    }

    /// Composite fonts take two-byte codes.
    pub fn is_composite(self) -> bool {
        self == StandardFont::SongLight
    }

    fn table(self) -> &'static [u16; 95] {
        match self {
            StandardFont::HelveticaBold => &HELVETICA_BOLD,
            _ => &HELVETICA,
        }
    }

    /// Advance of a WinAnsi byte in 1/1000 em.
    pub fn byte_width(self, byte: u8) -> u16 {
        match byte {
            32..=126 => self.table()[(byte - 32) as usize],
            0x85 | 0x89 | 0x97 => 1000,
            0x91 | 0x92 | 0x82 => 222,
            0x93 | 0x94 | 0x84 => 333,
            0x95 => 350,
            0x96 => 556,
            0xA0 => 278,
            _ => LATIN1_DEFAULT,
        }
    }

    /// The font that draws `c` when `self` is the requested font.
    ///
    /// WinAnsi characters stay in the Latin font, the rest of the Basic
    /// Multilingual Plane goes to [`StandardFont::SongLight`]. Characters
    /// beyond it stay Latin and are drawn as `?`.
    pub fn font_for(self, c: char) -> StandardFont {
        let latin = match self {
            StandardFont::SongLight => StandardFont::Helvetica,
            other => other,
        };
        if win_ansi_byte(c).is_none() && u16::try_from(u32::from(c)).is_ok() {
            StandardFont::SongLight
        } else {
            latin
        }
    }

    /// Advance of `c` in 1/1000 em, in the font that draws it.
    pub fn char_width(self, c: char) -> u16 {
        match self.font_for(c) {
            StandardFont::SongLight => CJK_ADVANCE,
            font => font.byte_width(win_ansi_byte(c).unwrap_or(b'?')),
        }
    }

    /// Width of `text` in points at `size`, across font runs.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.char_width(c))).sum();
        units as f32 * size / 1000.0
    }

    /// Split `text` into consecutive runs drawn with the same font.
    pub fn runs(self, text: &str) -> Vec<(StandardFont, String)> {
        let mut runs: Vec<(StandardFont, String)> = Vec::new();
        for c in text.chars() {
            let font = self.font_for(c);
            match runs.last_mut() {
                Some((last, run)) if *last == font => run.push(c),
                _ => runs.push((font, c.to_string())),
            }
        }
        runs
    }

    /// Bytes of a run of `text` for this font's encoding.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            StandardFont::SongLight => encode_ucs2(text),
            _ => encode_win_ansi(text),
        }
    }
}

/// Ascent of Helvetica as a fraction of the font size.
pub const ASCENT: f32 = 0.718;
/// Descent of Helvetica as a fraction of the font size.
pub const DESCENT: f32 = 0.207;

/// WinAnsiEncoding byte for a character, if it has one.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => {
            let byte = match c {
                '€' => 0x80,
                '‚' => 0x82,
                'ƒ' => 0x83,
                '„' => 0x84,
                '…' => 0x85,
                '†' => 0x86,
                '‡' => 0x87,
                'ˆ' => 0x88,
                '‰' => 0x89,
                'Š' => 0x8A,
                '‹' => 0x8B,
                'Œ' => 0x8C,
                'Ž' => 0x8E,
                '‘' => 0x91,
                '’' => 0x92,
                '“' => 0x93,
                '”' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '˜' => 0x98,
                '™' => 0x99,
                'š' => 0x9A,
                '›' => 0x9B,
                'œ' => 0x9C,
                'ž' => 0x9E,
                'Ÿ' => 0x9F,
                '\t' => b' ',
                _ => return None,
            };
            Some(byte)
        }
    }
}

/// Encode text for a WinAnsi font; unencodable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
        .collect()
}

/// Big-endian UCS-2 for `UniGB-UCS2-H`; characters beyond the BMP become `?`.
pub fn encode_ucs2(text: &str) -> Vec<u8> {
    text.chars()
        .flat_map(|c| u16::try_from(u32::from(c)).unwrap_or(u16::from(b'?')).to_be_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        let f = StandardFont::Helvetica;
        assert_eq!(f.byte_width(b' '), 278);
        assert_eq!(f.byte_width(b'A'), 667);
        assert_eq!(f.byte_width(b'i'), 222);
        assert_eq!(f.byte_width(b'~'), 584);
        assert_eq!(StandardFont::HelveticaBold.byte_width(b'i'), 278);
        assert_eq!(StandardFont::HelveticaOblique.byte_width(b'm'), 833);
    }

    #[test]
    fn test_text_width() {
        // "Hi" = 722 + 222
        let w = StandardFont::Helvetica.text_width("Hi", 10.0);
        assert!((w - 9.44).abs() < 1e-4);
        assert_eq!(StandardFont::Helvetica.text_width("", 12.0), 0.0);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("a–b"), vec![b'a', 0x96, b'b']);
        assert_eq!(encode_win_ansi("“x”"), vec![0x93, b'x', 0x94]);
    }

    #[test]
    fn test_cjk_runs_switch_font() {
        let runs = StandardFont::HelveticaBold.runs("Table 2: 实验结果 (n=5)");
        let fonts: Vec<StandardFont> = runs.iter().map(|(f, _)| *f).collect();
        assert_eq!(
            fonts,
            [StandardFont::HelveticaBold, StandardFont::SongLight, StandardFont::HelveticaBold]
        );
        assert_eq!(runs[1].1, "实验结果");

        let bytes = StandardFont::SongLight.encode(&runs[1].1);
        assert_eq!(&bytes[..2], &[0x5B, 0x9E]);
        let units: Vec<u16> = bytes
            .chunks(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(String::from_utf16(&units).unwrap(), "实验结果");
    }

    #[test]
    fn test_cjk_width_is_one_em() {
        let f = StandardFont::Helvetica;
        assert_eq!(f.char_width('结'), 1000);
        assert!((f.text_width("结果", 10.0) - 20.0).abs() < 1e-4);
        // Mixed runs add up
        assert!((f.text_width("Hi结", 10.0) - 19.44).abs() < 1e-4);
    }

    #[test]
    fn test_beyond_bmp_stays_latin() {
        assert_eq!(StandardFont::Helvetica.font_for('😀'), StandardFont::Helvetica);
        assert_eq!(StandardFont::SongLight.font_for('a'), StandardFont::Helvetica);
        assert_eq!(encode_ucs2("a😀"), vec![0x00, b'a', 0x00, b'?']);
    }

    #[test]
    fn test_standard_widths_names() {
        assert!(standard_widths("Helvetica").is_some());
        assert_eq!(standard_widths("Helvetica-Bold").map(|t| t[1]), Some(333));
        assert!(standard_widths("CMR10").is_none());
    }
}
