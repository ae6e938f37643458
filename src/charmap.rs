//! Character substitution tables and repertoire folding.
//!
//! Dictionary sources arrive with Windows-1252 leftovers, general-punctuation
//! codepoints and the occasional Greek letter. `fold` rewrites a string into a
//! target repertoire (plain ASCII for index keys, Windows-1252 for legacy
//! display text), consulting the substitution tables first and falling back to
//! NFKD decomposition with combining marks dropped. A character that survives
//! none of that is emitted as a `0x..` hex escape rather than lost.

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Latin-1 supplement range as it shows up in Windows-1252 flavored sources.
const WIN_MAP: &[(u32, &str)] = &[
    (0x80, "e"),    // EURO SIGN
    (0x82, "'"),    // SINGLE LOW-9 QUOTATION MARK
    (0x83, "f"),    // LATIN SMALL LETTER F WITH HOOK
    (0x84, "\""),   // DOUBLE LOW-9 QUOTATION MARK
    (0x85, "..."),  // HORIZONTAL ELLIPSIS
    (0x86, ""),     // DAGGER
    (0x87, ""),     // DOUBLE DAGGER
    (0x88, ""),     // MODIFIER LETTER CIRCUMFLEX ACCENT
    (0x89, "%%"),   // PER MILLE SIGN
    (0x8A, "S"),    // LATIN CAPITAL LETTER S WITH CARON
    (0x8B, "<<"),   // SINGLE LEFT-POINTING ANGLE QUOTATION MARK
    (0x8C, "O"),    // LATIN CAPITAL LIGATURE OE
    (0x8E, "Z"),    // LATIN CAPITAL LETTER Z WITH CARON
    (0x91, "'"),    // LEFT SINGLE QUOTATION MARK
    (0x92, "'"),    // RIGHT SINGLE QUOTATION MARK
    (0x93, "\""),   // LEFT DOUBLE QUOTATION MARK
    (0x94, "\""),   // RIGHT DOUBLE QUOTATION MARK
    (0x95, "."),    // BULLET
    (0x96, "-"),    // EN DASH
    (0x97, "--"),   // EM DASH
    (0x98, "~"),    // SMALL TILDE
    (0x99, "(tm)"), // TRADE MARK SIGN
    (0x9A, "s"),    // LATIN SMALL LETTER S WITH CARON
    (0x9B, ">"),    // SINGLE RIGHT-POINTING ANGLE QUOTATION MARK
    (0x9C, "o"),    // LATIN SMALL LIGATURE OE
    (0x9E, "z"),    // LATIN SMALL LETTER Z WITH CARON
    (0x9F, "y"),    // LATIN CAPITAL LETTER Y WITH DIAERESIS
    (0xA0, " "),    // NO-BREAK SPACE
    (0xA1, "!"),    // INVERTED EXCLAMATION MARK
    (0xA2, "c"),    // CENT SIGN
    (0xA3, "L"),    // POUND SIGN
    (0xA4, "$"),    // CURRENCY SIGN
    (0xA5, "Y"),    // YEN SIGN
    (0xA6, "|"),    // BROKEN BAR
    (0xA7, "SS"),   // SECTION SIGN
    (0xA8, ""),     // DIAERESIS
    (0xA9, "(c)"),  // COPYRIGHT SIGN
    (0xAA, "^a"),   // FEMININE ORDINAL INDICATOR
    (0xAB, "<<"),   // LEFT-POINTING DOUBLE ANGLE QUOTATION MARK
    (0xAC, "!"),    // NOT SIGN
    (0xAD, "-"),    // SOFT HYPHEN
    (0xAE, "(reg)"), // REGISTERED SIGN
    (0xAF, ""),     // MACRON
    (0xB0, "^o"),   // DEGREE SIGN
    (0xB1, "+/-"),  // PLUS-MINUS SIGN
    (0xB2, "^2"),   // SUPERSCRIPT TWO
    (0xB3, "^3"),   // SUPERSCRIPT THREE
    (0xB4, ""),     // ACUTE ACCENT
    (0xB5, "m"),    // MICRO SIGN
    (0xB6, "PP"),   // PILCROW SIGN
    (0xB7, "."),    // MIDDLE DOT
    (0xB8, ""),     // CEDILLA
    (0xB9, "^1"),   // SUPERSCRIPT ONE
    (0xBA, "^o"),   // MASCULINE ORDINAL INDICATOR
    (0xBB, ">>"),   // RIGHT-POINTING DOUBLE ANGLE QUOTATION MARK
    (0xBC, "1/4"),  // VULGAR FRACTION ONE QUARTER
    (0xBD, "1/2"),  // VULGAR FRACTION ONE HALF
    (0xBE, "3/4"),  // VULGAR FRACTION THREE QUARTERS
    (0xBF, "?"),    // INVERTED QUESTION MARK
    (0xC0, "A"),    // LATIN CAPITAL LETTER A WITH GRAVE
    (0xC1, "A"),    // LATIN CAPITAL LETTER A WITH ACUTE
    (0xC2, "A"),    // LATIN CAPITAL LETTER A WITH CIRCUMFLEX
    (0xC3, "A"),    // LATIN CAPITAL LETTER A WITH TILDE
    (0xC4, "A"),    // LATIN CAPITAL LETTER A WITH DIAERESIS
    (0xC5, "A"),    // LATIN CAPITAL LETTER A WITH RING ABOVE
    (0xC6, "A"),    // LATIN CAPITAL LETTER AE
    (0xC7, "C"),    // LATIN CAPITAL LETTER C WITH CEDILLA
    (0xC8, "E"),    // LATIN CAPITAL LETTER E WITH GRAVE
    (0xC9, "E"),    // LATIN CAPITAL LETTER E WITH ACUTE
    (0xCA, "E"),    // LATIN CAPITAL LETTER E WITH CIRCUMFLEX
    (0xCB, "E"),    // LATIN CAPITAL LETTER E WITH DIAERESIS
    (0xCC, "I"),    // LATIN CAPITAL LETTER I WITH GRAVE
    (0xCD, "I"),    // LATIN CAPITAL LETTER I WITH ACUTE
    (0xCE, "I"),    // LATIN CAPITAL LETTER I WITH CIRCUMFLEX
    (0xCF, "I"),    // LATIN CAPITAL LETTER I WITH DIAERESIS
    (0xD0, "I"),    // LATIN CAPITAL LETTER ETH
    (0xD1, "N"),    // LATIN CAPITAL LETTER N WITH TILDE
    (0xD2, "O"),    // LATIN CAPITAL LETTER O WITH GRAVE
    (0xD3, "O"),    // LATIN CAPITAL LETTER O WITH ACUTE
    (0xD4, "O"),    // LATIN CAPITAL LETTER O WITH CIRCUMFLEX
    (0xD5, "O"),    // LATIN CAPITAL LETTER O WITH TILDE
    (0xD6, "O"),    // LATIN CAPITAL LETTER O WITH DIAERESIS
    (0xD7, "(x)"),  // MULTIPLICATION SIGN
    (0xD8, "O"),    // LATIN CAPITAL LETTER O WITH STROKE
    (0xD9, "U"),    // LATIN CAPITAL LETTER U WITH GRAVE
    (0xDA, "U"),    // LATIN CAPITAL LETTER U WITH ACUTE
    (0xDB, "U"),    // LATIN CAPITAL LETTER U WITH CIRCUMFLEX
    (0xDC, "U"),    // LATIN CAPITAL LETTER U WITH DIAERESIS
    (0xDD, "Y"),    // LATIN CAPITAL LETTER Y WITH ACUTE
    (0xDE, "TH"),   // LATIN CAPITAL LETTER THORN
    (0xDF, "s"),    // LATIN SMALL LETTER SHARP S
    (0xE0, "a"),    // LATIN SMALL LETTER A WITH GRAVE
    (0xE1, "a"),    // LATIN SMALL LETTER A WITH ACUTE
    (0xE2, "a"),    // LATIN SMALL LETTER A WITH CIRCUMFLEX
    (0xE3, "a"),    // LATIN SMALL LETTER A WITH TILDE
    (0xE4, "a"),    // LATIN SMALL LETTER A WITH DIAERESIS
    (0xE5, "a"),    // LATIN SMALL LETTER A WITH RING ABOVE
    (0xE6, "a"),    // LATIN SMALL LETTER AE
    (0xE7, "c"),    // LATIN SMALL LETTER C WITH CEDILLA
    (0xE8, "e"),    // LATIN SMALL LETTER E WITH GRAVE
    (0xE9, "e"),    // LATIN SMALL LETTER E WITH ACUTE
    (0xEA, "e"),    // LATIN SMALL LETTER E WITH CIRCUMFLEX
    (0xEB, "e"),    // LATIN SMALL LETTER E WITH DIAERESIS
    (0xEC, "i"),    // LATIN SMALL LETTER I WITH GRAVE
    (0xED, "i"),    // LATIN SMALL LETTER I WITH ACUTE
    (0xEE, "i"),    // LATIN SMALL LETTER I WITH CIRCUMFLEX
    (0xEF, "i"),    // LATIN SMALL LETTER I WITH DIAERESIS
    (0xF0, "eth"),  // LATIN SMALL LETTER ETH
    (0xF1, "n"),    // LATIN SMALL LETTER N WITH TILDE
    (0xF2, "o"),    // LATIN SMALL LETTER O WITH GRAVE
    (0xF3, "o"),    // LATIN SMALL LETTER O WITH ACUTE
    (0xF4, "o"),    // LATIN SMALL LETTER O WITH CIRCUMFLEX
    (0xF5, "o"),    // LATIN SMALL LETTER O WITH TILDE
    (0xF6, "o"),    // LATIN SMALL LETTER O WITH DIAERESIS
    (0xF7, "/"),    // DIVISION SIGN
    (0xF8, "o"),    // LATIN SMALL LETTER O WITH STROKE
    (0xF9, "u"),    // LATIN SMALL LETTER U WITH GRAVE
    (0xFA, "u"),    // LATIN SMALL LETTER U WITH ACUTE
    (0xFB, "u"),    // LATIN SMALL LETTER U WITH CIRCUMFLEX
    (0xFC, "u"),    // LATIN SMALL LETTER U WITH DIAERESIS
    (0xFD, "y"),    // LATIN SMALL LETTER Y WITH ACUTE
    (0xFE, "th"),   // LATIN SMALL LETTER THORN
    (0xFF, "y"),    // LATIN SMALL LETTER Y WITH DIAERESIS
];

/// General punctuation block (U+2000..U+206F).
const PUNCT_MAP: &[(u32, &str)] = &[
    (0x2000, " "),   // EN QUAD
    (0x2001, " "),   // EM QUAD
    (0x2002, " "),   // EN SPACE
    (0x2003, " "),   // EM SPACE
    (0x2004, " "),   // THREE-PER-EM SPACE
    (0x2005, " "),   // FOUR-PER-EM SPACE
    (0x2006, " "),   // SIX-PER-EM SPACE
    (0x2007, " "),   // FIGURE SPACE
    (0x2008, " "),   // PUNCTUATION SPACE
    (0x2009, " "),   // THIN SPACE
    (0x200A, " "),   // HAIR SPACE
    (0x200B, " "),   // ZERO WIDTH SPACE
    (0x200C, " "),   // ZERO WIDTH NON-JOINER
    (0x200D, " "),   // ZERO WIDTH JOINER
    (0x200E, "->"),  // LEFT-TO-RIGHT MARK
    (0x200F, "<-"),  // RIGHT-TO-LEFT MARK
    (0x2010, "-"),   // HYPHEN
    (0x2011, "-"),   // NON-BREAKING HYPHEN
    (0x2012, "-"),   // FIGURE DASH
    (0x2013, "-"),   // EN DASH
    (0x2014, "-"),   // EM DASH
    (0x2015, "-"),   // HORIZONTAL BAR
    (0x2016, "||"),  // DOUBLE VERTICAL LINE
    (0x2017, "--"),  // DOUBLE LOW LINE
    (0x2018, "'"),   // LEFT SINGLE QUOTATION MARK
    (0x2019, "'"),   // RIGHT SINGLE QUOTATION MARK
    (0x201A, "'"),   // SINGLE LOW-9 QUOTATION MARK
    (0x201B, "'"),   // SINGLE HIGH-REVERSED-9 QUOTATION MARK
    (0x201C, "\""),  // LEFT DOUBLE QUOTATION MARK
    (0x201D, "\""),  // RIGHT DOUBLE QUOTATION MARK
    (0x201E, "\""),  // DOUBLE LOW-9 QUOTATION MARK
    (0x201F, "\""),  // DOUBLE HIGH-REVERSED-9 QUOTATION MARK
    (0x2020, "(d)"), // DAGGER
    (0x2021, "(dd)"), // DOUBLE DAGGER
    (0x2022, "(.)"), // BULLET
    (0x2023, "(.)"), // TRIANGULAR BULLET
    (0x2024, "."),   // ONE DOT LEADER
    (0x2025, ".."),  // TWO DOT LEADER
    (0x2026, "..."), // HORIZONTAL ELLIPSIS
    (0x2027, ""),    // HYPHENATION POINT
    (0x2028, " "),   // LINE SEPARATOR
    (0x2029, " "),   // PARAGRAPH SEPARATOR
    (0x202A, " "),   // LEFT-TO-RIGHT EMBEDDING
    (0x202B, " "),   // RIGHT-TO-LEFT EMBEDDING
    (0x202C, " "),   // POP DIRECTIONAL FORMATTING
    (0x202D, " "),   // LEFT-TO-RIGHT OVERRIDE
    (0x202E, " "),   // RIGHT-TO-LEFT OVERRIDE
    (0x202F, " "),   // NARROW NO-BREAK SPACE
    (0x2030, "%%"),  // PER MILLE SIGN
    (0x2031, "%%%"), // PER TEN THOUSAND SIGN
    (0x2032, "'"),   // PRIME
    (0x2033, "''"),  // DOUBLE PRIME
    (0x2034, "'''"), // TRIPLE PRIME
    (0x2035, "'"),   // REVERSED PRIME
    (0x2036, "''"),  // REVERSED DOUBLE PRIME
    (0x2037, "'''"), // REVERSED TRIPLE PRIME
    (0x2038, ""),    // CARET
    (0x2039, "<"),   // SINGLE LEFT-POINTING ANGLE QUOTATION MARK
    (0x203A, ">"),   // SINGLE RIGHT-POINTING ANGLE QUOTATION MARK
    (0x203B, "(r)"), // REFERENCE MARK
    (0x203C, "!!"),  // DOUBLE EXCLAMATION MARK
    (0x203D, "!?"),  // INTERROBANG
    (0x203E, ""),    // OVERLINE
    (0x203F, ""),    // UNDERTIE
    (0x2040, ""),    // CHARACTER TIE
    (0x2041, ""),    // CARET INSERTION POINT
    (0x2042, "*"),   // ASTERISM
    (0x2043, "-"),   // HYPHEN BULLET
    (0x2044, "/"),   // FRACTION SLASH
    (0x2045, "["),   // LEFT SQUARE BRACKET WITH QUILL
    (0x2046, "]"),   // RIGHT SQUARE BRACKET WITH QUILL
    (0x2047, "??"),  // DOUBLE QUESTION MARK
    (0x2048, "?!"),  // QUESTION EXCLAMATION MARK
    (0x2049, "!?"),  // EXCLAMATION QUESTION MARK
    (0x204A, "(t)"), // TIRONIAN SIGN ET
    (0x204B, "(P)"), // REVERSED PILCROW SIGN
    (0x204C, ""),    // BLACK LEFTWARDS BULLET
    (0x204D, ""),    // BLACK RIGHTWARDS BULLET
    (0x204E, "*"),   // LOW ASTERISK
    (0x204F, ";"),   // REVERSED SEMICOLON
    (0x2050, ""),    // CLOSE UP
    (0x2051, "**"),  // TWO ASTERISKS ALIGNED VERTICALLY
    (0x2052, "-"),   // COMMERCIAL MINUS SIGN
    (0x2053, "-"),   // SWUNG DASH
    (0x2054, ""),    // INVERTED UNDERTIE
    (0x2055, ""),    // FLOWER PUNCTUATION MARK
    (0x2056, "..."), // THREE DOT PUNCTUATION
    (0x2057, "''''"), // QUADRUPLE PRIME
    (0x2058, "...."), // FOUR DOT PUNCTUATION
    (0x2059, "....."), // FIVE DOT PUNCTUATION
    (0x205A, ".."),  // TWO DOT PUNCTUATION
    (0x205B, "...."), // FOUR DOT MARK
    (0x205C, ""),    // DOTTED CROSS
    (0x205D, ":"),   // TRICOLON
    (0x205E, ":"),   // VERTICAL FOUR DOTS
    (0x205F, " "),   // MEDIUM MATHEMATICAL SPACE
    (0x2060, " "),   // WORD JOINER
    (0x2061, "(f)"), // FUNCTION APPLICATION
    (0x2062, " "),   // INVISIBLE TIMES
    (0x2063, " "),   // INVISIBLE SEPARATOR
    (0x2064, " "),   // INVISIBLE PLUS
    (0x2066, ""),    // LEFT-TO-RIGHT ISOLATE
    (0x2067, ""),    // RIGHT-TO-LEFT ISOLATE
    (0x2068, ""),    // FIRST STRONG ISOLATE
    (0x2069, ""),    // POP DIRECTIONAL ISOLATE
    (0x206A, ""),    // INHIBIT SYMMETRIC SWAPPING
    (0x206B, ""),    // ACTIVATE SYMMETRIC SWAPPING
    (0x206C, ""),    // INHIBIT ARABIC FORM SHAPING
    (0x206D, ""),    // ACTIVATE ARABIC FORM SHAPING
    (0x206E, ""),    // NATIONAL DIGIT SHAPES
    (0x206F, ""),    // NOMINAL DIGIT SHAPES
];

// Greek letters have no useful NFKD decomposition, so romanize them here.
const GREEK_MAP: &[(u32, &str)] = &[
    (912, "i"), (913, "A"), (914, "B"), (915, "G"), (916, "D"), (917, "E"),
    (918, "Z"), (919, "I"), (920, "TH"), (921, "I"), (922, "K"), (923, "L"),
    (924, "M"), (925, "N"), (926, "KS"), (927, "O"), (928, "P"), (929, "R"),
    (931, "S"), (932, "T"), (933, "Y"), (934, "F"), (936, "PS"), (937, "O"),
    (938, "I"), (939, "Y"), (940, "a"), (941, "e"), (943, "i"), (944, "y"),
    (945, "a"), (946, "b"), (947, "g"), (948, "d"), (949, "e"), (950, "z"),
    (951, "i"), (952, "th"), (953, "i"), (954, "k"), (955, "l"), (956, "m"),
    (957, "n"), (958, "ks"), (959, "o"), (960, "p"), (961, "r"), (962, "s"),
    (963, "s"), (964, "t"), (965, "y"), (966, "f"), (968, "ps"), (969, "o"),
    (970, "i"), (971, "y"), (972, "o"), (973, "y"),
];

// Codepoints that land in the 0x80..0x9F byte range of Windows-1252.
const CP1252_EXTRA: &[u32] = &[
    0x20AC, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030,
    0x0160, 0x2039, 0x0152, 0x017D, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022,
    0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x017E, 0x0178,
];

lazy_static! {
    static ref DEFAULT_MAPPING: HashMap<u32, &'static str> = {
        let mut map = HashMap::new();
        for &(cp, rep) in WIN_MAP.iter().chain(GREEK_MAP).chain(PUNCT_MAP) {
            map.insert(cp, rep);
        }
        map
    };
}

// User-supplied entries, merged over the defaults. Installed once per run.
static USER_MAPPING: OnceCell<HashMap<u32, String>> = OnceCell::new();

/// Install the supplementary substitution table for this run.
pub fn install_mapping(extra: HashMap<u32, String>) -> Result<(), &'static str> {
    USER_MAPPING.set(extra).map_err(|_| "mapping already installed")
}

fn lookup(cp: u32) -> Option<&'static str> {
    if let Some(extra) = USER_MAPPING.get() {
        if let Some(rep) = extra.get(&cp) {
            return Some(rep.as_str());
        }
    }
    DEFAULT_MAPPING.get(&cp).copied()
}

/// Target character repertoire for `fold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repertoire {
    /// Printable ASCII plus whitespace; everything else is substituted.
    Ascii,
    /// Windows-1252: ASCII, U+00A0..U+00FF and the 0x80..0x9F glyph block.
    Cp1252,
}

impl Repertoire {
    fn can_encode(self, ch: char) -> bool {
        match self {
            Repertoire::Ascii => ch.is_ascii(),
            Repertoire::Cp1252 => {
                ch.is_ascii()
                    || matches!(ch as u32, 0xA0..=0xFF)
                    || CP1252_EXTRA.contains(&(ch as u32))
            }
        }
    }
}

// Letters, digits, punctuation and whitespace below 128. Case is preserved.
fn allowed_ascii(ch: char) -> bool {
    ch.is_ascii_graphic() || ch.is_ascii_whitespace() || ch == '\x0b'
}

/// Rewrite `text` into the given repertoire.
///
/// Characters already inside the repertoire pass through untouched; the rest
/// go through the substitution tables, then NFKD decomposition with combining
/// marks stripped, and finally a hex escape for anything unmappable.
pub fn fold(text: &str, repertoire: Repertoire) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        fold_char(ch, repertoire, &mut out);
    }
    out
}

fn fold_char(ch: char, repertoire: Repertoire, out: &mut String) {
    if repertoire == Repertoire::Ascii && allowed_ascii(ch) {
        out.push(ch);
        return;
    }
    if repertoire.can_encode(ch) {
        out.push(ch);
        return;
    }

    let cp = ch as u32;
    if let Some(rep) = lookup(cp) {
        out.push_str(rep);
        return;
    }

    let decomposed: Vec<char> = ch.nfkd().collect();
    if decomposed.len() > 1 || decomposed.first() != Some(&ch) {
        // Keep only base characters the repertoire accepts.
        for d in decomposed {
            if !is_combining_mark(d) && allowed_ascii(d) {
                out.push(d);
            }
        }
        return;
    }

    // No decomposition, no mapping: hex escape beats silent data loss.
    out.push_str(&format!("0x{:x}", cp));
}
