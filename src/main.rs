use bzip2::read::BzDecoder;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod charmap;
mod error;
mod hooks;
mod normalize;
mod opf;

use charmap::Repertoire;
use error::ConvertError;
use hooks::Hooks;

#[derive(Parser)]
#[command(name = "tab2opf-rust")]
#[command(about = "Convert a Stardict tab file into linked HTML fragments plus an OPF package")]
struct Args {
    /// Tab-delimited dictionary file (.tab or .tab.bz2)
    file: PathBuf,

    /// Log every key and output file as it is processed
    #[arg(short, long)]
    verbose: bool,

    /// Input is UTF-8: skip Windows-1252 folding and emit a UTF index
    #[arg(short, long)]
    utf: bool,

    /// Named getkey hook (identity, headword)
    #[arg(short, long)]
    getkey: Option<String>,

    /// Named getdef hook (identity, pos-tag)
    #[arg(short = 'd', long)]
    getdef: Option<String>,

    /// YAML file with extra character substitutions
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Source language tag
    #[arg(short, long, default_value = "en")]
    source: String,

    /// Target language tag
    #[arg(short, long, default_value = "en")]
    target: String,
}

/// One dictionary sense, ready for emission. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub display_term: String,
    pub rendered_definition: String,
    /// Whether the normalized term equals the lookup key verbatim. Used for
    /// ordering inside a key group, never for identity.
    pub exact_key_match: bool,
}

/// Outcome of parsing one input line.
#[derive(Debug)]
pub enum ParsedLine {
    Entry { key: String, entry: DictionaryEntry },
    Blank,
    Comment,
}

/// Canonical pre-hook key: ascii-folded, markup-escaped, lowercased.
fn escape_key(term: &str) -> String {
    charmap::fold(term, Repertoire::Ascii)
        .replace('"', "'")
        .replace('<', "\\<")
        .replace('>', "\\>")
        .to_lowercase()
        .trim()
        .to_string()
}

/// Escape a raw definition for the markup compiler: collapse doubled
/// backslashes, protect angle brackets, turn literal \n sequences into
/// line breaks.
fn escape_definition(definition: &str) -> String {
    definition
        .replace("\\\\", "\\")
        .replace('>', "\\>")
        .replace('<', "\\<")
        .replace("\\n", "<br/>\n")
}

/// Parse one input line into a keyed entry.
///
/// Blank lines and `#` comment lines are skipped. Everything else must carry
/// a tab between term and definition; a line that loses its key or its
/// definition along the way aborts the run.
pub fn parse_line(line: &str, hooks: &Hooks, utf: bool) -> Result<ParsedLine, ConvertError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(ParsedLine::Blank);
    }
    if trimmed.starts_with('#') {
        return Ok(ParsedLine::Comment);
    }

    let (term, definition) = line
        .split_once('\t')
        .ok_or_else(|| ConvertError::MissingDelimiter {
            line: line.to_string(),
        })?;

    let (term, definition) = if utf {
        (term.to_string(), definition.to_string())
    } else {
        (
            charmap::fold(term, Repertoire::Cp1252),
            charmap::fold(definition, Repertoire::Cp1252),
        )
    };
    let term = term.trim().to_string();

    let normalized = escape_key(&term);
    let key = (hooks.getkey)(&normalized).trim().to_string();
    if key.is_empty() {
        return Err(ConvertError::EmptyKey { term });
    }

    let definition = escape_definition(&definition);
    let rendered = (hooks.getdef)(&definition)
        .ok_or_else(|| ConvertError::MissingDelimiter {
            line: line.to_string(),
        })?
        .trim()
        .to_string();
    if rendered.is_empty() {
        return Err(ConvertError::EmptyDefinition { term });
    }

    let exact_key_match = key == normalized;
    Ok(ParsedLine::Entry {
        key,
        entry: DictionaryEntry {
            display_term: term,
            rendered_definition: rendered,
            exact_key_match,
        },
    })
}

#[derive(Default)]
struct Stats {
    lines_read: usize,
    entries: usize,
    blank_lines: usize,
    comment_lines: usize,
    keys: usize,
    pages: usize,
    elapsed: Duration,
}

fn print_stats(stats: &Stats) {
    println!();
    println!("============================================================");
    println!("Lines read: {}", stats.lines_read);
    println!("Entries: {}", stats.entries);
    println!("Distinct keys: {}", stats.keys);
    println!(
        "Avg entries/key: {:.2}",
        stats.entries as f64 / stats.keys.max(1) as f64
    );
    println!("Blank lines skipped: {}", stats.blank_lines);
    println!("Comment lines skipped: {}", stats.comment_lines);
    println!("Pages written: {}", stats.pages);
    println!(
        "Time: {}m {}s",
        stats.elapsed.as_secs() / 60,
        stats.elapsed.as_secs() % 60
    );
    println!(
        "Rate: {:.0} lines/sec",
        stats.lines_read as f64 / stats.elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("============================================================");
}

fn run(args: &Args) -> Result<(), ConvertError> {
    // Hook and mapping problems surface before any input is read.
    let hooks = Hooks::resolve(
        args.getkey.as_deref(),
        args.getdef.as_deref(),
        args.mapping.as_deref(),
    )?;

    let name = args
        .file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dictionary".to_string());

    println!("Reading {}", args.file.display());
    let file = File::open(&args.file)?;
    let reader: Box<dyn BufRead> = if args.file.to_string_lossy().ends_with(".bz2") {
        Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };

    let pb = if args.verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap(),
        );
        pb
    };

    let start = Instant::now();
    let mut stats = Stats::default();
    let mut groups: BTreeMap<String, Vec<DictionaryEntry>> = BTreeMap::new();

    for line in reader.lines() {
        let line = line?;
        stats.lines_read += 1;

        if !args.verbose && stats.lines_read % 1000 == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            let rate = stats.lines_read as f64 / elapsed;
            pb.set_message(format!(
                "Lines: {} | Entries: {} | Keys: {} | Rate: {:.0} ln/s",
                stats.lines_read,
                stats.entries,
                groups.len(),
                rate
            ));
        }

        match parse_line(&line, &hooks, args.utf)? {
            ParsedLine::Blank => stats.blank_lines += 1,
            ParsedLine::Comment => stats.comment_lines += 1,
            ParsedLine::Entry { key, entry } => {
                if args.verbose {
                    println!("{} : {}", key, entry.display_term);
                }
                stats.entries += 1;
                groups.entry(key).or_default().push(entry);
            }
        }
    }
    pb.finish_and_clear();
    stats.keys = groups.len();

    println!("Writing keys");
    stats.pages = opf::write_pages(&mut groups, &name, args.verbose)?;

    println!("Writing opf");
    opf::write_opf(
        &name,
        stats.pages,
        &args.source,
        &args.target,
        args.utf,
        args.verbose,
    )?;

    stats.elapsed = start.elapsed();
    print_stats(&stats);
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_hooks() -> Hooks {
        Hooks::resolve(None, None, None).unwrap()
    }

    // ─────────────────────────────────────────────────────────────
    // Line skipping
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn blank_lines_are_skipped() {
        assert!(matches!(
            parse_line("", &identity_hooks(), true).unwrap(),
            ParsedLine::Blank
        ));
        assert!(matches!(
            parse_line("   \t  ", &identity_hooks(), true).unwrap(),
            ParsedLine::Blank
        ));
    }

    #[test]
    fn comment_lines_are_skipped() {
        assert!(matches!(
            parse_line("# a comment", &identity_hooks(), true).unwrap(),
            ParsedLine::Comment
        ));
        assert!(matches!(
            parse_line("  # indented", &identity_hooks(), true).unwrap(),
            ParsedLine::Comment
        ));
    }

    #[test]
    fn line_without_tab_is_fatal() {
        let err = parse_line("no delimiter here", &identity_hooks(), true).unwrap_err();
        match err {
            ConvertError::MissingDelimiter { line } => {
                assert_eq!(line, "no delimiter here");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Keying and escaping
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn identity_key_is_folded_and_lowercased() {
        let parsed = parse_line("F\u{00FC}\u{00DF}e\tfeet", &identity_hooks(), true).unwrap();
        match parsed {
            ParsedLine::Entry { key, entry } => {
                assert_eq!(key, "fuse");
                assert_eq!(entry.display_term, "F\u{00FC}\u{00DF}e");
                assert!(entry.exact_key_match);
            }
            _ => panic!("expected an entry"),
        }
    }

    #[test]
    fn quotes_and_angle_brackets_are_escaped_in_keys() {
        let parsed = parse_line("a\"b <c>\tdef", &identity_hooks(), true).unwrap();
        match parsed {
            ParsedLine::Entry { key, .. } => assert_eq!(key, "a'b \\<c\\>"),
            _ => panic!("expected an entry"),
        }
    }

    #[test]
    fn definition_markup_is_escaped() {
        let parsed =
            parse_line("term\tfirst \\n second <x>", &identity_hooks(), true).unwrap();
        match parsed {
            ParsedLine::Entry { entry, .. } => {
                assert_eq!(entry.rendered_definition, "first <br/>\n second \\<x\\>");
            }
            _ => panic!("expected an entry"),
        }
    }

    #[test]
    fn legacy_mode_folds_display_text() {
        let parsed = parse_line("\u{2019}tis\tdef", &identity_hooks(), false).unwrap();
        match parsed {
            ParsedLine::Entry { entry, .. } => {
                // U+2019 is Windows-1252 encodable and survives folding.
                assert_eq!(entry.display_term, "\u{2019}tis");
            }
            _ => panic!("expected an entry"),
        }
    }

    #[test]
    fn term_with_no_key_content_is_fatal() {
        // HYPHENATION POINT substitutes to nothing, leaving an empty key.
        let err = parse_line("\u{2027}\tdef", &identity_hooks(), true).unwrap_err();
        assert!(matches!(err, ConvertError::EmptyKey { .. }));
    }

    #[test]
    fn empty_definition_is_fatal() {
        let err = parse_line("term\t   ", &identity_hooks(), true).unwrap_err();
        match err {
            ConvertError::EmptyDefinition { term } => assert_eq!(term, "term"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn pos_tag_hook_requires_its_delimiter() {
        let hooks = Hooks::resolve(None, Some("pos-tag"), None).unwrap();
        let err = parse_line("term\tgloss without tag", &hooks, true).unwrap_err();
        assert!(matches!(err, ConvertError::MissingDelimiter { .. }));
    }

    // ─────────────────────────────────────────────────────────────
    // Grouping and the full pipeline
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn synonyms_group_under_one_key() {
        let hooks = Hooks::resolve(Some("headword"), None, None).unwrap();
        let mut groups: BTreeMap<String, Vec<DictionaryEntry>> = BTreeMap::new();
        for line in ["die Schule\tschool", "in die Schule\tto school"] {
            match parse_line(line, &hooks, true).unwrap() {
                ParsedLine::Entry { key, entry } => {
                    groups.entry(key).or_default().push(entry)
                }
                _ => panic!("expected an entry"),
            }
        }
        assert_eq!(groups.len(), 1);
        let entries = groups.get_mut("schule").unwrap();
        assert_eq!(entries.len(), 2);

        let block = opf::render_group("schule", entries);
        assert_eq!(block.matches("<idx:entry ").count(), 2);
    }

    #[test]
    fn end_to_end_single_entry() {
        let hooks = Hooks::resolve(Some("headword"), Some("pos-tag"), None).unwrap();
        let parsed = parse_line("to run\tto move quickly\tverb", &hooks, true).unwrap();
        let (key, entry) = match parsed {
            ParsedLine::Entry { key, entry } => (key, entry),
            _ => panic!("expected an entry"),
        };
        assert_eq!(key, "run");
        assert_eq!(entry.display_term, "to run");
        assert_eq!(entry.rendered_definition, "(verb) to move quickly");
        assert!(!entry.exact_key_match);

        let mut group = vec![entry];
        let block = opf::render_group(&key, &mut group);
        assert!(block.contains("<idx:orth>to run</idx:orth>"));
        assert!(block.contains("key=\"run\""));
        assert!(block.contains("(verb) to move quickly"));

        let keys = vec![key];
        assert_eq!(opf::paginate(&keys, opf::PAGE_CAPACITY).len(), 1);

        let package = opf::build_opf("sample", 1, "en", "en", true);
        assert_eq!(package.matches("<item ").count(), 1);
        assert_eq!(package.matches("<itemref ").count(), 1);
    }
}
