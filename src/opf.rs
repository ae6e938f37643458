//! Page-file and OPF package emission.
//!
//! Keys are written in ascending order, at most `PAGE_CAPACITY` per HTML
//! fragment file; the OPF lists every page in the manifest and references it
//! again in the spine, index-synchronized, so the downstream compiler sees a
//! complete, gap-free package.

use crate::DictionaryEntry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Keys per page file. The compiler chokes on oversized fragments long
/// before memory does.
pub const PAGE_CAPACITY: usize = 10_000;

const PAGE_HEAD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns:idx="www.mobipocket.com" xmlns:mbp="www.mobipocket.com" xmlns:xlink="http://www.w3.org/1999/xlink">
  <body>
    <mbp:pagebreak/>
    <mbp:frameset>
      <mbp:slave-frame display="bottom" device="all" breadth="auto" leftmargin="0" rightmargin="0" bottommargin="0" topmargin="0">
        <div align="center" bgcolor="yellow"/>
        <a onclick="index_search()">Dictionary Search</a>
        </div>
      </mbp:slave-frame>
      <mbp:pagebreak/>
"#;

const PAGE_FOOT: &str = r#"
    </mbp:frameset>
  </body>
</html>
"#;

/// Split sorted keys into pages of at most `capacity` keys.
///
/// An exact multiple of the capacity yields no trailing empty page; an empty
/// key set yields no pages at all.
pub fn paginate<T>(keys: &[T], capacity: usize) -> Vec<&[T]> {
    keys.chunks(capacity).collect()
}

fn entry_rank(entry: &DictionaryEntry) -> usize {
    if entry.exact_key_match {
        0
    } else {
        entry.display_term.chars().count()
    }
}

/// Render one key's entries as heading blocks.
///
/// Entries sort by (rank, term): exact key matches first, then shorter
/// display terms, ties lexicographic. Runs of equal display terms merge into
/// a single block with their definitions joined by "; ".
pub fn render_group(key: &str, entries: &mut [DictionaryEntry]) -> String {
    entries.sort_by(|a, b| {
        entry_rank(a)
            .cmp(&entry_rank(b))
            .then_with(|| a.display_term.cmp(&b.display_term))
    });

    let mut out = String::new();
    let mut start = 0;
    while start < entries.len() {
        let term = &entries[start].display_term;
        let mut end = start + 1;
        while end < entries.len() && entries[end].display_term == *term {
            end += 1;
        }
        let definitions: Vec<&str> = entries[start..end]
            .iter()
            .map(|e| e.rendered_definition.as_str())
            .collect();
        out.push_str(&format!(
            "      <idx:entry name=\"word\" scriptable=\"yes\">\n        \
             <h2>\n          \
             <idx:orth>{}</idx:orth><idx:key key=\"{}\">\n        \
             </h2>\n        \
             {}\n      \
             </idx:entry>\n      \
             <mbp:pagebreak/>\n",
            term,
            key,
            definitions.join("; "),
        ));
        start = end;
    }
    out
}

/// Write every page file. Returns the number of pages written.
pub fn write_pages(
    groups: &mut BTreeMap<String, Vec<DictionaryEntry>>,
    name: &str,
    verbose: bool,
) -> std::io::Result<usize> {
    let keys: Vec<String> = groups.keys().cloned().collect();
    let pages = paginate(&keys, PAGE_CAPACITY);

    for (index, page_keys) in pages.iter().enumerate() {
        let fname = format!("{}{}.html", name, index);
        if verbose {
            println!("Key file: {}", fname);
        }
        let mut writer = BufWriter::new(File::create(&fname)?);
        writer.write_all(PAGE_HEAD.as_bytes())?;
        for key in *page_keys {
            let entries = groups.get_mut(key).expect("key came from this map");
            writer.write_all(render_group(key, entries).as_bytes())?;
        }
        writer.write_all(PAGE_FOOT.as_bytes())?;
        writer.flush()?;
    }

    Ok(pages.len())
}

/// Assemble the OPF package document.
pub fn build_opf(name: &str, npages: usize, source: &str, target: &str, utf: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<?xml version=\"1.0\"?><!DOCTYPE package SYSTEM \"oeb1.ent\">\n\n\
         <!-- the command line instruction 'prcgen dictionary.opf' will produce the dictionary.prc file in the same folder-->\n\
         <!-- the command line instruction 'mobigen dictionary.opf' will produce the dictionary.mobi file in the same folder-->\n\n\
         <package unique-identifier=\"uid\" xmlns:dc=\"Dublin Core\">\n\n\
         <metadata>\n\
         \t<dc-metadata>\n\
         \t\t<dc:Identifier id=\"uid\">{name}</dc:Identifier>\n\
         \t\t<!-- Title of the document -->\n\
         \t\t<dc:Title><h2>{name}</h2></dc:Title>\n\
         \t\t<dc:Language>EN</dc:Language>\n\
         \t</dc-metadata>\n\
         \t<x-metadata>\n",
        name = name,
    ));
    if !utf {
        out.push_str("\t\t<output encoding=\"Windows-1252\" flatten-dynamic-dir=\"yes\"/>\n");
    }
    out.push_str(&format!(
        "\t\t<DictionaryInLanguage>{}</DictionaryInLanguage>\n\
         \t\t<DictionaryOutLanguage>{}</DictionaryOutLanguage>\n\
         \t</x-metadata>\n\
         </metadata>\n\n\
         <!-- list of all the files needed to produce the .prc file -->\n\
         <manifest>\n",
        source, target,
    ));
    for index in 0..npages {
        out.push_str(&format!(
            " <item id=\"dictionary{index}\" href=\"{name}{index}.html\" media-type=\"text/x-oeb1-document\"/>\n",
            index = index,
            name = name,
        ));
    }
    out.push_str(
        "</manifest>\n\n\n\
         <!-- list of the html files in the correct order  -->\n\
         <spine>\n",
    );
    for index in 0..npages {
        out.push_str(&format!("\t<itemref idref=\"dictionary{}\"/>\n", index));
    }
    out.push_str(
        "</spine>\n\n\
         <tours/>\n\
         <guide> <reference type=\"search\" title=\"Dictionary Search\" onclick= \"index_search()\"/> </guide>\n\
         </package>\n",
    );
    out
}

/// Write `<name>.opf` next to the page files.
pub fn write_opf(
    name: &str,
    npages: usize,
    source: &str,
    target: &str,
    utf: bool,
    verbose: bool,
) -> std::io::Result<()> {
    let fname = format!("{}.opf", name);
    if verbose {
        println!("Opf: {}", fname);
    }
    let mut writer = BufWriter::new(File::create(&fname)?);
    writer.write_all(build_opf(name, npages, source, target, utf).as_bytes())?;
    writer.flush()
}
