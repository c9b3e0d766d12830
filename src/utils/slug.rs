use once_cell::sync::Lazy;
use regex::Regex;

pub const FALLBACK_FILE_NAME: &str = "Sanierungsplan.pdf";

pub fn slugify(input: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let lowercase = input
        .to_lowercase()
        .replace('ä', "ae")
        .replace('ö', "oe")
        .replace('ü', "ue")
        .replace('ß', "ss");
    let trimmed = lowercase.trim();
    let replaced = RE.replace_all(trimmed, "-");
    replaced.trim_matches('-').to_string()
}

/// Download name derived from the address; blank addresses get the fixed
/// fallback name.
pub fn document_file_name(address: &str) -> String {
    let slug = slugify(address);
    if slug.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        format!("sanierungsfahrplan-{}.pdf", slug)
    }
}
