use std::cmp::Ordering;

/// The standard street-address abbreviation table.
pub const STANDARD_ABBREVIATIONS: &[(&str, &str)] = &[
    ("air force base", "afb"),
    ("apartment", "apt"),
    ("avenue", "ave"),
    ("basement", "bsmt"),
    ("boulevard", "blvd"),
    ("building", "bldg"),
    ("bypass", "byp"),
    ("center", "ctr"),
    ("circle", "cir"),
    ("court", "ct"),
    ("crescent", "cres"),
    ("crossing", "xing"),
    ("department", "dept"),
    ("drive", "dr"),
    ("east", "e"),
    ("expressway", "expy"),
    ("extension", "ext"),
    ("floor", "fl"),
    ("fort", "ft"),
    ("freeway", "fwy"),
    ("heights", "hts"),
    ("highway", "hwy"),
    ("hospital", "hosp"),
    ("institute", "inst"),
    ("international", "intl"),
    ("junction", "jct"),
    ("lake", "lk"),
    ("lakes", "lks"),
    ("lane", "ln"),
    ("meeting", "mtg"),
    ("memorial", "mem"),
    ("mount", "mt"),
    ("mountain", "mtn"),
    ("national", "nat"),
    ("naval air station", "nas"),
    ("north", "n"),
    ("northeast", "ne"),
    ("northwest", "nw"),
    ("parkway", "pky"),
    ("place", "pl"),
    ("point", "pt"),
    ("river", "riv"),
    ("road", "rd"),
    ("room", "rm"),
    ("rural route", "rr"),
    ("saint", "st"),
    ("south", "s"),
    ("southeast", "se"),
    ("southwest", "sw"),
    ("square", "sq"),
    ("station", "sta"),
    ("street", "st"),
    ("suite", "ste"),
    ("terminal", "term"),
    ("terrace", "ter"),
    ("trail", "trl"),
    ("trailer", "trlr"),
    ("turnpike", "tpk"),
    ("university", "univ"),
    ("west", "w"),
];

/// Canonicalizes free-form street addresses.
///
/// `normalize` lower-cases the input, drops every character outside
/// `[0-9a-z ]`, and replaces known long forms with their abbreviations.
/// A long form is replaced only as a whole token preceded by a space, so the
/// first word of an address is never abbreviated. Entries are applied
/// multi-word first, then longest first, then alphabetically.
///
/// With the standard table the result is idempotent:
/// `normalize(normalize(a)) == normalize(a)`.
#[derive(Clone, Debug)]
pub struct AddressNormalizer {
    entries: Vec<(String, String)>,
}

impl AddressNormalizer {
    /// Build a normalizer from `(long form, abbreviation)` pairs.
    ///
    /// Long forms are lower-cased and stripped the same way input is, and
    /// empty long forms are ignored.
    pub fn new<I, L, S>(table: I) -> Self
    where
        I: IntoIterator<Item = (L, S)>,
        L: AsRef<str>,
        S: AsRef<str>,
    {
        let mut entries: Vec<(String, String)> = table
            .into_iter()
            .map(|(long, short)| {
                (
                    strip(&long.as_ref().to_lowercase()).trim().to_string(),
                    strip(&short.as_ref().to_lowercase()),
                )
            })
            .filter(|(long, _)| !long.is_empty())
            .collect();
        entries.sort_by(|a, b| application_order(&a.0, &b.0));
        entries.dedup_by(|a, b| a.0 == b.0);
        Self { entries }
    }

    /// Entries in the order they are applied.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), s.as_str()))
    }

    pub fn normalize(&self, address: &str) -> String {
        let stripped = strip(&address.to_lowercase());
        let abbreviated = self
            .entries
            .iter()
            .fold(stripped, |text, (long, short)| replace_token(&text, long, short));
        strip(&abbreviated)
    }
}

impl Default for AddressNormalizer {
    fn default() -> Self {
        Self::new(STANDARD_ABBREVIATIONS.iter().copied())
    }
}

fn application_order(a: &str, b: &str) -> Ordering {
    let words = |s: &str| s.split(' ').filter(|w| !w.is_empty()).count();
    words(b)
        .cmp(&words(a))
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.cmp(b))
}

fn strip(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || *c == ' ')
        .collect()
}

/// Replace every ` long` followed by a space or end of text with ` short`.
/// The following space is left in place so adjacent tokens both match.
fn replace_token(text: &str, long: &str, short: &str) -> String {
    let needle = format!(" {long}");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];
        if after.is_empty() || after.starts_with(' ') {
            out.push_str(&rest[..pos]);
            out.push(' ');
            out.push_str(short);
            rest = after;
        } else {
            out.push_str(&rest[..=pos]);
            rest = &rest[pos + 1..];
        }
    }
    out.push_str(rest);
    out
}
