use anyhow::{anyhow, Result};
use isolang::Language;

/// Language utilities for the narration language
///
/// The TTS service expects ISO 639-1 codes, optionally followed by a
/// region (`zh-CN`, `pt-BR`). Three-letter codes are accepted from
/// configuration and mapped down to their two-letter form.

// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn lookup(code: &str) -> Option<Language> {
    let code = code.trim().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == code)
                .map_or(code.as_str(), |(_, terminologic)| *terminologic);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Validate a narration language and return the code to send to the TTS service.
///
/// `ko` stays `ko`, `kor` becomes `ko`, `zh-cn` becomes `zh-CN`.
pub fn validate_tts_language(code: &str) -> Result<String> {
    let (primary, region) = match code.trim().split_once(['-', '_']) {
        Some((primary, region)) => (primary, Some(region)),
        None => (code.trim(), None),
    };

    let language = lookup(primary).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    let base = language
        .to_639_1()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Language has no two-letter code usable for speech: {}", code))?;

    match region {
        Some(region) if region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(format!("{}-{}", base, region.to_uppercase()))
        }
        Some(region) => Err(anyhow!("Invalid region '{}' in language code: {}", region, code)),
        None => Ok(base),
    }
}

/// Check if two language codes represent the same language (region ignored)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (validate_tts_language(code1), validate_tts_language(code2)) {
        (Ok(a), Ok(b)) => a.split('-').next() == b.split('-').next(),
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let primary = code.trim().split(['-', '_']).next().unwrap_or_default();
    let language = lookup(primary).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(language.to_name().to_string())
}
