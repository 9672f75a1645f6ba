//! MIME type negotiation helpers used by the [`Router`](super::Router).

use std::cmp::Ordering;

/// Lower-cased `type/subtype` of a `Content-Type` value, parameters stripped.
///
/// Returns `None` for empty or malformed values.
#[must_use]
pub fn media_type_essence(value: &str) -> Option<String> {
    let essence = value.split(';').next()?.trim();
    let (type_, subtype) = essence.split_once('/')?;
    let (type_, subtype) = (type_.trim(), subtype.trim());
    if type_.is_empty() || subtype.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}",
        type_.to_ascii_lowercase(),
        subtype.to_ascii_lowercase()
    ))
}

/// One entry of a parsed `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    pub type_: String,
    pub subtype: String,
    pub quality: f32,
}

impl AcceptEntry {
    fn matches(&self, type_: &str, subtype: &str) -> bool {
        (self.type_ == "*" || self.type_ == type_)
            && (self.subtype == "*" || self.subtype == subtype)
    }

    /// `type/subtype` beats `type/*` beats `*/*`.
    fn specificity(&self) -> u8 {
        let mut score = 0u8;
        if self.type_ != "*" {
            score += 2;
        }
        if self.subtype != "*" {
            score += 1;
        }
        score
    }
}

/// Parse an `Accept` header into entries sorted by quality, then specificity.
#[must_use]
pub fn parse_accept(header: &str) -> Vec<AcceptEntry> {
    let mut entries: Vec<AcceptEntry> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let essence = media_type_essence(pieces.next()?)?;
            let (type_, subtype) = essence.split_once('/')?;
            let quality = pieces
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);
            Some(AcceptEntry {
                type_: type_.to_string(),
                subtype: subtype.to_string(),
                quality,
            })
        })
        .collect();

    entries.sort_by(|a, b| match b.quality.partial_cmp(&a.quality) {
        Some(Ordering::Equal) | None => b.specificity().cmp(&a.specificity()),
        Some(ord) => ord,
    });
    entries
}

/// Quality the client assigns to `mime_type`: the most specific matching entry wins,
/// the higher q among equally specific ones.
#[must_use]
pub fn quality_for(accept: &[AcceptEntry], mime_type: &str) -> f32 {
    let Some((type_, subtype)) = mime_type.split_once('/') else {
        return 0.0;
    };
    accept
        .iter()
        .filter(|e| e.matches(type_, subtype))
        .max_by(|a, b| {
            a.specificity()
                .cmp(&b.specificity())
                .then(a.quality.partial_cmp(&b.quality).unwrap_or(Ordering::Equal))
        })
        .map(|e| e.quality)
        .unwrap_or(0.0)
}

/// Pick the candidate the client prefers.
///
/// Ties keep candidate order. Returns `None` when the header rules out every candidate.
#[must_use]
pub fn negotiate<'a>(accept_header: &str, candidates: &'a [String]) -> Option<&'a str> {
    let accept = parse_accept(accept_header);
    if accept.is_empty() {
        return candidates.first().map(String::as_str);
    }

    let mut best: Option<(&'a str, f32)> = None;
    for candidate in candidates {
        let q = quality_for(&accept, candidate);
        if q <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_q)) if best_q >= q => {}
            _ => best = Some((candidate.as_str(), q)),
        }
    }
    best.map(|(mime, _)| mime)
}
