use crate::shared::media::media_type::{MediaType, MediaTypeError};

const QUALITY: &str = "q";

/// Parses an `Accept`-style header into media types in client preference order.
///
/// Entries are ordered by descending quality; entries with equal quality keep
/// their header order. Entries with `q=0` are dropped. The `q` parameter is
/// stripped from the returned types.
pub fn parse_accept(header: &str) -> Result<Vec<MediaType>, MediaTypeError> {
    let mut weighted = Vec::new();
    for raw in header.split(',') {
        if raw.trim().is_empty() {
            continue;
        }
        let parsed: MediaType = raw.parse()?;
        let quality = parsed
            .parameter(QUALITY)
            .map(|q| match q.parse::<f32>() {
                Ok(weight) if weight.is_finite() && (0.0..=1.0).contains(&weight) => Ok(weight),
                _ => Err(MediaTypeError::MalformedParameter(format!("q={q}"))),
            })
            .transpose()?
            .unwrap_or(1.0);
        if quality <= 0.0 {
            continue;
        }
        weighted.push((quality, without_quality(parsed)));
    }
    // sort_by is stable, equal weights keep header order
    weighted.sort_by(|(a, _), (b, _)| b.total_cmp(a));
    Ok(weighted.into_iter().map(|(_, media_type)| media_type).collect())
}

fn without_quality(media_type: MediaType) -> MediaType {
    let mut stripped = media_type.essence();
    for (name, value) in media_type.parameters() {
        if name != QUALITY {
            stripped = stripped.with_parameter(name, value);
        }
    }
    stripped
}
