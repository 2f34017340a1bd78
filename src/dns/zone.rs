use crate::dns::provider::DomainApi;
use crate::error::Error;
use log::debug;

/// A domain registered with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: u64,
    pub name: String,
}

/// Successively shorter suffixes of `domain`, most specific first, stopping
/// at the two-label registrable name: `a.b.example.com` gives
/// `a.b.example.com`, `b.example.com`, `example.com`.
pub fn candidate_names(domain: &str) -> Vec<String> {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Vec::new();
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return vec![domain];
    }
    (0..=labels.len() - 2)
        .map(|i| labels[i..].join("."))
        .collect()
}

/// Picks the first zone, in listing order, whose name is one of `candidates`.
///
/// Listing order wins over candidate specificity: with zones
/// `[example.com, sub.example.com]` a request for `sub.example.com`
/// resolves to `example.com`.
pub fn find_zone<'a>(
    zones: &'a [Zone],
    candidates: &[String],
    domain: &str,
) -> Result<&'a Zone, Error> {
    zones
        .iter()
        .find(|zone| {
            candidates
                .iter()
                .any(|candidate| zone.name.eq_ignore_ascii_case(candidate))
        })
        .ok_or_else(|| Error::ZoneNotFound(domain.to_string()))
}

/// Fetches the zone list and maps `domain` onto the zone that manages it.
pub async fn resolve_zone<A>(api: &A, domain: &str) -> Result<Zone, Error>
where
    A: DomainApi + ?Sized,
{
    let zones = api.list_zones().await?;
    let candidates = candidate_names(domain);
    let zone = find_zone(&zones, &candidates, domain)?;
    debug!("Resolved {} to zone {} (id {})", domain, zone.name, zone.id);
    Ok(zone.clone())
}

/// Hostname of `name` relative to `zone_name`; the zone apex is `""`.
pub fn relative_host(name: &str, zone_name: &str) -> String {
    let name = name.trim_end_matches('.');
    let zone_name = zone_name.trim_end_matches('.');

    if name.eq_ignore_ascii_case(zone_name) {
        return String::new();
    }

    let split = match name.len().checked_sub(zone_name.len()) {
        Some(split) if name.is_char_boundary(split) => split,
        _ => return name.to_string(),
    };
    let (head, tail) = name.split_at(split);
    if !zone_name.is_empty() && head.ends_with('.') && tail.eq_ignore_ascii_case(zone_name) {
        head.trim_end_matches('.').to_string()
    } else {
        name.to_string()
    }
}
