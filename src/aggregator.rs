/// Alert aggregation: one alert per matched peatland per run.
///
/// Matched points are grouped by polygon identity; each group becomes a
/// single alert carrying the point count, the first matched point's
/// coordinates as the representative location (deterministic and
/// traceable to a concrete observation — intentionally not a centroid),
/// the polygon's region and district, and a wiki reference resolved
/// through the enrichment collaborator. Enrichment failures fall back to
/// the default wiki link and never block alert generation.

use std::collections::BTreeMap;

use crate::enrich::ReferenceLookup;
use crate::logging::{self, Component};
use crate::model::{Alert, MatchedPoint};

/// Reference link used when enrichment has no article for a peatland.
pub const DEFAULT_WIKI_URL: &str = "https://wiki.simargl-team.ru";

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Group matches into alerts, ordered by ascending polygon id.
pub fn generate_alerts(matches: &[MatchedPoint], lookup: &dyn ReferenceLookup) -> Vec<Alert> {
    if matches.is_empty() {
        logging::warn(Component::Alert, None, "no matches, no alerts generated");
        return Vec::new();
    }

    let mut groups: BTreeMap<i64, Vec<&MatchedPoint>> = BTreeMap::new();
    for m in matches {
        groups.entry(m.polygon_id).or_default().push(m);
    }

    let mut alerts = Vec::with_capacity(groups.len());

    for (uid, group) in groups {
        let count = group.len();
        let first = group[0];

        let name = format!("{} — {}", first.region, first.district);
        let name = name.trim_matches(|c| c == '—' || c == ' ').to_string();

        let wiki_url = lookup
            .lookup(uid)
            .unwrap_or_else(|| DEFAULT_WIKI_URL.to_string());
        let title = render_title(&wiki_url);

        let map_url = format!(
            "https://yandex.ru/maps/?ll={},{}&z=13",
            first.longitude, first.latitude
        );

        logging::info(
            Component::Alert,
            Some(&uid.to_string()),
            &format!("{} points -> {}", count, wiki_url),
        );

        alerts.push(Alert {
            id: uid,
            name,
            count,
            lat: first.latitude,
            lon: first.longitude,
            wiki_url,
            region: first.region.clone(),
            title,
            map_url,
        });
    }

    alerts
}

// ---------------------------------------------------------------------------
// Title rendering
// ---------------------------------------------------------------------------

/// Render a readable title from a wiki article URL.
///
/// The trailing path segment is percent-decoded and split on underscores.
/// When the last token is numeric the title becomes
/// `"<remaining text> (id <token>)"`; otherwise the decoded text is used
/// verbatim. Best-effort: malformed links yield whatever text is there,
/// never an error.
fn render_title(wiki_url: &str) -> String {
    let raw = wiki_url.rsplit('/').next().unwrap_or(wiki_url);
    let decoded = urlencoding::decode(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let parts: Vec<&str> = decoded.split('_').collect();
    match parts.last() {
        Some(last) if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) => {
            let text = parts[..parts.len() - 1].join(" ");
            format!("{} (id {})", text, last)
        }
        _ => decoded,
    }
}
