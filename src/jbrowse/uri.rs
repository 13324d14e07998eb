use serde_json::Value;
use url::form_urlencoded::byte_serialize;

use crate::access::AccessTier;

/// Rewrites adapter `uri` fields so track bytes are fetched with a token.
#[derive(Debug, Clone)]
pub struct UriRewriter {
    site_prefix: String,
}

impl UriRewriter {
    /// `site_prefix` is the public path the site is mounted at, e.g. `/moop`.
    pub fn new(site_prefix: &str) -> Self {
        Self {
            site_prefix: site_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn tracks_route(&self) -> String {
        format!("{}/api/jbrowse2/tracks", self.site_prefix)
    }

    /// Walk an adapter config and rewrite every object carrying a non-empty
    /// `uri`. Objects with a `uri` are not descended into.
    pub fn add_token_to_adapter_urls(&self, adapter: &mut Value, token: &str, track_level: AccessTier) {
        match adapter {
            Value::Object(map) => map
                .values_mut()
                .for_each(|child| self.visit(child, token, track_level)),
            Value::Array(items) => items
                .iter_mut()
                .for_each(|child| self.visit(child, token, track_level)),
            _ => {}
        }
    }

    fn visit(&self, child: &mut Value, token: &str, track_level: AccessTier) {
        let uri = child
            .get("uri")
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
            .map(str::to_string);

        match uri {
            Some(uri) => {
                if let Some(rewritten) = self.rewrite_uri(&uri, token, track_level) {
                    child["uri"] = Value::String(rewritten);
                }
            }
            None => self.add_token_to_adapter_urls(child, token, track_level),
        }
    }

    /// `None` leaves the URI as it was.
    pub fn rewrite_uri(&self, uri: &str, token: &str, track_level: AccessTier) -> Option<String> {
        let encoded_token = encode(token);

        if is_external(uri) {
            // Public third-party data never sees our tokens
            if track_level == AccessTier::Public {
                return None;
            }
            return Some(append_param(uri, "token", &encoded_token));
        }

        let local_tracks = format!("{}/data/tracks/", self.site_prefix);
        if let Some(file) = uri.strip_prefix(&local_tracks).filter(|file| !file.is_empty()) {
            return Some(format!(
                "{}?file={}&token={}",
                self.tracks_route(),
                encode(file),
                encoded_token
            ));
        }

        if uri.starts_with(&format!("{}/", self.site_prefix)) {
            return Some(append_param(uri, "token", &encoded_token));
        }

        None
    }
}

fn is_external(uri: &str) -> bool {
    let lower = uri.get(..8).unwrap_or(uri).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("ftp://")
}

fn append_param(uri: &str, name: &str, encoded_value: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", uri, separator, name, encoded_value)
}

fn encode(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rewriter() -> UriRewriter {
        UriRewriter::new("/moop")
    }

    #[test]
    fn external_public_left_alone() {
        let r = rewriter();
        assert_eq!(r.rewrite_uri("https://hgdownload.soe.ucsc.edu/x.bb", "t", AccessTier::Public), None);
        assert_eq!(r.rewrite_uri("FTP://ftp.ensembl.org/x.gz", "t", AccessTier::Public), None);
    }

    #[test]
    fn external_protected_gets_token() {
        let r = rewriter();
        assert_eq!(
            r.rewrite_uri("https://tracks.example.org/a.bw", "abc", AccessTier::Collaborator).as_deref(),
            Some("https://tracks.example.org/a.bw?token=abc")
        );
        assert_eq!(
            r.rewrite_uri("http://tracks.example.org/a.bw?x=1", "abc", AccessTier::Admin).as_deref(),
            Some("http://tracks.example.org/a.bw?x=1&token=abc")
        );
    }

    #[test]
    fn local_tracks_routed_through_server() {
        let r = rewriter();
        assert_eq!(
            r.rewrite_uri("/moop/data/tracks/Org1/AsmA/bigwig/cov.bw", "a.b+c", AccessTier::Public).as_deref(),
            Some("/moop/api/jbrowse2/tracks?file=Org1%2FAsmA%2Fbigwig%2Fcov.bw&token=a.b%2Bc")
        );
    }

    #[test]
    fn other_site_paths_get_token_and_foreign_paths_do_not() {
        let r = rewriter();
        assert_eq!(
            r.rewrite_uri("/moop/data/genomes/Org1/ref.fa", "t", AccessTier::Public).as_deref(),
            Some("/moop/data/genomes/Org1/ref.fa?token=t")
        );
        assert_eq!(r.rewrite_uri("/var/www/data.bw", "t", AccessTier::Admin), None);
        assert_eq!(r.rewrite_uri("relative/data.bw", "t", AccessTier::Admin), None);
    }

    #[test]
    fn nested_adapters_rewritten() {
        let mut adapter = json!({
            "type": "BamAdapter",
            "bamLocation": {"uri": "/moop/data/tracks/Org1/AsmA/bam/r.bam", "locationType": "UriLocation"},
            "index": {"location": {"uri": "/moop/data/tracks/Org1/AsmA/bam/r.bam.bai"}},
            "sequenceAdapter": {"fastaLocation": {"uri": ""}},
            "subadapters": [{"uri": "https://public.example.org/p.bw"}]
        });
        rewriter().add_token_to_adapter_urls(&mut adapter, "tok", AccessTier::Public);

        assert_eq!(
            adapter["bamLocation"]["uri"],
            "/moop/api/jbrowse2/tracks?file=Org1%2FAsmA%2Fbam%2Fr.bam&token=tok"
        );
        assert_eq!(adapter["bamLocation"]["locationType"], "UriLocation");
        assert_eq!(
            adapter["index"]["location"]["uri"],
            "/moop/api/jbrowse2/tracks?file=Org1%2FAsmA%2Fbam%2Fr.bam.bai&token=tok"
        );
        assert_eq!(adapter["sequenceAdapter"]["fastaLocation"]["uri"], "");
        assert_eq!(adapter["subadapters"][0]["uri"], "https://public.example.org/p.bw");
        assert_eq!(adapter["type"], "BamAdapter");
    }
}
