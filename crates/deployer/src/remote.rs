//! Parsing of Git remote URLs into hosted-pages coordinates.

/// The parts of a remote URL the resolver cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    pub host: Option<String>,
    pub owner: Option<String>,
    pub repo: String,
}

/// Hosts whose pages are served from `https://<owner>.<pages-domain>/<repo>`
const PAGES_HOSTS: &[(&str, &str)] = &[("github.com", "github.io"), ("gitlab.com", "gitlab.io")];

/// Split a remote URL into host, owner and repository name.
///
/// Handles `https://host/owner/repo(.git)`, `ssh://user@host[:port]/owner/repo`,
/// scp-style `user@host:owner/repo(.git)` and plain paths.
pub fn parse_remote(url: &str) -> Option<RemoteUrl> {
    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let (host, path) = if let Some((_, rest)) = trimmed.split_once("://") {
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        (Some(host_of(authority)), path)
    } else if let Some((before, path)) = trimmed.split_once(':')
        && !before.contains('/')
        && !before.is_empty()
    {
        (Some(host_of(before)), path)
    } else {
        (None, trimmed)
    };

    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect();
    let repo = segments.last()?.to_string();
    let owner = segments
        .len()
        .checked_sub(2)
        .map(|index| segments[index].to_string());

    Some(RemoteUrl {
        host: host.filter(|h| !h.is_empty()),
        owner,
        repo,
    })
}

/// `user@host:port` → `host`
fn host_of(authority: &str) -> String {
    let without_user = authority.rsplit('@').next().unwrap_or(authority);
    without_user
        .split(':')
        .next()
        .unwrap_or(without_user)
        .to_lowercase()
}

/// Strip credentials from every URL in `text`.
///
/// `http(s)://user:token@host/...` loses its whole userinfo; other schemes
/// keep the user name and lose only a password. Text without URLs is
/// returned unchanged.
pub fn redact_credentials(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find("://") {
        let (head, tail) = rest.split_at(index + 3);
        out.push_str(head);

        let scheme_start = head[..index]
            .rfind(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
            .map_or(0, |i| i + 1);
        let scheme = head[scheme_start..index].to_ascii_lowercase();

        let authority_end = tail
            .find(|c: char| c == '/' || c.is_whitespace() || matches!(c, '\'' | '"' | '>'))
            .unwrap_or(tail.len());
        let authority = &tail[..authority_end];
        match authority.rsplit_once('@') {
            Some((userinfo, host)) => {
                if !matches!(scheme.as_str(), "http" | "https") {
                    let user = userinfo.split(':').next().unwrap_or_default();
                    out.push_str(user);
                    out.push('@');
                }
                out.push_str(host);
            }
            None => out.push_str(authority),
        }
        rest = &tail[authority_end..];
    }
    out.push_str(rest);
    out
}

/// Serialize a remote URL with [`redact_credentials`] applied
pub fn serialize_redacted<S>(url: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&redact_credentials(url))
}

/// Repository name of a remote URL (`.git` stripped)
pub fn repo_name(url: &str) -> Option<String> {
    parse_remote(url).map(|remote| remote.repo)
}

impl RemoteUrl {
    fn pages_domain(&self) -> Option<&'static str> {
        let host = self.host.as_deref()?;
        PAGES_HOSTS
            .iter()
            .find(|(git_host, _)| *git_host == host)
            .map(|(_, pages)| *pages)
    }

    /// `<owner>.github.io` style repositories are served from the domain root
    pub fn is_user_site(&self) -> bool {
        match (self.pages_domain(), &self.owner) {
            (Some(domain), Some(owner)) => {
                self.repo.eq_ignore_ascii_case(&format!("{}.{}", owner, domain))
            }
            _ => false,
        }
    }

    /// Hosted-pages URL for this repository, if the host serves pages
    pub fn pages_url(&self) -> Option<String> {
        let domain = self.pages_domain()?;
        let owner = self.owner.as_deref()?.to_lowercase();
        if self.is_user_site() {
            Some(format!("https://{}.{}", owner, domain))
        } else {
            Some(format!("https://{}.{}/{}", owner, domain, self.repo))
        }
    }

    /// Base URL the site is served under on its hosted-pages URL
    pub fn pages_base_url(&self) -> String {
        if self.is_user_site() {
            "/".to_string()
        } else {
            format!("/{}/", self.repo)
        }
    }
}

/// Deployment URL for a remote: its hosted-pages URL, else the raw remote URL
pub fn deployment_url(remote_url: &str) -> String {
    parse_remote(remote_url)
        .and_then(|remote| remote.pages_url())
        .unwrap_or_else(|| remote_url.trim().to_string())
}
