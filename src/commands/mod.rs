pub mod get;
pub mod list;
pub mod update;

use toolchain::{Catalog, Error};

/// Releases page to point the user at when an artifact could not be found.
///
/// For a template miss the tool's own repository is used; for a 404 the
/// repository is read back from a GitHub download URL.
pub fn releases_link(catalog: &Catalog, err: &Error) -> Option<String> {
    match err {
        Error::ArtifactNotFound { tool, .. } => {
            catalog.get(tool).ok().map(toolchain::ToolDescriptor::releases_url)
        }
        Error::DownloadNotFound { url } => github_releases(url),
        _ => None,
    }
}

fn github_releases(url: &str) -> Option<String> {
    let rest = url.strip_prefix("https://github.com/")?;
    let mut parts = rest.split('/').filter(|p| !p.is_empty());
    let owner = parts.next()?;
    let repo = parts.next()?;
    Some(format!("https://github.com/{owner}/{repo}/releases"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_for_template_miss() {
        let err = Error::ArtifactNotFound {
            tool: "kind".to_string(),
            os: "freebsd".to_string(),
            arch: "riscv64".to_string(),
        };
        assert_eq!(
            releases_link(&Catalog::builtin(), &err).as_deref(),
            Some("https://github.com/kubernetes-sigs/kind/releases")
        );
    }

    #[test]
    fn test_link_for_download_404() {
        let err = Error::DownloadNotFound {
            url: "https://github.com/mikefarah/yq/releases/download/v9.9.9/yq_linux_amd64"
                .to_string(),
        };
        assert_eq!(
            releases_link(&Catalog::builtin(), &err).as_deref(),
            Some("https://github.com/mikefarah/yq/releases")
        );
    }

    #[test]
    fn test_no_link_off_github() {
        let err = Error::DownloadNotFound {
            url: "https://dl.k8s.io/release/v0.0.0/bin/linux/amd64/kubectl".to_string(),
        };
        assert_eq!(releases_link(&Catalog::builtin(), &err), None);
    }

    #[test]
    fn test_no_link_for_other_errors() {
        let err = Error::Config("bad".to_string());
        assert_eq!(releases_link(&Catalog::builtin(), &err), None);
    }
}
