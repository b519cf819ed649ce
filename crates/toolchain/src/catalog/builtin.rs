//! Curated tool definitions.
//!
//! Rule order matters: the first matching rule wins, so the order below is
//! the order the upstream projects' naming schemes need. Changing it changes
//! which artifact is picked for ambiguous OS/arch combinations.

use crate::resolver::{NodeChannel, PlainText};
use crate::template::{Binding, Condition, Template};
use crate::types::ToolDescriptor;

/// Every built-in tool.
#[must_use]
pub fn tools() -> Vec<ToolDescriptor> {
    vec![
        faas_cli(),
        getkit(),
        gh(),
        go(),
        helm(),
        jq(),
        k9s(),
        kind(),
        kubectl(),
        kubectx(),
        node(),
        terraform(),
        yq(),
    ]
}

// =============================================================================
// Shared conditions
// =============================================================================

/// Windows family: Git Bash/MSYS report `MINGW64_NT-…`.
fn windows() -> Condition {
    Condition::any([Condition::has_prefix("os", "ming"), Condition::eq("os", "windows")])
}

fn darwin() -> Condition {
    Condition::eq("os", "darwin")
}

fn x86_64() -> Condition {
    Condition::one_of("arch", &["x86_64", "amd64"])
}

fn arm64() -> Condition {
    Condition::one_of("arch", &["aarch64", "arm64"])
}

fn armv7() -> Condition {
    Condition::one_of("arch", &["armv6l", "armv7l"])
}

fn i686() -> Condition {
    Condition::one_of("arch", &["i686", "i386", "x86"])
}

/// `os` as Go-style names: `windows`, `darwin`, `linux`.
fn go_os() -> Binding {
    Binding::new("os").when(windows(), "windows")
}

/// `arch` as Go-style names with the given 32-bit ARM spelling.
fn go_arch(arm: &str) -> Binding {
    Binding::new("arch")
        .when(x86_64(), "amd64")
        .when(arm64(), "arm64")
        .when(armv7(), arm)
        .when(i686(), "386")
}

/// `.zip` on Windows, `.tar.gz` elsewhere.
fn archive_ext() -> Binding {
    Binding::new("ext").when(windows(), "zip").otherwise("tar.gz")
}

fn exe_suffix() -> Binding {
    Binding::new("exe").when(windows(), ".exe").otherwise("")
}

// =============================================================================
// Tools
// =============================================================================

fn faas_cli() -> ToolDescriptor {
    ToolDescriptor::new("faas-cli", "openfaas", "faas-cli")
        .description("Official CLI for OpenFaaS")
        .no_extension(true)
        .binary_template(
            Template::new("{name}{suffix}").bind(
                Binding::new("suffix")
                    .when(windows(), ".exe")
                    .when(Condition::all([darwin(), arm64()]), "-darwin-arm64")
                    .when(darwin(), "-darwin")
                    .when(Condition::eq("arch", "armv6l"), "-armhf")
                    .when(Condition::eq("arch", "armv7l"), "-armhf")
                    .when(Condition::eq("arch", "aarch64"), "-arm64")
                    .otherwise(""),
            ),
        )
}

fn getkit() -> ToolDescriptor {
    ToolDescriptor::new("getkit", "getkit", "getkit")
        .description("Download CLI tools from their release pages")
        .no_extension(true)
        .binary_template(
            Template::new("{name}{suffix}").bind(
                Binding::new("suffix")
                    .when(windows(), ".exe")
                    .when(Condition::all([darwin(), arm64()]), "-darwin-arm64")
                    .when(darwin(), "-darwin")
                    .when(armv7(), "-armhf")
                    .when(arm64(), "-arm64")
                    .otherwise(""),
            ),
        )
}

fn gh() -> ToolDescriptor {
    ToolDescriptor::new("gh", "cli", "cli")
        .description("GitHub's official command line tool")
        .flat(true)
        .binary_template(
            Template::new("gh_{version_number}_{os}_{arch}.{ext}")
                .bind(Binding::new("ext").when(windows(), "zip").when(darwin(), "zip").otherwise("tar.gz"))
                .bind(Binding::new("os").when(windows(), "windows").when(darwin(), "macOS"))
                .bind(go_arch("armv6")),
        )
}

fn go() -> ToolDescriptor {
    ToolDescriptor::new("go", "golang", "go")
        .description("The Go programming language toolchain")
        .resolver(PlainText::go())
        .url_template(
            Template::new("https://go.dev/dl/go{version_number}.{os}-{arch}.{ext}")
                .bind(archive_ext())
                .bind(go_os())
                .bind(go_arch("armv6l")),
        )
}

fn helm() -> ToolDescriptor {
    ToolDescriptor::new("helm", "helm", "helm")
        .description("The Kubernetes package manager")
        .url_template(
            Template::new("https://get.helm.sh/helm-{version}-{os}-{arch}.{ext}")
                .bind(archive_ext())
                .bind(go_os())
                .bind(go_arch("arm")),
        )
}

fn jq() -> ToolDescriptor {
    ToolDescriptor::new("jq", "jqlang", "jq")
        .description("Command-line JSON processor")
        .no_extension(true)
        .binary_template(
            Template::new("jq-{os}-{arch}{exe}")
                .bind(exe_suffix())
                .bind(Binding::new("os").when(windows(), "windows").when(darwin(), "macos"))
                .bind(
                    Binding::new("arch")
                        .when(x86_64(), "amd64")
                        .when(arm64(), "arm64")
                        .when(armv7(), "armhf")
                        .when(i686(), "i386"),
                ),
        )
}

fn k9s() -> ToolDescriptor {
    ToolDescriptor::new("k9s", "derailed", "k9s")
        .description("Terminal UI to interact with Kubernetes clusters")
        .binary_template(
            Template::new("k9s_{os}_{arch}.{ext}")
                .bind(archive_ext())
                .bind(
                    Binding::new("os")
                        .when(windows(), "Windows")
                        .when(darwin(), "Darwin")
                        .when(Condition::eq("os", "linux"), "Linux"),
                )
                .bind(
                    Binding::new("arch")
                        .when(x86_64(), "amd64")
                        .when(arm64(), "arm64")
                        .when(armv7(), "armv7")
                        .unsupported_when(i686()),
                ),
        )
}

fn kind() -> ToolDescriptor {
    ToolDescriptor::new("kind", "kubernetes-sigs", "kind")
        .description("Run local Kubernetes clusters using Docker")
        .no_extension(true)
        .binary_template(
            Template::new("{name}-{os}-{arch}{exe}")
                .bind(exe_suffix())
                .bind(go_os())
                .bind(
                    Binding::new("arch")
                        .when(arm64(), "arm64")
                        .unsupported_when(armv7())
                        .otherwise("amd64"),
                ),
        )
}

fn kubectl() -> ToolDescriptor {
    ToolDescriptor::new("kubectl", "kubernetes", "kubernetes")
        .description("Run commands against Kubernetes clusters")
        .resolver(PlainText::kubernetes_stable())
        .url_template(
            Template::new("https://dl.k8s.io/release/{version}/bin/{os}/{arch}/kubectl{exe}")
                .bind(exe_suffix())
                .bind(go_os())
                .bind(
                    Binding::new("arch")
                        .when(x86_64(), "amd64")
                        .when(arm64(), "arm64")
                        .otherwise("arm"),
                ),
        )
}

fn kubectx() -> ToolDescriptor {
    ToolDescriptor::new("kubectx", "ahmetb", "kubectx")
        .description("Faster way to switch between clusters")
        .binary_template(
            Template::new("kubectx_{version}_{os}_{arch}.{ext}")
                .bind(archive_ext())
                .bind(go_os())
                .bind(
                    Binding::new("arch")
                        .when(x86_64(), "x86_64")
                        .when(arm64(), "arm64")
                        .when(armv7(), "armv7"),
                ),
        )
}

fn node() -> ToolDescriptor {
    ToolDescriptor::new("node", "nodejs", "node")
        .description("JavaScript runtime built on V8")
        .resolver(NodeChannel::default())
        .url_template(
            Template::new("https://nodejs.org/download/release/{version}/node-{version}-{os}-{arch}.{ext}")
                .bind(archive_ext())
                .bind(Binding::new("os").when(windows(), "win"))
                .bind(
                    Binding::new("arch")
                        .when(x86_64(), "x64")
                        .when(arm64(), "arm64")
                        .when(Condition::eq("arch", "armv7l"), "armv7l")
                        .otherwise_unsupported(),
                ),
        )
}

fn terraform() -> ToolDescriptor {
    ToolDescriptor::new("terraform", "hashicorp", "terraform")
        .description("Infrastructure as code from HashiCorp")
        .url_template(
            Template::new(
                "https://releases.hashicorp.com/terraform/{version_number}/terraform_{version_number}_{os}_{arch}.zip",
            )
            .bind(go_os())
            .bind(go_arch("arm")),
        )
}

fn yq() -> ToolDescriptor {
    ToolDescriptor::new("yq", "mikefarah", "yq")
        .description("Portable command-line YAML processor")
        .no_extension(true)
        .binary_template(
            Template::new("yq_{os}_{arch}{exe}")
                .bind(exe_suffix())
                .bind(go_os())
                .bind(go_arch("arm")),
        )
}
