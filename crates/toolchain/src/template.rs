//! Artifact naming rules.
//!
//! Every tool publishes its artifacts under a slightly different naming
//! scheme. Instead of free-form text templates with embedded conditionals,
//! a tool describes its scheme as a [`Template`]: an ordered list of
//! [`Binding`]s (named variables computed from `(Condition, Outcome)` rules,
//! first match wins) followed by a final pattern such as
//! `{name}-{version_number}-{os}-{arch}.tar.gz`.
//!
//! Built-in variables are `os`, `arch`, `name`, `version`, `version_number`,
//! `owner` and `repo` (see [`TemplateInput`]). A binding may shadow a
//! built-in, and later bindings see the values of earlier ones.
//!
//! # Example
//!
//! ```
//! use toolchain::template::{Binding, Condition, Template};
//! use toolchain::{Platform, TemplateInput, ToolDescriptor};
//!
//! let template = Template::new("{name}{suffix}").bind(
//!     Binding::new("suffix")
//!         .when(Condition::has_prefix("os", "ming"), ".exe")
//!         .when(Condition::eq("os", "darwin"), "-darwin")
//!         .when(Condition::eq("arch", "aarch64"), "-arm64")
//!         .otherwise(""),
//! );
//!
//! let tool = ToolDescriptor::new("faas-cli", "openfaas", "faas-cli");
//! let input = TemplateInput::new(&tool, &Platform::new("darwin", "x86_64"), "0.16.0");
//! assert_eq!(template.render(&input).unwrap(), "faas-cli-darwin");
//! ```

use crate::archive::ArchiveKind;
use crate::error::{Error, Result};
use crate::types::{Platform, ResolvedArtifact, TemplateInput, ToolDescriptor};

/// A predicate over template variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Always matches.
    Always,
    /// Variable equals a value.
    Eq {
        /// Variable name.
        var: String,
        /// Expected value.
        value: String,
    },
    /// Variable starts with a prefix (used to match OS families).
    HasPrefix {
        /// Variable name.
        var: String,
        /// Required prefix.
        prefix: String,
    },
    /// Variable equals any of the values.
    OneOf {
        /// Variable name.
        var: String,
        /// Accepted values.
        values: Vec<String>,
    },
    /// Every condition matches.
    All(Vec<Condition>),
    /// At least one condition matches.
    Any(Vec<Condition>),
    /// The condition does not match.
    Not(Box<Condition>),
}

impl Condition {
    /// `var == value`.
    #[must_use]
    pub fn eq(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            var: var.into(),
            value: value.into(),
        }
    }

    /// `var` starts with `prefix`.
    #[must_use]
    pub fn has_prefix(var: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::HasPrefix {
            var: var.into(),
            prefix: prefix.into(),
        }
    }

    /// `var` is one of `values`.
    #[must_use]
    pub fn one_of(var: impl Into<String>, values: &[&str]) -> Self {
        Self::OneOf {
            var: var.into(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    /// All of `conditions` match.
    #[must_use]
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    /// Any of `conditions` matches.
    #[must_use]
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    /// Negation of `condition`.
    #[must_use]
    pub fn negate(condition: Condition) -> Self {
        Self::Not(Box::new(condition))
    }

    fn evaluate(&self, scope: &Scope<'_>) -> Result<bool> {
        Ok(match self {
            Self::Always => true,
            Self::Eq { var, value } => scope.lookup(var)? == value,
            Self::HasPrefix { var, prefix } => scope.lookup(var)?.starts_with(prefix.as_str()),
            Self::OneOf { var, values } => {
                let actual = scope.lookup(var)?;
                values.iter().any(|v| v == actual)
            }
            Self::All(conditions) => {
                for condition in conditions {
                    if !condition.evaluate(scope)? {
                        return Ok(false);
                    }
                }
                true
            }
            Self::Any(conditions) => {
                for condition in conditions {
                    if condition.evaluate(scope)? {
                        return Ok(true);
                    }
                }
                false
            }
            Self::Not(condition) => !condition.evaluate(scope)?,
        })
    }
}

/// What a matching rule produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A pattern rendered into the variable's value.
    Value(String),
    /// No artifact exists for this combination.
    Unsupported,
}

/// A named variable computed by ordered rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    name: String,
    rules: Vec<(Condition, Outcome)>,
    default: Option<Outcome>,
}

impl Binding {
    /// Create a binding with no rules.
    ///
    /// Without an explicit default the binding keeps the current value of a
    /// variable with the same name, or the empty string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            default: None,
        }
    }

    /// Add a rule producing `value` when `condition` matches.
    #[must_use]
    pub fn when(mut self, condition: Condition, value: impl Into<String>) -> Self {
        self.rules.push((condition, Outcome::Value(value.into())));
        self
    }

    /// Add a rule marking the combination unsupported.
    #[must_use]
    pub fn unsupported_when(mut self, condition: Condition) -> Self {
        self.rules.push((condition, Outcome::Unsupported));
        self
    }

    /// Value used when no rule matches.
    #[must_use]
    pub fn otherwise(mut self, value: impl Into<String>) -> Self {
        self.default = Some(Outcome::Value(value.into()));
        self
    }

    /// Treat every combination no rule matched as unsupported.
    #[must_use]
    pub fn otherwise_unsupported(mut self) -> Self {
        self.default = Some(Outcome::Unsupported);
        self
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, scope: &Scope<'_>) -> Result<Option<String>> {
        for (condition, outcome) in &self.rules {
            if condition.evaluate(scope)? {
                return outcome_value(outcome, scope);
            }
        }

        match &self.default {
            Some(outcome) => outcome_value(outcome, scope),
            None => Ok(Some(scope.get(&self.name).unwrap_or_default().to_string())),
        }
    }
}

fn outcome_value(outcome: &Outcome, scope: &Scope<'_>) -> Result<Option<String>> {
    match outcome {
        Outcome::Value(pattern) => expand(pattern, scope).map(Some),
        Outcome::Unsupported => Ok(None),
    }
}

/// Artifact naming rules for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    bindings: Vec<Binding>,
    pattern: String,
}

impl Template {
    /// Create a template from its final pattern.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            bindings: Vec::new(),
            pattern: pattern.into(),
        }
    }

    /// Append a binding, evaluated after the existing ones.
    #[must_use]
    pub fn bind(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// The final pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render the template.
    ///
    /// Returns an empty string when the combination is unsupported.
    /// Surrounding whitespace is trimmed from the result.
    ///
    /// # Errors
    ///
    /// Returns `Error::Template` for malformed patterns or unknown variables.
    pub fn render(&self, input: &TemplateInput) -> Result<String> {
        let mut scope = Scope {
            input,
            bound: Vec::with_capacity(self.bindings.len()),
        };

        for binding in &self.bindings {
            match binding.evaluate(&scope)? {
                Some(value) => scope.bound.push((binding.name.clone(), value)),
                None => {
                    log::debug!(
                        "{}: binding '{}' marks {}/{} unsupported",
                        input.name,
                        binding.name,
                        input.os,
                        input.arch
                    );
                    return Ok(String::new());
                }
            }
        }

        Ok(expand(&self.pattern, &scope)?.trim().to_string())
    }
}

/// Variables visible while rendering.
struct Scope<'a> {
    input: &'a TemplateInput,
    bound: Vec<(String, String)>,
}

impl Scope<'_> {
    fn get(&self, var: &str) -> Option<&str> {
        self.bound
            .iter()
            .rev()
            .find(|(name, _)| name == var)
            .map(|(_, value)| value.as_str())
            .or_else(|| self.input.get(var))
    }

    fn lookup(&self, var: &str) -> Result<&str> {
        self.get(var)
            .ok_or_else(|| Error::template(&self.input.name, format!("unknown variable '{var}'")))
    }
}

/// Substitute `{var}` placeholders. `{{` and `}}` are literal braces.
fn expand(pattern: &str, scope: &Scope<'_>) -> Result<String> {
    let tool = &scope.input.name;
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) if ch.is_ascii_alphanumeric() || ch == '_' => name.push(ch),
                        Some(ch) => {
                            return Err(Error::template(
                                tool,
                                format!("invalid character {ch:?} in placeholder in {pattern:?}"),
                            ));
                        }
                        None => {
                            return Err(Error::template(
                                tool,
                                format!("unclosed placeholder in {pattern:?}"),
                            ));
                        }
                    }
                }
                if name.is_empty() {
                    return Err(Error::template(tool, format!("empty placeholder in {pattern:?}")));
                }
                out.push_str(scope.lookup(&name)?);
            }
            '}' => {
                return Err(Error::template(tool, format!("unmatched '}}' in {pattern:?}")));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Render the download location of `tool` for a platform and version.
///
/// The full-URL template wins when both templates are set. A file-name
/// template is combined with the GitHub release download convention.
///
/// # Errors
///
/// - `Error::Resolution` if `version` is empty.
/// - `Error::Template` if the tool has no template or it is malformed.
/// - `Error::ArtifactNotFound` if the template renders nothing.
pub fn resolve(tool: &ToolDescriptor, platform: &Platform, version: &str) -> Result<ResolvedArtifact> {
    if version.trim().is_empty() {
        return Err(Error::resolution(
            format!("no version for {}; resolve the latest version first", tool.name),
            None,
        ));
    }

    let input = TemplateInput::new(tool, platform, version.trim());

    let url = match (&tool.url_template, &tool.binary_template) {
        (Some(template), _) => {
            let url = template.render(&input)?;
            if url.is_empty() {
                return Err(not_found(tool, platform));
            }
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::template(
                    &tool.name,
                    format!("rendered URL is not absolute: {url}"),
                ));
            }
            url
        }
        (None, Some(template)) => {
            let file = template.render(&input)?;
            if file.is_empty() {
                return Err(not_found(tool, platform));
            }
            format!(
                "https://github.com/{}/{}/releases/download/{}/{}",
                tool.owner, tool.repo, input.version, file
            )
        }
        (None, None) => {
            return Err(Error::template(
                &tool.name,
                "neither a URL template nor a binary template is set",
            ));
        }
    };

    let file_name = file_name_from_url(&url);
    let kind = if tool.no_extension {
        ArchiveKind::None
    } else {
        ArchiveKind::from_file_name(&file_name)
    };

    log::debug!("{} {} for {} -> {}", tool.name, input.version, platform, url);

    Ok(ResolvedArtifact {
        url,
        file_name,
        kind,
        binary_name: format!("{}{}", tool.binary_name(), platform.executable_suffix()),
        version: input.version,
    })
}

fn not_found(tool: &ToolDescriptor, platform: &Platform) -> Error {
    Error::ArtifactNotFound {
        tool: tool.name.clone(),
        os: platform.os.clone(),
        arch: platform.arch.clone(),
    }
}

/// Last path segment of a URL, without query string or fragment.
#[must_use]
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faas_cli() -> ToolDescriptor {
        ToolDescriptor::new("faas-cli", "openfaas", "faas-cli")
            .no_extension(true)
            .binary_template(
                Template::new("{name}{suffix}").bind(
                    Binding::new("suffix")
                        .when(Condition::has_prefix("os", "ming"), ".exe")
                        .when(Condition::eq("os", "darwin"), "-darwin")
                        .when(Condition::eq("arch", "armv6l"), "-armhf")
                        .when(Condition::eq("arch", "armv7l"), "-armhf")
                        .when(Condition::eq("arch", "aarch64"), "-arm64")
                        .otherwise(""),
                ),
            )
    }

    fn input(os: &str, arch: &str, version: &str) -> TemplateInput {
        TemplateInput::new(&faas_cli(), &Platform::new(os, arch), version)
    }

    #[test]
    fn test_binary_mode_darwin_fixture() {
        let artifact = resolve(&faas_cli(), &Platform::new("darwin", "x86_64"), "0.16.36").unwrap();
        assert_eq!(
            artifact.url,
            "https://github.com/openfaas/faas-cli/releases/download/0.16.36/faas-cli-darwin"
        );
        assert_eq!(artifact.file_name, "faas-cli-darwin");
        assert_eq!(artifact.kind, ArchiveKind::None);
        assert_eq!(artifact.binary_name, "faas-cli");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // darwin is checked before the arch rules, so darwin/aarch64 is -darwin
        let t = faas_cli().binary_template.unwrap();
        assert_eq!(t.render(&input("darwin", "aarch64", "1.0.0")).unwrap(), "faas-cli-darwin");
        assert_eq!(t.render(&input("linux", "aarch64", "1.0.0")).unwrap(), "faas-cli-arm64");
        assert_eq!(t.render(&input("linux", "armv7l", "1.0.0")).unwrap(), "faas-cli-armhf");
    }

    #[test]
    fn test_default_branch_fallback() {
        let artifact = resolve(&faas_cli(), &Platform::new("linux", "x86_64"), "0.16.36").unwrap();
        assert!(artifact.url.ends_with("/0.16.36/faas-cli"));
    }

    #[test]
    fn test_windows_family_prefix() {
        let artifact =
            resolve(&faas_cli(), &Platform::new("MINGW64_NT-10.0-18362", "x86_64"), "0.16.36")
                .unwrap();
        assert!(artifact.url.ends_with("/faas-cli.exe"));
        assert_eq!(artifact.binary_name, "faas-cli.exe");
    }

    #[test]
    fn test_url_mode_with_version_number() {
        let tool = ToolDescriptor::new("terraform", "hashicorp", "terraform").url_template(
            Template::new(
                "https://releases.hashicorp.com/{name}/{version_number}/{name}_{version_number}_{os}_{arch}.zip",
            )
            .bind(
                Binding::new("arch")
                    .when(Condition::eq("arch", "x86_64"), "amd64")
                    .when(Condition::one_of("arch", &["aarch64", "arm64"]), "arm64"),
            ),
        );

        let artifact = resolve(&tool, &Platform::new("linux", "aarch64"), "v1.8.5").unwrap();
        assert_eq!(
            artifact.url,
            "https://releases.hashicorp.com/terraform/1.8.5/terraform_1.8.5_linux_arm64.zip"
        );
        assert_eq!(artifact.kind, ArchiveKind::Zip);
        assert_eq!(artifact.version, "v1.8.5");
    }

    #[test]
    fn test_shadowing_binding_without_default_keeps_value() {
        let template = Template::new("{arch}")
            .bind(Binding::new("arch").when(Condition::eq("arch", "x86_64"), "amd64"));
        assert_eq!(template.render(&input("linux", "riscv64", "1")).unwrap(), "riscv64");
        assert_eq!(template.render(&input("linux", "x86_64", "1")).unwrap(), "amd64");
    }

    #[test]
    fn test_later_bindings_see_earlier_ones() {
        let template = Template::new("{name}-{target}")
            .bind(Binding::new("arch").when(Condition::eq("arch", "x86_64"), "amd64"))
            .bind(
                Binding::new("target")
                    .when(Condition::eq("arch", "amd64"), "{os}-{arch}")
                    .otherwise("other"),
            );
        assert_eq!(
            template.render(&input("linux", "x86_64", "1")).unwrap(),
            "faas-cli-linux-amd64"
        );
    }

    #[test]
    fn test_unsupported_renders_empty_and_resolves_not_found() {
        let tool = ToolDescriptor::new("arm-only", "acme", "arm-only").binary_template(
            Template::new("{name}-{arch}").bind(
                Binding::new("arch")
                    .unsupported_when(Condition::has_prefix("os", "ming"))
                    .when(Condition::eq("arch", "aarch64"), "arm64")
                    .otherwise_unsupported(),
            ),
        );

        let err = resolve(&tool, &Platform::new("mingw64_nt", "aarch64"), "1.0.0").unwrap_err();
        assert!(matches!(err, Error::ArtifactNotFound { .. }));
        assert!(err.is_not_found());

        let err = resolve(&tool, &Platform::new("linux", "x86_64"), "1.0.0").unwrap_err();
        assert!(matches!(err, Error::ArtifactNotFound { .. }));

        let ok = resolve(&tool, &Platform::new("linux", "aarch64"), "1.0.0").unwrap();
        assert!(ok.url.ends_with("/arm-only-arm64"));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let template = Template::new("\n   {name}{suffix}\n  ")
            .bind(Binding::new("suffix").otherwise("-linux"));
        assert_eq!(template.render(&input("linux", "x86_64", "1")).unwrap(), "faas-cli-linux");
    }

    #[test]
    fn test_whitespace_only_render_is_not_found() {
        let tool = ToolDescriptor::new("blank", "acme", "blank")
            .binary_template(Template::new("  {x}  ").bind(Binding::new("x").otherwise("")));
        let err = resolve(&tool, &Platform::new("linux", "x86_64"), "1.0.0").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unknown_variable_is_template_error() {
        let template = Template::new("{name}-{platform}");
        let err = template.render(&input("linux", "x86_64", "1")).unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
        assert!(err.to_string().contains("platform"));
    }

    #[test]
    fn test_unknown_variable_in_condition_is_template_error() {
        let template = Template::new("{name}")
            .bind(Binding::new("x").when(Condition::eq("missing", "y"), "z"));
        assert!(matches!(
            template.render(&input("linux", "x86_64", "1")),
            Err(Error::Template { .. })
        ));
    }

    #[test]
    fn test_malformed_patterns() {
        for bad in ["{name", "name}", "{}", "{na-me}"] {
            let err = Template::new(bad).render(&input("linux", "x86_64", "1")).unwrap_err();
            assert!(matches!(err, Error::Template { .. }), "pattern {bad:?}");
        }
    }

    #[test]
    fn test_brace_escapes() {
        let template = Template::new("{{{name}}}");
        assert_eq!(template.render(&input("linux", "x86_64", "1")).unwrap(), "{faas-cli}");
    }

    #[test]
    fn test_condition_combinators() {
        let template = Template::new("{v}").bind(
            Binding::new("v")
                .when(
                    Condition::all([
                        Condition::eq("os", "linux"),
                        Condition::negate(Condition::eq("arch", "x86_64")),
                    ]),
                    "linux-non-x86",
                )
                .when(
                    Condition::any([Condition::eq("os", "darwin"), Condition::Always]),
                    "fallback",
                ),
        );
        assert_eq!(template.render(&input("linux", "aarch64", "1")).unwrap(), "linux-non-x86");
        assert_eq!(template.render(&input("linux", "x86_64", "1")).unwrap(), "fallback");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let tool = faas_cli();
        let platform = Platform::new("linux", "armv7l");
        let first = resolve(&tool, &platform, "0.16.36").unwrap();
        let second = resolve(&tool, &platform, "0.16.36").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_version_is_rejected() {
        let err = resolve(&faas_cli(), &Platform::new("linux", "x86_64"), "").unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[test]
    fn test_no_template_fails_fast() {
        let tool = ToolDescriptor::new("bare", "acme", "bare");
        let err = resolve(&tool, &Platform::new("linux", "x86_64"), "1.0.0").unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
    }

    #[test]
    fn test_url_template_wins_over_binary_template() {
        let tool = ToolDescriptor::new("both", "acme", "both")
            .binary_template(Template::new("{name}-from-binary"))
            .url_template(Template::new("https://cdn.example.com/{version}/{name}.tgz"));
        let artifact = resolve(&tool, &Platform::new("linux", "x86_64"), "2.0.0").unwrap();
        assert_eq!(artifact.url, "https://cdn.example.com/2.0.0/both.tgz");
        assert_eq!(artifact.kind, ArchiveKind::TarGz);
    }

    #[test]
    fn test_relative_url_template_is_rejected() {
        let tool = ToolDescriptor::new("rel", "acme", "rel")
            .url_template(Template::new("cdn.example.com/{name}"));
        let err = resolve(&tool, &Platform::new("linux", "x86_64"), "1").unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("https://x.io/a/b/tool.tar.gz"), "tool.tar.gz");
        assert_eq!(file_name_from_url("https://x.io/a/tool.zip?raw=1#frag"), "tool.zip");
        assert_eq!(file_name_from_url("https://x.io/a/tool/"), "tool");
    }
}
