use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::info;

/// Effective architecture for images that should be synced for every platform
pub const ALL_ARCH: &str = "all";

const GLOBAL_PREFIX: &str = "ARCH:";
const ARCH_FLAG: &str = "--arch";

/// One image line from the issue, with its own `--arch` value if it had one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDirective {
    pub image: String,
    pub arch: Option<String>,
}

/// Source images keyed by effective architecture, in the order each key was first seen
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArchGroups(IndexMap<String, Vec<String>>);

impl ArchGroups {
    pub fn push(&mut self, arch: &str, image: String) {
        self.0.entry(arch.to_string()).or_default().push(image);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(arch, images)| (arch.as_str(), images.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedIssue {
    pub groups: ArchGroups,
    /// Image names as the issue wrote them, used for the final report only
    pub source_images: Vec<String>,
}

pub struct Parser;

impl Parser {
    /// Parse an issue body into architecture groups
    ///
    /// Precedence for each line: its own `--arch`, then a leading `ARCH:` line, then `all`.
    pub fn parse(body: &str) -> Result<ParsedIssue> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::Format("Issue body is empty.".to_string()));
        }

        let mut lines = body.lines().map(str::trim).peekable();

        let global_arch = match lines.peek().copied().and_then(Self::global_arch) {
            Some(arch) => {
                lines.next();
                info!("Found global ARCH directive: {arch}");
                Some(arch)
            }
            None => None,
        }
        .filter(|arch| !arch.is_empty());

        let mut parsed = ParsedIssue::default();

        for line in lines.filter(|line| !line.is_empty()) {
            let Some(directive) = Self::parse_line(line) else {
                info!("Skipping invalid line: {line}");
                continue;
            };

            let Some(image) = Self::strip_suffix(&directive.image) else {
                continue;
            };

            parsed.source_images.push(directive.image.clone());

            let arch = match (directive.arch.as_deref(), global_arch) {
                (Some(arch), _) => {
                    info!("Image '{image}' uses inline arch: {arch}");
                    arch
                }
                (None, Some(arch)) => {
                    info!("Image '{image}' uses global arch: {arch}");
                    arch
                }
                (None, None) => {
                    info!("Image '{image}' has no arch specified, will sync all architectures.");
                    ALL_ARCH
                }
            };

            parsed.groups.push(arch, image.to_string());
        }

        Ok(parsed)
    }

    /// Split a trimmed, non-empty line into its image name and optional `--arch` value
    pub fn parse_line(line: &str) -> Option<ImageDirective> {
        let (image, arch) = match Self::find_arch_flag(line) {
            Some(idx) => (&line[..idx], Some(line[idx + ARCH_FLAG.len()..].trim())),
            None if Self::dangling_arch_flag(line) => return None,
            None => (line, None),
        };

        Some(ImageDirective {
            image: image.trim().to_string(),
            arch: arch.filter(|arch| !arch.is_empty()).map(str::to_string),
        })
    }

    fn global_arch(line: &str) -> Option<&str> {
        let prefix = line.get(..GLOBAL_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(GLOBAL_PREFIX) {
            return None;
        }

        Some(line[GLOBAL_PREFIX.len()..].trim())
    }

    /// Byte offset of the first `--arch` that is followed by whitespace
    fn find_arch_flag(line: &str) -> Option<usize> {
        let lower = line.to_ascii_lowercase();
        let mut from = 0;

        while let Some(pos) = lower[from..].find(ARCH_FLAG) {
            let idx = from + pos;
            let rest = &line[idx + ARCH_FLAG.len()..];
            if rest.starts_with(char::is_whitespace) {
                return Some(idx);
            }
            from = idx + ARCH_FLAG.len();
        }

        None
    }

    fn dangling_arch_flag(line: &str) -> bool {
        line.to_ascii_lowercase()
            .strip_suffix(ARCH_FLAG)
            .is_some_and(|rest| rest.is_empty() || rest.ends_with(char::is_whitespace))
    }

    fn strip_suffix(image: &str) -> Option<&str> {
        let image = image
            .strip_suffix('/')
            .or_else(|| image.strip_suffix(':'))
            .unwrap_or(image);

        (!image.is_empty()).then_some(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn groups(parsed: &ParsedIssue) -> Vec<(&str, Vec<&str>)> {
        parsed
            .groups
            .iter()
            .map(|(arch, images)| (arch, images.iter().map(String::as_str).collect()))
            .collect()
    }

    mod public {
        use super::*;

        #[test]
        fn test_empty_body() {
            let error = Parser::parse("  \n\t\n ").unwrap_err();
            assert!(matches!(error, Error::Format(_)));
        }

        #[test]
        fn test_no_arch() -> Result<()> {
            let parsed = Parser::parse("docker.io/library/nginx\nredis\nghcr.io/org/app:v1\n")?;

            assert_eq!(
                groups(&parsed),
                vec![(
                    ALL_ARCH,
                    vec!["docker.io/library/nginx", "redis", "ghcr.io/org/app:v1"]
                )]
            );
            Ok(())
        }

        #[test]
        fn test_global_arch() -> Result<()> {
            let parsed = Parser::parse("ARCH: amd64,arm64\nnginx\nredis")?;

            assert_eq!(
                groups(&parsed),
                vec![("amd64,arm64", vec!["nginx", "redis"])]
            );
            assert_eq!(parsed.source_images, vec!["nginx", "redis"]);
            Ok(())
        }

        #[test]
        fn test_global_arch_case_insensitive() -> Result<()> {
            let parsed = Parser::parse("arch:arm64\nnginx")?;

            assert_eq!(groups(&parsed), vec![("arm64", vec!["nginx"])]);
            Ok(())
        }

        #[test]
        fn test_global_arch_only_on_first_line() -> Result<()> {
            let parsed = Parser::parse("nginx\nARCH: arm64\nredis")?;

            assert_eq!(
                groups(&parsed),
                vec![(ALL_ARCH, vec!["nginx", "ARCH: arm64", "redis"])]
            );
            Ok(())
        }

        #[test]
        fn test_global_arch_after_blank_lines() -> Result<()> {
            let parsed = Parser::parse("\n\n  ARCH: arm64\nredis")?;

            assert_eq!(groups(&parsed), vec![("arm64", vec!["redis"])]);
            Ok(())
        }

        #[test]
        fn test_empty_global_arch() -> Result<()> {
            let parsed = Parser::parse("ARCH:\nnginx")?;

            assert_eq!(groups(&parsed), vec![(ALL_ARCH, vec!["nginx"])]);
            Ok(())
        }

        #[test]
        fn test_only_global_arch() -> Result<()> {
            let parsed = Parser::parse("ARCH: amd64")?;

            assert!(parsed.groups.is_empty());
            assert!(parsed.source_images.is_empty());
            Ok(())
        }

        #[test]
        fn test_inline_overrides_global() -> Result<()> {
            let parsed = Parser::parse("ARCH: amd64\nfoo/bar\nbaz/qux --arch arm64,amd64\n")?;

            assert_eq!(
                groups(&parsed),
                vec![("amd64", vec!["foo/bar"]), ("arm64,amd64", vec!["baz/qux"])]
            );
            assert_eq!(parsed.source_images, vec!["foo/bar", "baz/qux"]);
            Ok(())
        }

        #[test]
        fn test_inline_without_global() -> Result<()> {
            let parsed = Parser::parse("nginx --arch arm64\nredis\nmysql --ARCH arm64")?;

            assert_eq!(
                groups(&parsed),
                vec![("arm64", vec!["nginx", "mysql"]), (ALL_ARCH, vec!["redis"])]
            );
            Ok(())
        }

        #[test]
        fn test_inline_arch_is_opaque() -> Result<()> {
            let parsed = Parser::parse("nginx --arch linux/amd64, linux/arm64:v8")?;

            assert_eq!(
                groups(&parsed),
                vec![("linux/amd64, linux/arm64:v8", vec!["nginx"])]
            );
            Ok(())
        }

        #[test]
        fn test_trailing_separator_stripped_once() -> Result<()> {
            let parsed = Parser::parse("nginx/\nredis:\nmysql//")?;

            assert_eq!(
                groups(&parsed),
                vec![(ALL_ARCH, vec!["nginx", "redis", "mysql/"])]
            );
            assert_eq!(parsed.source_images, vec!["nginx/", "redis:", "mysql//"]);
            Ok(())
        }

        #[test]
        fn test_empty_image_skipped() -> Result<()> {
            let parsed = Parser::parse("/\n--arch arm64\nnginx")?;

            assert_eq!(groups(&parsed), vec![(ALL_ARCH, vec!["nginx"])]);
            assert_eq!(parsed.source_images, vec!["nginx"]);
            Ok(())
        }

        #[test]
        fn test_duplicates_across_groups() -> Result<()> {
            let parsed = Parser::parse("nginx\nnginx --arch arm64\nnginx")?;

            assert_eq!(
                groups(&parsed),
                vec![(ALL_ARCH, vec!["nginx", "nginx"]), ("arm64", vec!["nginx"])]
            );
            assert_eq!(parsed.source_images.len(), 3);
            Ok(())
        }

        #[test]
        fn test_parse_line() {
            assert_eq!(
                Parser::parse_line("nginx:1.25 --arch arm64"),
                Some(ImageDirective {
                    image: "nginx:1.25".to_string(),
                    arch: Some("arm64".to_string()),
                })
            );
            assert_eq!(
                Parser::parse_line("nginx"),
                Some(ImageDirective {
                    image: "nginx".to_string(),
                    arch: None,
                })
            );
        }

        #[test]
        fn test_parse_line_flag_without_value() {
            assert_eq!(Parser::parse_line("nginx --arch"), None);
        }
    }

    mod private {
        use super::*;

        #[test]
        fn test_global_arch() {
            assert_eq!(Parser::global_arch("ARCH: amd64 "), Some("amd64"));
            assert_eq!(Parser::global_arch("Arch:amd64"), Some("amd64"));
            assert_eq!(Parser::global_arch("ARCH amd64"), None);
            assert_eq!(Parser::global_arch("ARC"), None);
        }

        #[test]
        fn test_find_arch_flag() {
            assert_eq!(Parser::find_arch_flag("nginx --arch arm64"), Some(6));
            assert_eq!(Parser::find_arch_flag("nginx--arch arm64"), Some(5));
            assert_eq!(Parser::find_arch_flag("my--archive --arch arm64"), Some(12));
            assert_eq!(Parser::find_arch_flag("nginx"), None);
        }

        #[test]
        fn test_dangling_arch_flag() {
            assert!(Parser::dangling_arch_flag("nginx --ARCH"));
            assert!(Parser::dangling_arch_flag("--arch"));
            assert!(!Parser::dangling_arch_flag("nginx--arch"));
            assert!(!Parser::dangling_arch_flag("nginx --arch arm64"));
        }

        #[test]
        fn test_strip_suffix() {
            assert_eq!(Parser::strip_suffix("nginx/"), Some("nginx"));
            assert_eq!(Parser::strip_suffix("nginx:"), Some("nginx"));
            assert_eq!(Parser::strip_suffix("nginx"), Some("nginx"));
            assert_eq!(Parser::strip_suffix(":"), None);
        }
    }
}
