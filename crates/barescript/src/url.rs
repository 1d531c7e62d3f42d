//! File-relative URL resolution for includes and fetches.

use std::sync::LazyLock;

use regex::Regex;

static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]+:").expect("static pattern"));
static ORIGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<origin>[a-z]+://[^/]*)(?<path>/.*)?$").expect("static pattern"));

/// Resolves `url` relative to the directory portion of `base`.
///
/// A URL with a scheme is absolute and passes through; one starting with
/// `/` is root-absolute and passes through. Anything else joins onto the
/// base directory and is POSIX-normalized: `.` and `..` segments collapse,
/// absolute bases never ascend above their root, and relative bases keep
/// leading `..` segments.
pub fn url_file_relative(base: &str, url: &str) -> String {
    if SCHEME.is_match(url) || url.starts_with('/') {
        return url.to_owned();
    }

    let (origin, base_path) = match ORIGIN.captures(base) {
        Some(found) => (
            found["origin"].to_owned(),
            found.name("path").map_or("/", |path| path.as_str()).to_owned(),
        ),
        None => (String::new(), base.to_owned()),
    };
    let directory = match base_path.rfind('/') {
        Some(slash) => &base_path[..=slash],
        None => "",
    };
    let absolute = !origin.is_empty() || directory.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in directory.split('/').chain(url.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_none_or(|last| *last == "..") {
                    // an absolute base refuses to ascend above its root
                    if !absolute {
                        segments.push("..");
                    }
                } else {
                    segments.pop();
                }
            }
            _ => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("{origin}/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn absolute_urls_pass_through() {
        assert_eq!(url_file_relative("dir/base.bare", "https://example.com/x.bare"), "https://example.com/x.bare");
        assert_eq!(url_file_relative("https://example.com/a/b.bare", "/x.bare"), "/x.bare");
    }

    #[test]
    fn relative_to_base_directory() {
        assert_eq!(url_file_relative("lib/util.bare", "helper.bare"), "lib/helper.bare");
        assert_eq!(url_file_relative("util.bare", "helper.bare"), "helper.bare");
        assert_eq!(
            url_file_relative("https://example.com/inc/util.bare", "helper.bare"),
            "https://example.com/inc/helper.bare"
        );
    }

    #[test]
    fn dot_segments_collapse() {
        assert_eq!(url_file_relative("a/b/c.bare", "./d/../e.bare"), "a/b/e.bare");
        assert_eq!(url_file_relative("a/b/c.bare", "../d.bare"), "a/d.bare");
    }

    #[test]
    fn absolute_bases_never_ascend_above_root() {
        assert_eq!(
            url_file_relative("https://example.com/a.bare", "../../x.bare"),
            "https://example.com/x.bare"
        );
        assert_eq!(url_file_relative("/a/b.bare", "../../../x.bare"), "/x.bare");
    }

    #[test]
    fn relative_bases_keep_leading_parent_segments() {
        assert_eq!(url_file_relative("a/b.bare", "../../x.bare"), "../x.bare");
        assert_eq!(url_file_relative("b.bare", "../x.bare"), "../x.bare");
    }

    #[test]
    fn prefix_base_with_trailing_slash() {
        assert_eq!(
            url_file_relative("https://example.com/include/", "lib.bare"),
            "https://example.com/include/lib.bare"
        );
    }
}
