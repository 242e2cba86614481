//! Surface Corrections
//!
//! Textual clean-up applied to a command line before lexing: common
//! typos, absolute utility paths, typographic quotes and dashes, and
//! shell prompt characters.

use regex_lite::Regex;

lazy_static::lazy_static! {
    static ref TRUNCATED_PRINT: Regex = Regex::new(r"-prin($| )").unwrap();
    static ref PROMPT: Regex = Regex::new(r"^[$#] ").unwrap();
    static ref PROMPT_FIND: Regex = Regex::new(r"^[$#]find ").unwrap();
}

/// Literal replacements, applied in order
const REPLACEMENTS: &[(&str, &str)] = &[
    ("/usr/bin/find", "find"),
    ("/bin/find", "find"),
    ("/usr/bin/grep", "grep"),
    ("/bin/rm", "rm"),
    ("/bin/mv", "mv"),
    ("/bin/echo", "echo"),
    ("'{}'", "{}"),
    ("\"{}\"", "{}"),
    ("-i{}", "-I {}"),
    ("-I{}", "-I {}"),
    ("-i%", "-I %"),
    (" [] ", " {} "),
    ("-mitime", "-mtime"),
    ("-regex-type", "-regextype"),
    (" ( ", " \\( "),
    (" ) ", " \\) "),
    ("-\\(", "\\("),
    ("-\\)", "\\)"),
    ("-\\!", "!"),
    ("\u{2014} ", "-"),
    ("\u{2013}", "-"),
    ("\u{2014}", "-"),
    ("\u{201c}", "\""),
    ("\u{201d}", "\""),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("- perm", "-perm"),
];

/// Normalize the surface form of a command line
pub fn correct_errors_and_normalize_surface(cmd: &str) -> String {
    let mut cmd = cmd.replace('\n', " ");
    cmd = remove_sudo(&cmd);
    for (from, to) in REPLACEMENTS {
        cmd = cmd.replace(from, to);
    }
    cmd = TRUNCATED_PRINT.replace_all(&cmd, "-print$1").into_owned();
    if PROMPT_FIND.is_match(&cmd) {
        cmd = PROMPT_FIND.replace(&cmd, "find ").into_owned();
    } else {
        cmd = PROMPT.replace(&cmd, "").into_owned();
    }
    cmd.trim().to_string()
}

/// Drop `sudo` when it is used as a command word
fn remove_sudo(cmd: &str) -> String {
    cmd.split(' ')
        .filter(|w| *w != "sudo")
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_sudo_and_paths() {
        assert_eq!(
            correct_errors_and_normalize_surface("sudo /usr/bin/find . -name x"),
            "find . -name x"
        );
    }

    #[test]
    fn test_quoted_braces() {
        assert_eq!(
            correct_errors_and_normalize_surface("find . -exec rm '{}' \\;"),
            "find . -exec rm {} \\;"
        );
    }

    #[test]
    fn test_truncated_print() {
        assert_eq!(correct_errors_and_normalize_surface("find . -prin"), "find . -print");
        assert_eq!(
            correct_errors_and_normalize_surface("find . -prin | wc -l"),
            "find . -print | wc -l"
        );
    }

    #[test]
    fn test_prompt_characters() {
        assert_eq!(correct_errors_and_normalize_surface("$ ls -l"), "ls -l");
        assert_eq!(correct_errors_and_normalize_surface("#find ."), "find .");
    }

    #[test]
    fn test_typographic_characters() {
        assert_eq!(
            correct_errors_and_normalize_surface("grep \u{201c}foo\u{201d} a.txt"),
            "grep \"foo\" a.txt"
        );
    }

    #[test]
    fn test_unescaped_parentheses() {
        assert_eq!(
            correct_errors_and_normalize_surface("find . ( -name a -o -name b ) -print"),
            "find . \\( -name a -o -name b \\) -print"
        );
    }
}
