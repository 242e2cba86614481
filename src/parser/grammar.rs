//! Utility Grammar Tables
//!
//! A small table of value-taking flags and the argument types they
//! expect, plus shape-based inference for positional arguments.

use std::collections::HashMap;

use regex_lite::Regex;

use crate::ast::ArgType;

/// (utility, flag, type of the flag's argument)
const FLAG_ARGUMENTS: &[(&str, &str, ArgType)] = &[
    // find
    ("find", "-name", ArgType::Regex),
    ("find", "-iname", ArgType::Regex),
    ("find", "-path", ArgType::Regex),
    ("find", "-ipath", ArgType::Regex),
    ("find", "-wholename", ArgType::Regex),
    ("find", "-iwholename", ArgType::Regex),
    ("find", "-regex", ArgType::Regex),
    ("find", "-iregex", ArgType::Regex),
    ("find", "-lname", ArgType::Regex),
    ("find", "-type", ArgType::Type),
    ("find", "-xtype", ArgType::Type),
    ("find", "-fstype", ArgType::Type),
    ("find", "-regextype", ArgType::Type),
    ("find", "-mtime", ArgType::Timespan),
    ("find", "-atime", ArgType::Timespan),
    ("find", "-ctime", ArgType::Timespan),
    ("find", "-mmin", ArgType::Timespan),
    ("find", "-amin", ArgType::Timespan),
    ("find", "-cmin", ArgType::Timespan),
    ("find", "-used", ArgType::Timespan),
    ("find", "-newer", ArgType::File),
    ("find", "-anewer", ArgType::File),
    ("find", "-cnewer", ArgType::File),
    ("find", "-samefile", ArgType::File),
    ("find", "-fprint", ArgType::File),
    ("find", "-fprint0", ArgType::File),
    ("find", "-newermt", ArgType::DateTime),
    ("find", "-size", ArgType::Size),
    ("find", "-perm", ArgType::Permission),
    ("find", "-maxdepth", ArgType::Number),
    ("find", "-mindepth", ArgType::Number),
    ("find", "-links", ArgType::Number),
    ("find", "-inum", ArgType::Number),
    ("find", "-uid", ArgType::Number),
    ("find", "-gid", ArgType::Number),
    ("find", "-user", ArgType::Unknown),
    ("find", "-group", ArgType::Unknown),
    ("find", "-printf", ArgType::Format),
    ("find", "-fprintf", ArgType::File),
    // grep
    ("grep", "-e", ArgType::Regex),
    ("grep", "-f", ArgType::File),
    ("grep", "-m", ArgType::Number),
    ("grep", "-A", ArgType::Number),
    ("grep", "-B", ArgType::Number),
    ("grep", "-C", ArgType::Number),
    ("grep", "--include", ArgType::Regex),
    ("grep", "--exclude", ArgType::Regex),
    ("grep", "--exclude-dir", ArgType::Regex),
    // xargs
    ("xargs", "-I", ArgType::ReservedWord),
    ("xargs", "-n", ArgType::Number),
    ("xargs", "-P", ArgType::Number),
    ("xargs", "-L", ArgType::Number),
    ("xargs", "-s", ArgType::Size),
    ("xargs", "-d", ArgType::Unknown),
    // text processing
    ("head", "-n", ArgType::Number),
    ("head", "-c", ArgType::Size),
    ("tail", "-n", ArgType::Number),
    ("tail", "-c", ArgType::Size),
    ("sort", "-k", ArgType::Unknown),
    ("sort", "-t", ArgType::Unknown),
    ("sort", "-o", ArgType::File),
    ("cut", "-d", ArgType::Unknown),
    ("cut", "-f", ArgType::Number),
    ("cut", "-c", ArgType::Number),
    ("sed", "-e", ArgType::Regex),
    ("sed", "-f", ArgType::File),
    ("awk", "-F", ArgType::Unknown),
    ("awk", "-f", ArgType::File),
    ("awk", "-v", ArgType::Unknown),
    ("uniq", "-f", ArgType::Number),
    ("split", "-b", ArgType::Size),
    ("split", "-l", ArgType::Number),
    ("wc", "--files0-from", ArgType::File),
    // files and archives
    ("tar", "-f", ArgType::File),
    ("tar", "-C", ArgType::Directory),
    ("cp", "-t", ArgType::Directory),
    ("mv", "-t", ArgType::Directory),
    ("mkdir", "-m", ArgType::Permission),
    ("touch", "-d", ArgType::DateTime),
    ("touch", "-t", ArgType::DateTime),
    ("touch", "-r", ArgType::File),
    ("du", "-d", ArgType::Number),
    ("du", "--max-depth", ArgType::Number),
    ("ls", "-I", ArgType::Regex),
    ("date", "-d", ArgType::DateTime),
    ("ssh", "-p", ArgType::Number),
    ("ssh", "-i", ArgType::File),
    ("kill", "-s", ArgType::Unknown),
];

/// Utilities whose multi-letter single-dash words are whole flags
const LONG_SINGLE_DASH_UTILITIES: &[&str] = &["find", "java", "gcc", "ffmpeg"];

/// Utilities whose positional arguments are files
const FILE_UTILITIES: &[&str] = &[
    "cat", "cp", "mv", "rm", "ln", "head", "tail", "wc", "sort", "uniq", "touch", "less",
    "more", "du", "ls", "tar", "gzip", "gunzip", "zip", "unzip", "diff", "file", "stat",
    "md5sum", "sha1sum", "sha256sum", "tee", "split", "shred", "readlink", "basename",
    "dirname", "nl", "rev", "tac", "comm", "paste", "cut", "bzip2", "xz",
];

const DIRECTORY_UTILITIES: &[&str] = &["cd", "mkdir", "rmdir", "pushd"];

lazy_static::lazy_static! {
    /// utility -> flag -> argument type
    static ref FLAG_TABLE: HashMap<&'static str, HashMap<&'static str, ArgType>> = {
        let mut m: HashMap<&'static str, HashMap<&'static str, ArgType>> = HashMap::new();
        for (utility, flag, arg_type) in FLAG_ARGUMENTS {
            m.entry(*utility).or_default().insert(*flag, *arg_type);
        }
        m
    };

    static ref NUMBER: Regex = Regex::new(r"^[+-]?[0-9]+$").unwrap();
    static ref SIZE: Regex = Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?[kKMGTPcwb]$").unwrap();
    static ref OCTAL_PERMISSION: Regex = Regex::new(r"^[+/-]?[0-7]{3,4}$").unwrap();
    static ref SYMBOLIC_PERMISSION: Regex = Regex::new(r"^[ugoa]*[+=-][rwxXst]+$").unwrap();
    static ref DATE: Regex = Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").unwrap();
    static ref SHORT_FLAG_WITH_NUMBER: Regex = Regex::new(r"^-([A-Za-z])([0-9]+)$").unwrap();
    static ref BUNDLED_SHORT_FLAGS: Regex = Regex::new(r"^-[A-Za-z0-9]{2,}$").unwrap();
}

/// Argument type expected by `flag` of `utility`, if the flag takes a value
pub fn flag_argument_type(utility: &str, flag: &str) -> Option<ArgType> {
    FLAG_TABLE.get(utility)?.get(flag).copied()
}

/// Whether a word is spelled like a flag rather than a signed number
pub fn is_flag_word(word: &str) -> bool {
    word.len() > 1 && word.starts_with('-') && !NUMBER.is_match(word) && !SIZE.is_match(word)
}

/// Split a flag word into the flags it stands for.
///
/// Each entry carries an inline value when one was glued to the flag
/// (`--name=value`, `-n5`).
pub fn split_flag_word(utility: &str, word: &str) -> Vec<(String, Option<String>)> {
    if word.starts_with("--") {
        return match word.split_once('=') {
            Some((flag, value)) => vec![(flag.to_string(), Some(value.to_string()))],
            None => vec![(word.to_string(), None)],
        };
    }
    if let Some(caps) = SHORT_FLAG_WITH_NUMBER.captures(word) {
        let flag = format!("-{}", &caps[1]);
        if flag_argument_type(utility, &flag).is_some() {
            return vec![(flag, Some(caps[2].to_string()))];
        }
    }
    if LONG_SINGLE_DASH_UTILITIES.contains(&utility) || !BUNDLED_SHORT_FLAGS.is_match(word) {
        return vec![(word.to_string(), None)];
    }
    word.chars()
        .skip(1)
        .map(|c| (format!("-{}", c), None))
        .collect()
}

/// Type of an argument by its spelling alone
pub fn infer_by_shape(word: &str) -> ArgType {
    if crate::ast::types::RESERVED_TOKENS.contains(&word) {
        ArgType::ReservedWord
    } else if NUMBER.is_match(word) {
        ArgType::Number
    } else if SIZE.is_match(word) {
        ArgType::Size
    } else if DATE.is_match(word) {
        ArgType::DateTime
    } else if word.contains('/') || word.starts_with('~') || word == "." || word == ".." {
        ArgType::Path
    } else if word.contains('*') || word.contains('?') || word.contains('[') {
        ArgType::Regex
    } else {
        ArgType::Unknown
    }
}

/// Type of the `position`-th positional argument of `utility`.
///
/// `pattern_given` is set once a grep/sed pattern was supplied via a flag.
pub fn infer_positional(utility: &str, word: &str, position: usize, pattern_given: bool) -> ArgType {
    if crate::ast::types::RESERVED_TOKENS.contains(&word) {
        return ArgType::ReservedWord;
    }
    match utility {
        "find" => ArgType::Path,
        "grep" | "sed" => {
            if position == 0 && !pattern_given {
                ArgType::Regex
            } else {
                ArgType::File
            }
        }
        "awk" => {
            if position == 0 && !pattern_given {
                ArgType::Unknown
            } else {
                ArgType::File
            }
        }
        "chmod" => {
            if position == 0 && (OCTAL_PERMISSION.is_match(word) || SYMBOLIC_PERMISSION.is_match(word)) {
                ArgType::Permission
            } else {
                ArgType::File
            }
        }
        "chown" | "chgrp" => {
            if position == 0 {
                ArgType::Unknown
            } else {
                ArgType::File
            }
        }
        "sleep" => ArgType::Timespan,
        "kill" | "seq" => ArgType::Number,
        "echo" | "printf" => ArgType::Unknown,
        _ if DIRECTORY_UTILITIES.contains(&utility) => ArgType::Directory,
        _ if FILE_UTILITIES.contains(&utility) => ArgType::File,
        _ => infer_by_shape(word),
    }
}

/// Type of an argument given to a flag that does not declare one
pub fn infer_flag_argument(utility: &str, flag: &str, word: &str) -> ArgType {
    flag_argument_type(utility, flag).unwrap_or_else(|| infer_by_shape(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_table_lookup() {
        assert_eq!(flag_argument_type("find", "-name"), Some(ArgType::Regex));
        assert_eq!(flag_argument_type("find", "-print"), None);
        assert_eq!(flag_argument_type("head", "-n"), Some(ArgType::Number));
    }

    #[test]
    fn test_is_flag_word() {
        assert!(is_flag_word("-name"));
        assert!(is_flag_word("--include"));
        assert!(!is_flag_word("-"));
        assert!(!is_flag_word("-7"));
        assert!(!is_flag_word("+7"));
        assert!(!is_flag_word("-100k"));
    }

    #[test]
    fn test_split_bundled_flags() {
        let flags: Vec<String> = split_flag_word("rm", "-rf").into_iter().map(|f| f.0).collect();
        assert_eq!(flags, vec!["-r", "-f"]);
        let flags = split_flag_word("find", "-name");
        assert_eq!(flags, vec![("-name".to_string(), None)]);
    }

    #[test]
    fn test_split_inline_values() {
        assert_eq!(
            split_flag_word("grep", "--include=*.rs"),
            vec![("--include".to_string(), Some("*.rs".to_string()))]
        );
        assert_eq!(
            split_flag_word("head", "-n5"),
            vec![("-n".to_string(), Some("5".to_string()))]
        );
    }

    #[test]
    fn test_infer_by_shape() {
        assert_eq!(infer_by_shape("42"), ArgType::Number);
        assert_eq!(infer_by_shape("+10M"), ArgType::Size);
        assert_eq!(infer_by_shape("2020-01-01"), ArgType::DateTime);
        assert_eq!(infer_by_shape("/var/log"), ArgType::Path);
        assert_eq!(infer_by_shape("*.log"), ArgType::Regex);
        assert_eq!(infer_by_shape("{}"), ArgType::ReservedWord);
        assert_eq!(infer_by_shape("hello"), ArgType::Unknown);
    }

    #[test]
    fn test_infer_positional() {
        assert_eq!(infer_positional("find", "src", 0, false), ArgType::Path);
        assert_eq!(infer_positional("grep", "foo", 0, false), ArgType::Regex);
        assert_eq!(infer_positional("grep", "a.txt", 1, false), ArgType::File);
        assert_eq!(infer_positional("grep", "a.txt", 0, true), ArgType::File);
        assert_eq!(infer_positional("chmod", "755", 0, false), ArgType::Permission);
        assert_eq!(infer_positional("chmod", "u+x", 0, false), ArgType::Permission);
        assert_eq!(infer_positional("mkdir", "build", 0, false), ArgType::Directory);
        assert_eq!(infer_positional("cat", "notes", 0, false), ArgType::File);
    }
}
