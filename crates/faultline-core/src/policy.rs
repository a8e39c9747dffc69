use std::path::Path;
use std::str::Chars;

use regex::Regex;

/// Action configured for executables matching a policy rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Kill the target process.
    Kill,

    /// Hand the target process over to a debugger.
    Debug,

    /// Save a report, then hand the target process over to a debugger.
    SaveReport,

    /// Write a core file, then kill the target process.
    WriteCore,

    /// Ask the user what to do.
    Prompt,
}

/// Executable name pattern, using wildcards (`*`, `?`, `[...]`).
///
/// A pattern starting with `/` is matched against the full executable
/// path, otherwise only against the executable's file name.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a wildcard pattern.
    ///
    /// Character classes follow the shell syntax: `[!...]` (or `[^...]`)
    /// is negated, and a `]` right after the opening bracket is literal.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let mut expr = String::with_capacity(pattern.len() * 2 + 2);
        expr.push('^');

        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                '[' => push_class(&mut expr, &mut chars)?,
                c => {
                    let mut buf = [0u8; 4];
                    expr.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                }
            }
        }

        expr.push('$');

        Ok(Self {
            source: pattern.to_owned(),
            regex: Regex::new(&expr)?,
        })
    }

    /// Returns the pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns whether the given executable path matches this pattern.
    pub fn matches(&self, executable: &Path) -> bool {
        let value = if self.source.starts_with('/') {
            executable.to_string_lossy()
        } else {
            match executable.file_name() {
                Some(name) => name.to_string_lossy(),
                None => executable.to_string_lossy(),
            }
        };

        self.regex.is_match(&value)
    }
}

/// Translates a character class, whose opening bracket was consumed.
fn push_class(expr: &mut String, chars: &mut Chars<'_>) -> Result<(), PatternError> {
    expr.push('[');

    if let Some(rest) = chars.as_str().strip_prefix(['!', '^']) {
        expr.push('^');
        *chars = rest.chars();
    }

    let mut first = true;
    loop {
        match chars.next().ok_or(PatternError::UnterminatedClass)? {
            ']' if !first => break,
            // class set operators and nested classes of the regex syntax
            c @ ('\\' | '[' | ']' | '&' | '~' | '^') => {
                expr.push('\\');
                expr.push(c);
            }
            c => expr.push(c),
        }
        first = false;
    }

    expr.push(']');
    Ok(())
}

/// Error of an invalid [Pattern].
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    /// A `[` has no matching `]`.
    #[error("unterminated character class")]
    UnterminatedClass,

    /// The translated pattern was rejected.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// A single policy rule.
#[derive(Clone, Debug)]
pub struct Rule {
    /// Executables this rule applies to.
    pub pattern: Pattern,

    /// Action to take for these executables.
    pub action: Action,
}

/// Result of a policy lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyMatch {
    /// The action to take.
    pub action: Action,

    /// Whether the action comes from an explicit rule (rather than the
    /// default action).
    pub explicit: bool,
}

/// Ordered mapping of executable patterns to actions.
#[derive(Clone, Debug)]
pub struct PolicyTable {
    default_action: Action,
    rules: Vec<Rule>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(Action::Prompt)
    }
}

impl PolicyTable {
    /// Creates an empty policy table with the given default action.
    pub const fn new(default_action: Action) -> Self {
        Self {
            default_action,
            rules: Vec::new(),
        }
    }

    /// Appends a rule to this table.
    ///
    /// Rules are evaluated in insertion order.
    pub fn rule(mut self, pattern: Pattern, action: Action) -> Self {
        self.rules.push(Rule { pattern, action });
        self
    }

    /// Returns the action to take for the given executable.
    ///
    /// The first matching rule wins.
    pub fn lookup(&self, executable: &Path) -> PolicyMatch {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(executable))
            .map_or(
                PolicyMatch {
                    action: self.default_action,
                    explicit: false,
                },
                |rule| PolicyMatch {
                    action: rule.action,
                    explicit: true,
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{Action, Pattern, PatternError, PolicyMatch, PolicyTable};

    fn pattern(p: &str) -> Pattern {
        Pattern::new(p).expect("pattern")
    }

    #[test]
    fn name_pattern_matches_file_name_only() {
        let p = pattern("fire*");

        assert!(p.matches(Path::new("/usr/bin/firefox")));
        assert!(p.matches(Path::new("firefox")));
        assert!(!p.matches(Path::new("/opt/fire/bin/app")));
    }

    #[test]
    fn path_pattern_matches_full_path() {
        let p = pattern("/opt/*/bin/?pp");

        assert!(p.matches(Path::new("/opt/vendor/bin/app")));
        assert!(!p.matches(Path::new("/usr/opt/vendor/bin/app")));
        assert!(!p.matches(Path::new("app")));
    }

    #[test]
    fn pattern_escapes_regex_metacharacters() {
        let p = pattern("a.out+[0-9]");

        assert!(p.matches(Path::new("a.out+3")));
        assert!(!p.matches(Path::new("aXout+3")));
        assert!(!p.matches(Path::new("a.out+x")));
    }

    #[test]
    fn negated_class_excludes_its_characters() {
        for p in ["[!a]pp", "[^a]pp"] {
            let p = pattern(p);

            assert!(p.matches(Path::new("xpp")));
            assert!(p.matches(Path::new("!pp")));
            assert!(!p.matches(Path::new("app")));
        }

        let p = pattern("[!a-c]*");
        assert!(p.matches(Path::new("dbus-daemon")));
        assert!(!p.matches(Path::new("bash")));
    }

    #[test]
    fn class_special_characters_are_literal() {
        let p = pattern("[]x]y");
        assert!(p.matches(Path::new("]y")));
        assert!(p.matches(Path::new("xy")));
        assert!(!p.matches(Path::new("zy")));

        let p = pattern("[&[~]");
        assert!(p.matches(Path::new("&")));
        assert!(p.matches(Path::new("[")));
        assert!(p.matches(Path::new("~")));
        assert!(!p.matches(Path::new("a")));
    }

    #[test]
    fn unterminated_class_is_rejected() {
        for p in ["crashy[", "crashy[a-z", "[!", "[]"] {
            assert!(
                matches!(Pattern::new(p), Err(PatternError::UnterminatedClass)),
                "{p}"
            );
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = PolicyTable::new(Action::Prompt)
            .rule(pattern("crash*"), Action::Kill)
            .rule(pattern("crashy"), Action::Debug);

        assert_eq!(
            table.lookup(Path::new("/bin/crashy")),
            PolicyMatch {
                action: Action::Kill,
                explicit: true,
            }
        );
    }

    #[test]
    fn default_action_applies_without_match() {
        let table = PolicyTable::new(Action::WriteCore).rule(pattern("other"), Action::Kill);

        assert_eq!(
            table.lookup(Path::new("/bin/crashy")),
            PolicyMatch {
                action: Action::WriteCore,
                explicit: false,
            }
        );
        assert_eq!(
            PolicyTable::default().lookup(Path::new("")).action,
            Action::Prompt
        );
    }
}
