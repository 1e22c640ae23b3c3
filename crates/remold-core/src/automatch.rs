//! Auto-match strategy: regex-based member name correlation
//!
//! Given a target member and the set of source members, an `AutoMatchStrategy`
//! decides which source member (if any) supplies the target's value. The
//! general engine is a pattern template containing the `{name}` placeholder;
//! the prefix/suffix/exact convenience constructors are thin fixed templates
//! over it.
//!
//! Matching is deterministic: the first matching source member in enumeration
//! order wins. There is no best-match scoring.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::types::Member;
use regex::Regex;
use std::fmt;

/// Placeholder token substituted with a member name when the template is
/// turned into a concrete regex
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Options controlling how the pattern template is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoMatchOptions {
    /// Swap the roles: substitute the target's name into the template and
    /// test each source member's name against the result. Without this flag
    /// the template describes the target name as a function of the source
    /// name.
    pub match_target: bool,
    /// Case-insensitive matching
    pub ignore_case: bool,
}

impl AutoMatchOptions {
    pub const NONE: AutoMatchOptions = AutoMatchOptions {
        match_target: false,
        ignore_case: false,
    };

    pub fn match_target(mut self) -> Self {
        self.match_target = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

#[derive(Debug, Clone)]
enum MatchImpl {
    /// Matches nothing unconditionally
    Null,
    Pattern {
        template: String,
        options: AutoMatchOptions,
    },
}

/// A name-correlation rule for auto member matching
#[derive(Clone)]
pub struct AutoMatchStrategy {
    inner: MatchImpl,
}

impl fmt::Debug for AutoMatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            MatchImpl::Null => write!(f, "AutoMatchStrategy::Null"),
            MatchImpl::Pattern { template, options } => f
                .debug_struct("AutoMatchStrategy")
                .field("template", template)
                .field("options", options)
                .finish(),
        }
    }
}

impl AutoMatchStrategy {
    /// Build a strategy from a pattern template and options.
    ///
    /// The template is validated at construction: it must not be empty or
    /// whitespace-only, must contain the `{name}` placeholder, and must
    /// compile as a regex once the placeholder is substituted.
    pub fn new(template: impl Into<String>, options: AutoMatchOptions) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(Error::invalid_argument(
                "template",
                "pattern template must not be empty or whitespace",
            ));
        }
        // Without the placeholder the template ignores member names entirely
        if !template.contains(NAME_PLACEHOLDER) {
            return Err(Error::invalid_argument(
                "template",
                format!("pattern template must contain the `{NAME_PLACEHOLDER}` placeholder"),
            ));
        }
        // Probe-compile with a neutral name so bad templates fail here, not
        // at first match
        let probe = anchored(&template.replace(NAME_PLACEHOLDER, "probe"), false);
        Regex::new(&probe).map_err(|e| Error::InvalidArgument {
            argument: "template".to_string(),
            message: format!("pattern template `{}` is not a valid regex", template),
            source: Some(anyhow::Error::new(e)),
        })?;
        Ok(AutoMatchStrategy {
            inner: MatchImpl::Pattern { template, options },
        })
    }

    /// A strategy that never matches anything (explicit opt-out of auto
    /// matching)
    pub fn none() -> Self {
        AutoMatchStrategy {
            inner: MatchImpl::Null,
        }
    }

    /// Source and target member names must be identical
    pub fn exact() -> Self {
        // The bare placeholder template is always a valid regex
        Self::new(NAME_PLACEHOLDER, AutoMatchOptions::NONE)
            .unwrap_or_else(|_| AutoMatchStrategy::none())
    }

    /// Source member names carry `prefix` in front of the target name
    /// ("mName" supplies "Name")
    pub fn prefix_source(prefix: &str) -> Result<Self> {
        Self::new(
            format!("{}{}", regex::escape(prefix), NAME_PLACEHOLDER),
            AutoMatchOptions::NONE.match_target(),
        )
    }

    /// Target member names carry `prefix` in front of the source name
    /// ("Name" supplies "mName")
    pub fn prefix_target(prefix: &str) -> Result<Self> {
        Self::new(
            format!("{}{}", regex::escape(prefix), NAME_PLACEHOLDER),
            AutoMatchOptions::NONE,
        )
    }

    /// Source member names carry `suffix` after the target name
    pub fn suffix_source(suffix: &str) -> Result<Self> {
        Self::new(
            format!("{}{}", NAME_PLACEHOLDER, regex::escape(suffix)),
            AutoMatchOptions::NONE.match_target(),
        )
    }

    /// Target member names carry `suffix` after the source name
    pub fn suffix_target(suffix: &str) -> Result<Self> {
        Self::new(
            format!("{}{}", NAME_PLACEHOLDER, regex::escape(suffix)),
            AutoMatchOptions::NONE,
        )
    }

    /// Find the source member supplying `target`'s value, or None.
    ///
    /// Only readable source members are considered. The first match in
    /// enumeration order wins.
    pub fn try_match<'m>(
        &self,
        source_members: &'m [Member],
        target: &Member,
    ) -> Option<&'m Member> {
        let (template, options) = match &self.inner {
            MatchImpl::Null => return None,
            MatchImpl::Pattern { template, options } => (template, *options),
        };

        if options.match_target {
            // One concrete regex built from the target's name, scanned
            // against every source member name
            let pattern = template.replace(NAME_PLACEHOLDER, &regex::escape(&target.name));
            let regex = compile(&pattern, options.ignore_case)?;
            source_members
                .iter()
                .filter(|m| m.readable)
                .find(|m| regex.is_match(&m.name))
        } else {
            // One regex per candidate, each tested against the target's name
            source_members.iter().filter(|m| m.readable).find(|m| {
                let pattern = template.replace(NAME_PLACEHOLDER, &regex::escape(&m.name));
                match compile(&pattern, options.ignore_case) {
                    Some(regex) => regex.is_match(&target.name),
                    None => false,
                }
            })
        }
    }
}

fn anchored(pattern: &str, ignore_case: bool) -> String {
    if ignore_case {
        format!("(?i)^(?:{})$", pattern)
    } else {
        format!("^(?:{})$", pattern)
    }
}

fn compile(pattern: &str, ignore_case: bool) -> Option<Regex> {
    // The template was probe-validated at construction; escaped member names
    // cannot invalidate it, so a failure here is unreachable in practice
    Regex::new(&anchored(pattern, ignore_case)).ok()
}
