// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Glob compilation and file selection.
//!
//! Each repository ends up with exactly one [`Selection`] describing which of
//! its files to touch. Plain file names are handed over as-is, anything with
//! glob syntax in it is compiled into a single [`PathPattern`].
//!
//! # Glob Grammar
//!
//! Globs follow [`globset`] with path separators taken literally and
//! backslash escapes enabled. Detection and compilation both defer to it, so a
//! spec is never classified as literal by one and as a pattern by the other.
//!
//! | Syntax     | Meaning                                                  |
//! |------------|----------------------------------------------------------|
//! | `*`        | any run of characters inside one path segment            |
//! | `**`       | any number of whole path segments, including none        |
//! | `?`        | exactly one character other than `/`                     |
//! | `[abc]`    | one character from the class, `a-z` ranges allowed       |
//! | `[!abc]`   | one character not in the class (`[^abc]` also works)     |
//! | `{a,b}`    | either branch, branches may contain wildcards            |
//! | `\c`       | the character `c` taken literally                        |
//! | `!` prefix | negation, the path must __not__ match the rest           |
//!
//! Wildcards match dotfiles. Character classes never match `/`, whatever they
//! list.
//!
//! # Negation
//!
//! The regex dialect we compile to has no lookaround, so negated specs are not
//! spliced into the alternation as-is. Instead a [`PathPattern`] keeps track of
//! which branches are negated: a path matches when it hits at least one
//! positive branch (or no positive branch exists) and misses every negated
//! branch.

use crate::plan::{PlanError, Result};

use globset::GlobBuilder;
use regex::bytes::{RegexSet, RegexSetBuilder};
use regex_syntax::{
    hir::{Class, ClassBytes, ClassBytesRange, ClassUnicode, ClassUnicodeRange, Hir, HirKind},
    ParserBuilder,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// How a repository's files are chosen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No restriction.
    #[default]
    WholeRepo,

    /// Exact file paths, in request order.
    LiteralFiles(Vec<String>),

    /// Every file matching a compiled pattern.
    CompiledPattern(PathPattern),
}

/// Decide how a repository's files should be selected.
///
/// - No specs at all selects the whole repository.
/// - Outside of list mode, specs free of glob syntax stay literal file paths.
/// - Everything else is compiled into one [`PathPattern`].
///
/// # Errors
///
/// - Return [`PlanError::PatternCompile`] if a spec is not a valid glob.
pub fn resolve_selection(
    specs: &[String],
    list_mode: bool,
    case_insensitive: bool,
) -> Result<Selection> {
    if specs.is_empty() {
        return Ok(Selection::WholeRepo);
    }

    if !list_mode && !specs.iter().any(|spec| is_glob(spec)) {
        return Ok(Selection::LiteralFiles(specs.to_vec()));
    }

    Ok(Selection::CompiledPattern(PathPattern::new(
        specs,
        case_insensitive,
    )?))
}

/// Check if spec uses any glob syntax.
pub fn is_glob(spec: &str) -> bool {
    spec.starts_with('!') || spec.contains('\\') || globset::escape(spec) != spec
}

/// Single glob translated into a regex body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledGlob {
    /// Anchored regex, without flags.
    pub source: String,

    /// Spec was prefixed with `!`.
    pub negated: bool,
}

/// Compile one glob spec.
///
/// # Errors
///
/// - Return [`GlobError`] if spec is syntactically invalid.
pub fn compile_glob(spec: &str) -> Result<CompiledGlob, GlobError> {
    let (body, negated) = match spec.strip_prefix('!') {
        Some(body) => (body, true),
        None => (spec, false),
    };

    let glob = GlobBuilder::new(body)
        .literal_separator(true)
        .backslash_escape(true)
        .build()?;
    let hir = ParserBuilder::new()
        .utf8(false)
        .build()
        .parse(glob.regex())?;

    Ok(CompiledGlob {
        source: exclude_separator(hir).to_string(),
        negated,
    })
}

/// Several globs combined into one matcher.
///
/// All branches share one case sensitivity setting. The flag lives on the
/// combination, never on individual branches, so it shows up once no matter
/// how many specs were folded in.
#[derive(Debug, Clone)]
pub struct PathPattern {
    branches: Vec<CompiledGlob>,
    case_insensitive: bool,
    set: RegexSet,
}

impl PathPattern {
    /// Compile and combine glob specs.
    ///
    /// # Errors
    ///
    /// - Return [`PlanError::PatternCompile`] if any spec is not a valid glob.
    pub fn new(
        specs: impl IntoIterator<Item = impl AsRef<str>>,
        case_insensitive: bool,
    ) -> Result<Self> {
        let branches = specs
            .into_iter()
            .map(|spec| {
                let spec = spec.as_ref();
                compile_glob(spec).map_err(|source| PlanError::PatternCompile {
                    spec: spec.to_owned(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let set = RegexSetBuilder::new(branches.iter().map(|branch| branch.source.as_str()))
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|err| PlanError::PatternCompile {
                spec: branches
                    .iter()
                    .map(|branch| branch.source.as_str())
                    .collect::<Vec<_>>()
                    .join("|"),
                source: GlobError::Regex(err),
            })?;

        Ok(Self {
            branches,
            case_insensitive,
            set,
        })
    }

    /// Match a repository-relative file path.
    pub fn is_match(&self, path: &str) -> bool {
        let hits = self.set.matches(path.as_bytes());
        let mut has_positive = false;
        let mut positive_hit = false;

        for (index, branch) in self.branches.iter().enumerate() {
            if branch.negated {
                if hits.matched(index) {
                    return false;
                }
            } else {
                has_positive = true;
                positive_hit |= hits.matched(index);
            }
        }

        positive_hit || !has_positive
    }

    /// Combined pattern without flags.
    ///
    /// Branches are joined by alternation. Negated branches carry a leading
    /// `!` since they are subtracted rather than alternated.
    pub fn source(&self) -> String {
        self.branches
            .iter()
            .map(|branch| {
                let bang = if branch.negated { "!" } else { "" };
                format!("{bang}(?:{})", branch.source)
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Flags applied to the whole combination.
    pub fn flags(&self) -> &'static str {
        if self.case_insensitive {
            "i"
        } else {
            ""
        }
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Compiled branches, in spec order.
    pub fn branches(&self) -> &[CompiledGlob] {
        &self.branches
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.branches == other.branches && self.case_insensitive == other.case_insensitive
    }
}

impl Eq for PathPattern {}

impl Display for PathPattern {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self.flags() {
            "" => write!(fmt, "{}", self.source()),
            flags => write!(fmt, "(?{flags}){}", self.source()),
        }
    }
}

// INVARIANT: Bracket classes from the glob never match a path separator.
//   - Wildcard classes (`.` behind `**`) are left alone, they must cross
//     segments.
fn exclude_separator(hir: Hir) -> Hir {
    match hir.into_kind() {
        HirKind::Class(Class::Bytes(mut class)) => {
            if !is_wildcard_bytes(&class) {
                class.difference(&ClassBytes::new([ClassBytesRange::new(b'/', b'/')]));
            }
            Hir::class(Class::Bytes(class))
        }
        HirKind::Class(Class::Unicode(mut class)) => {
            if !is_wildcard_unicode(&class) {
                class.difference(&ClassUnicode::new([ClassUnicodeRange::new('/', '/')]));
            }
            Hir::class(Class::Unicode(class))
        }
        HirKind::Repetition(mut repetition) => {
            repetition.sub = Box::new(exclude_separator(*repetition.sub));
            Hir::repetition(repetition)
        }
        HirKind::Capture(mut capture) => {
            capture.sub = Box::new(exclude_separator(*capture.sub));
            Hir::capture(capture)
        }
        HirKind::Concat(subs) => Hir::concat(subs.into_iter().map(exclude_separator).collect()),
        HirKind::Alternation(subs) => {
            Hir::alternation(subs.into_iter().map(exclude_separator).collect())
        }
        HirKind::Literal(literal) => Hir::literal(literal.0),
        HirKind::Look(look) => Hir::look(look),
        HirKind::Empty => Hir::empty(),
    }
}

fn is_wildcard_bytes(class: &ClassBytes) -> bool {
    let mut rest = class.clone();
    rest.negate();
    rest.ranges()
        .iter()
        .all(|range| range.start() == b'\n' && range.end() == b'\n')
}

fn is_wildcard_unicode(class: &ClassUnicode) -> bool {
    let mut rest = class.clone();
    rest.negate();
    rest.ranges()
        .iter()
        .all(|range| range.start() == '\n' && range.end() == '\n')
}

/// Glob syntax errors.
#[derive(Debug, thiserror::Error)]
pub enum GlobError {
    /// Glob rejected by glob parser.
    #[error(transparent)]
    Glob(#[from] globset::Error),

    /// Translated glob rejected by regex parser.
    #[error(transparent)]
    Syntax(#[from] regex_syntax::Error),

    /// Combined pattern rejected by regex engine.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}
