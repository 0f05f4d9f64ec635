//! Include/exclude rules compiled from `<Include>` / `<Exclude>` markup.
//!
//! A rule is a plain expression tree evaluated by structural recursion.

use std::path::Path;

use super::catalog::{EntryCatalog, EntryId};
use super::xml::Element;
use crate::error::ParseError;

/// Boolean predicate over a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleExpr {
    /// Matches every entry.
    All,
    /// Matches the entry with this desktop-file id.
    Filename(String),
    /// Matches entries listing this category.
    Category(String),
    /// Matches when every child matches. An empty `And` matches nothing.
    And(Vec<Self>),
    /// Matches when any child matches.
    Or(Vec<Self>),
    /// Matches when no child matches.
    Not(Vec<Self>),
}

impl RuleExpr {
    /// Evaluate against an entry's id and categories.
    #[must_use]
    pub fn matches(&self, desktop_file_id: &str, categories: &[String]) -> bool {
        match self {
            Self::All => true,
            Self::Filename(id) => id == desktop_file_id,
            Self::Category(cat) => categories.iter().any(|c| c == cat),
            Self::And(children) => {
                !children.is_empty()
                    && children
                        .iter()
                        .all(|c| c.matches(desktop_file_id, categories))
            }
            Self::Or(children) => children
                .iter()
                .any(|c| c.matches(desktop_file_id, categories)),
            Self::Not(children) => !children
                .iter()
                .any(|c| c.matches(desktop_file_id, categories)),
        }
    }

    /// Compile the element children of `element` into expressions.
    ///
    /// Unknown elements are skipped.
    fn compile_children(element: &Element, path: &Path) -> Result<Vec<Self>, ParseError> {
        let mut out = Vec::new();
        for child in &element.children {
            let expr = match child.name.as_str() {
                "Filename" => Self::Filename(child.required_text(path)?),
                "Category" => Self::Category(child.required_text(path)?),
                "All" => Self::All,
                "And" => Self::And(Self::compile_children(child, path)?),
                "Or" => Self::Or(Self::compile_children(child, path)?),
                "Not" => Self::Not(Self::compile_children(child, path)?),
                _ => continue,
            };
            out.push(expr);
        }
        Ok(out)
    }
}

/// Polarity of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Matching entries are added to the menu.
    Include,
    /// Matching entries are taken out of the menu again.
    Exclude,
}

/// One `<Include>` or `<Exclude>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Include or exclude.
    pub kind: RuleKind,
    /// The block's children, joined by an implicit `Or`.
    pub expr: RuleExpr,
}

impl Rule {
    /// Include the single entry `desktop_file_id`.
    #[must_use]
    pub fn include_filename(desktop_file_id: &str) -> Self {
        Self {
            kind: RuleKind::Include,
            expr: RuleExpr::Or(vec![RuleExpr::Filename(desktop_file_id.to_string())]),
        }
    }

    /// Compile an `<Include>` or `<Exclude>` element.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyElement`] for an empty `<Filename>` or
    /// `<Category>` anywhere in the block.
    pub fn from_element(element: &Element, kind: RuleKind, path: &Path) -> Result<Self, ParseError> {
        Ok(Self {
            kind,
            expr: RuleExpr::Or(RuleExpr::compile_children(element, path)?),
        })
    }
}

/// Allocation pass a rule set is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Menus that accept any entry.
    First,
    /// `OnlyUnallocated` menus: only entries nobody claimed yet.
    Second,
}

/// Evaluate `rules` in order over `candidates` and return the entries that
/// end up included.
///
/// Later rules override earlier ones for the same entry. In the second pass
/// each rule skips entries that are already allocated or were matched by an
/// earlier include, so an exclude cannot take back what an include in the
/// same menu just claimed.
pub fn apply(rules: &[Rule], catalog: &mut EntryCatalog, candidates: &[EntryId], pass: Pass) -> Vec<EntryId> {
    for rule in rules {
        for &id in candidates {
            let entry = catalog.entry_mut(id);
            if pass == Pass::Second && (entry.allocated || entry.matched_include) {
                continue;
            }
            if rule.expr.matches(&entry.desktop_file_id, &entry.categories) {
                match rule.kind {
                    RuleKind::Include => {
                        entry.add = true;
                        entry.matched_include = true;
                    }
                    RuleKind::Exclude => entry.add = false,
                }
            }
        }
    }

    candidates
        .iter()
        .copied()
        .filter(|&id| std::mem::take(&mut catalog.entry_mut(id).add))
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::menu::catalog::tests::catalog_with;

    fn compile(markup: &str) -> Rule {
        let element = Element::parse_str(markup, Path::new("t.menu")).expect("markup");
        let kind = if element.name == "Include" {
            RuleKind::Include
        } else {
            RuleKind::Exclude
        };
        Rule::from_element(&element, kind, Path::new("t.menu")).expect("rule compiles")
    }

    fn cats(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    // -----------------------------------------------------------------------
    // Compilation
    // -----------------------------------------------------------------------

    #[test]
    fn compiles_nested_expression() {
        let rule = compile(
            "<Include><And><Category>Game</Category><Not><Category>Kids</Category></Not></And>\
             <Filename>special.desktop</Filename></Include>",
        );
        assert_eq!(rule.kind, RuleKind::Include);
        assert_eq!(
            rule.expr,
            RuleExpr::Or(vec![
                RuleExpr::And(vec![
                    RuleExpr::Category("Game".into()),
                    RuleExpr::Not(vec![RuleExpr::Category("Kids".into())]),
                ]),
                RuleExpr::Filename("special.desktop".into()),
            ])
        );
    }

    #[test]
    fn empty_category_is_an_error() {
        let element = Element::parse_str("<Include><Or><Category> </Category></Or></Include>", Path::new("t.menu"))
            .expect("markup");
        let err = Rule::from_element(&element, RuleKind::Include, Path::new("t.menu"))
            .expect_err("empty category");
        assert!(matches!(err, ParseError::EmptyElement { ref element, .. } if element == "Category"));
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let rule = compile("<Exclude><Frobnicate/><All/></Exclude>");
        assert_eq!(rule.expr, RuleExpr::Or(vec![RuleExpr::All]));
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn leaf_and_compound_matching() {
        let game = cats(&["Game", "ArcadeGame"]);
        assert!(RuleExpr::All.matches("x.desktop", &[]));
        assert!(RuleExpr::Filename("x.desktop".into()).matches("x.desktop", &[]));
        assert!(RuleExpr::Category("Game".into()).matches("x.desktop", &game));
        assert!(!RuleExpr::And(vec![]).matches("x.desktop", &game));
        assert!(!RuleExpr::Or(vec![]).matches("x.desktop", &game));
        assert!(RuleExpr::Not(vec![]).matches("x.desktop", &game));
        assert!(
            !RuleExpr::Not(vec![RuleExpr::Category("Game".into())]).matches("x.desktop", &game)
        );
    }

    #[test]
    fn last_matching_rule_wins() {
        let (mut catalog, ids) = catalog_with(&[("tetris.desktop", "Game")]);
        let include_all = compile("<Include><All/></Include>");
        let exclude_games = compile("<Exclude><Category>Game</Category></Exclude>");

        let picked = apply(
            &[include_all.clone(), exclude_games.clone()],
            &mut catalog,
            &ids,
            Pass::First,
        );
        assert!(picked.is_empty());

        let picked = apply(&[exclude_games, include_all], &mut catalog, &ids, Pass::First);
        assert_eq!(picked, ids);
    }

    #[test]
    fn second_pass_skips_claimed_entries() {
        let (mut catalog, ids) = catalog_with(&[("a.desktop", "Game"), ("b.desktop", "Game")]);
        catalog.entry_mut(ids[0]).allocated = true;

        let picked = apply(&[compile("<Include><All/></Include>")], &mut catalog, &ids, Pass::Second);
        assert_eq!(picked, vec![ids[1]]);
    }

    #[test]
    fn second_pass_exclude_cannot_undo_earlier_include() {
        let (mut catalog, ids) = catalog_with(&[("a.desktop", "Game"), ("b.desktop", "Office")]);
        let rules = [
            compile("<Include><Category>Game</Category></Include>"),
            compile("<Exclude><All/></Exclude>"),
            compile("<Include><Category>Office</Category></Include>"),
        ];
        let picked = apply(&rules, &mut catalog, &ids, Pass::Second);
        assert_eq!(picked, ids);
    }

    #[test]
    fn second_pass_skips_entries_matched_before_the_call() {
        let (mut catalog, ids) = catalog_with(&[("a.desktop", "Game")]);
        catalog.entry_mut(ids[0]).matched_include = true;
        let picked = apply(&[compile("<Include><All/></Include>")], &mut catalog, &ids, Pass::Second);
        assert!(picked.is_empty());
    }

    #[test]
    fn include_marks_matched_even_when_later_excluded() {
        let (mut catalog, ids) = catalog_with(&[("a.desktop", "Game")]);
        let rules = [
            compile("<Include><All/></Include>"),
            compile("<Exclude><All/></Exclude>"),
        ];
        apply(&rules, &mut catalog, &ids, Pass::First);
        assert!(catalog.entry(ids[0]).matched_include);
        assert!(!catalog.entry(ids[0]).add);
    }
}
