//! Template lookup over a finished declaration list
//!
//! `type 'A' as 'B';` only records the target's type code and ID. Aliases are
//! followed here, after parsing, so templates may be declared in any order.
//!
//! # Lookup Rules
//!
//! - A template restricted to an ID or range beats an unrestricted one
//! - Among equally specific candidates, the one declared last wins
//! - Alias chains are followed until a real template is reached; revisiting
//!   an alias is an [`ResolveError::AliasCycle`]

use crate::errors::ResolveError;
use crate::parser::ast::*;
use rustc_hash::FxHashSet;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
enum Entry<'a> {
    Template(&'a TypeDef),
    Alias(&'a AliasDef),
}

impl Entry<'_> {
    fn type_code(&self) -> ResType {
        match self {
            Entry::Template(def) => def.type_code,
            Entry::Alias(def) => def.type_code,
        }
    }

    fn id_filter(&self) -> Option<IdFilter> {
        match self {
            Entry::Template(def) => def.id_filter,
            Entry::Alias(def) => def.id_filter,
        }
    }
}

/// Every template and alias of a parse, in declaration order
#[derive(Debug, Clone, Default)]
pub struct TemplateIndex<'a> {
    entries: Vec<Entry<'a>>,
}

impl<'a> TemplateIndex<'a> {
    pub fn new(declarations: &'a [Declaration]) -> Self {
        let entries = declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Type(def) => Some(Entry::Template(def)),
                Declaration::Alias(def) => Some(Entry::Alias(def)),
                _ => None,
            })
            .collect();
        TemplateIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Template used for resource `type_code` with ID `id`, if any.
    pub fn lookup(&self, type_code: ResType, id: i64) -> Result<Option<&'a TypeDef>, ResolveError> {
        match self.find(type_code, Some(id)) {
            Some(entry) => self.follow(entry, &mut FxHashSet::default()).map(Some),
            None => Ok(None),
        }
    }

    /// The template an alias ends up naming.
    pub fn resolve_alias(&self, alias: &'a AliasDef) -> Result<&'a TypeDef, ResolveError> {
        self.follow(Entry::Alias(alias), &mut FxHashSet::default())
    }

    /// Resolve every alias, reporting the first that fails.
    pub fn check_aliases(&self) -> Result<(), ResolveError> {
        for entry in &self.entries {
            if let Entry::Alias(alias) = entry {
                self.resolve_alias(*alias)?;
            }
        }
        Ok(())
    }

    /// Best entry for a type code. With no ID, unrestricted entries are
    /// preferred and any entry for the code is accepted.
    fn find(&self, type_code: ResType, id: Option<i64>) -> Option<Entry<'a>> {
        let found = match id {
            Some(id) => self
                .candidates(type_code)
                .find(|entry| entry.id_filter().is_some_and(|f| f.matches(id)))
                .or_else(|| self.candidates(type_code).find(|entry| entry.id_filter().is_none())),
            None => self
                .candidates(type_code)
                .find(|entry| entry.id_filter().is_none())
                .or_else(|| self.candidates(type_code).next()),
        };
        found.copied()
    }

    /// Entries for `type_code`, latest first
    fn candidates(&self, type_code: ResType) -> impl Iterator<Item = &Entry<'a>> + '_ {
        self.entries
            .iter()
            .rev()
            .filter(move |entry| entry.type_code() == type_code)
    }

    fn follow(
        &self,
        entry: Entry<'a>,
        visited: &mut FxHashSet<*const AliasDef>,
    ) -> Result<&'a TypeDef, ResolveError> {
        let mut entry = entry;
        loop {
            let alias = match entry {
                Entry::Template(def) => return Ok(def),
                Entry::Alias(alias) => alias,
            };
            if !visited.insert(alias as *const AliasDef) {
                return Err(ResolveError::AliasCycle {
                    type_code: alias.type_code,
                    location: alias.location,
                });
            }

            trace!(from = %alias.type_code, to = %alias.target.type_code, "following alias");
            entry = self
                .find(alias.target.type_code, alias.target.id)
                .ok_or(ResolveError::MissingTemplate {
                    type_code: alias.target.type_code,
                    id: alias.target.id,
                    location: alias.location,
                })?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(source: &str) -> Vec<Declaration> {
        Parser::new(source).parse_file().into_result().unwrap()
    }

    fn code(text: &[u8; 4]) -> ResType {
        ResType::from_bytes(*text)
    }

    #[test]
    fn test_specific_template_beats_generic() {
        let decls = parse(
            "type 'XXXX' { byte; };\n\
             type 'XXXX' (2) { integer; };\n\
             type 'XXXX' (3) { string; };",
        );
        let index = TemplateIndex::new(&decls);
        assert_eq!(index.len(), 3);

        let two = index.lookup(code(b"XXXX"), 2).unwrap().unwrap();
        assert_eq!(two.id_filter, Some(IdFilter::Single(2)));
        let three = index.lookup(code(b"XXXX"), 3).unwrap().unwrap();
        assert_eq!(three.id_filter, Some(IdFilter::Single(3)));
        let other = index.lookup(code(b"XXXX"), 9).unwrap().unwrap();
        assert_eq!(other.id_filter, None);
        assert!(index.lookup(code(b"YYYY"), 1).unwrap().is_none());
    }

    #[test]
    fn test_alias_declared_before_target() {
        let decls = parse(
            "type 'cicn' as 'ICON';\n\
             type 'ICON' { hex string[128]; };",
        );
        let index = TemplateIndex::new(&decls);
        let template = index.lookup(code(b"cicn"), 128).unwrap().unwrap();
        assert_eq!(template.type_code, code(b"ICON"));
        assert!(index.check_aliases().is_ok());
    }

    #[test]
    fn test_alias_chain_with_ids() {
        let decls = parse(
            "type 'AAAA' (1) { byte; };\n\
             type 'AAAA' (2) { integer; };\n\
             type 'BBBB' as 'AAAA' (2);\n\
             type 'CCCC' as 'BBBB';",
        );
        let index = TemplateIndex::new(&decls);
        let template = index.lookup(code(b"CCCC"), 0).unwrap().unwrap();
        assert_eq!(template.id_filter, Some(IdFilter::Single(2)));
    }

    #[test]
    fn test_alias_cycle() {
        let decls = parse("type 'AAAA' as 'BBBB';\ntype 'BBBB' as 'AAAA';");
        let index = TemplateIndex::new(&decls);
        assert!(matches!(
            index.lookup(code(b"AAAA"), 1),
            Err(ResolveError::AliasCycle { .. })
        ));
    }

    #[test]
    fn test_missing_target() {
        let decls = parse("type 'AAAA' as 'ZZZZ' (4);");
        let index = TemplateIndex::new(&decls);
        let err = index.check_aliases().unwrap_err();
        assert!(matches!(err, ResolveError::MissingTemplate { id: Some(4), .. }));
        assert_eq!(err.to_string(), "no template for 'ZZZZ' (4) (alias at line 1, column 1)");
    }
}
