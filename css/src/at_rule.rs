// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The static at-rule name table. Unknown at-rules fall back to
//! [`AtRuleName::Custom`] and still parse generically: verbatim
//! prelude plus an optional block.

use phf::phf_map;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AtRuleName {
    Media,
    Namespace,
    FontFace,
    Supports,
    Charset,
    Import,
    Page,
    Keyframes,
    Custom,
}

/// How the body of an at-rule's `{}` block is parsed, when present.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AtRuleBody {
    /// A nested list of rules, as in `@media` or `@supports`.
    Rules,
    /// A declaration list, as in `@font-face` or `@page`.
    Declarations,
    /// No block is expected; the rule ends at the semicolon.
    None,
}

static AT_RULES: phf::Map<&'static str, (AtRuleName, AtRuleBody)> = phf_map! {
    "media" => (AtRuleName::Media, AtRuleBody::Rules),
    "supports" => (AtRuleName::Supports, AtRuleBody::Rules),
    "keyframes" => (AtRuleName::Keyframes, AtRuleBody::Rules),
    "font-face" => (AtRuleName::FontFace, AtRuleBody::Declarations),
    "page" => (AtRuleName::Page, AtRuleBody::Declarations),
    "charset" => (AtRuleName::Charset, AtRuleBody::None),
    "import" => (AtRuleName::Import, AtRuleBody::None),
    "namespace" => (AtRuleName::Namespace, AtRuleBody::None),
};

/// Look an at-rule up by its (case-insensitive) name. Unknown names
/// parse as custom at-rules with a generic declaration body.
pub fn lookup(name: &str) -> (AtRuleName, AtRuleBody) {
    if let Some(&entry) = AT_RULES.get(name) {
        return entry;
    }
    let lowered = name.to_ascii_lowercase();
    *AT_RULES
        .get(lowered.as_str())
        .unwrap_or(&(AtRuleName::Custom, AtRuleBody::Declarations))
}

#[cfg(test)]
mod test {
    use super::{lookup, AtRuleBody, AtRuleName};

    #[test]
    fn known_and_unknown_names() {
        assert_eq!(lookup("media"), (AtRuleName::Media, AtRuleBody::Rules));
        assert_eq!(lookup("MEDIA"), (AtRuleName::Media, AtRuleBody::Rules));
        assert_eq!(
            lookup("font-face"),
            (AtRuleName::FontFace, AtRuleBody::Declarations)
        );
        assert_eq!(lookup("import"), (AtRuleName::Import, AtRuleBody::None));
        assert_eq!(
            lookup("foo"),
            (AtRuleName::Custom, AtRuleBody::Declarations)
        );
    }
}
