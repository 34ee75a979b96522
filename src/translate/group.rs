//! Term grouping
//!
//! Folds a flat term sequence into an ephemeral [`TermGroup`] tree before
//! rendering. OR binds looser than AND: `A AND B OR C` groups as
//! `(A AND B) OR C`, never `A AND (B OR C)`. The tree is built per query
//! by pure recursive descent and discarded after translation.

use super::term::{Connective, Term};

/// Ephemeral grouping of terms sharing a boolean connective
#[derive(Debug, Clone, PartialEq)]
pub struct TermGroup {
    /// Connective joining the group's direct members
    pub connective: Connective,
    /// Same-level leaf terms
    pub terms: Vec<Term>,
    /// Nested sub-groups
    pub groups: Vec<TermGroup>,
}

impl TermGroup {
    /// Create an empty group
    pub fn new(connective: Connective) -> Self {
        Self {
            connective,
            terms: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Add a leaf term
    pub fn add_term(&mut self, term: Term) {
        self.terms.push(term);
    }

    /// Attach a child group, merging where the boolean shape allows.
    ///
    /// A child with the same connective is flattened: its leaf terms and
    /// sub-groups splice directly into this group. A child holding exactly
    /// one leaf and no sub-groups contributes that single leaf regardless
    /// of connective. Anything else is retained as a nested clause.
    pub fn add_group(&mut self, group: TermGroup) {
        if group.connective == self.connective {
            for term in group.terms {
                self.add_term(term);
            }
            self.groups.extend(group.groups);
        } else if group.terms.len() == 1 && group.groups.is_empty() {
            self.terms.extend(group.terms);
        } else {
            self.groups.push(group);
        }
    }

    /// Whether the group constrains anything
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.groups.is_empty()
    }
}

/// Fold a term sequence into a group tree.
///
/// The first term seeds an AND group. Each later term extends the current
/// group while its connective is AND; an OR connective triggers a regroup:
/// a fresh OR group adopts everything accumulated so far plus the
/// recursively grouped remainder. A term carrying child terms contributes
/// their recursively built sub-group; a term without a value contributes
/// no leaf of its own.
pub fn group_terms(terms: &[Term]) -> TermGroup {
    match terms.split_first() {
        None => TermGroup::new(Connective::And),
        Some((first, others)) => group_rest(first, others, TermGroup::new(Connective::And)),
    }
}

fn group_rest(first: &Term, others: &[Term], mut current: TermGroup) -> TermGroup {
    if first.value.is_some() {
        current.add_term(first.clone());
    }
    if !first.terms.is_empty() {
        current.add_group(group_terms(&first.terms));
    }

    let Some((next, rest)) = others.split_first() else {
        return current;
    };

    if next.connective == Connective::Or {
        let mut regrouped = TermGroup::new(Connective::Or);
        regrouped.add_group(current);
        regrouped.add_group(group_terms(others));
        regrouped
    } else {
        group_rest(next, rest, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(name: &str) -> Term {
        Term::eq(name, json!(1))
    }

    #[test]
    fn test_all_and_stays_flat() {
        let group = group_terms(&[leaf("a"), leaf("b"), leaf("c")]);
        assert_eq!(group.connective, Connective::And);
        assert_eq!(group.terms.len(), 3);
        assert!(group.groups.is_empty());
    }

    #[test]
    fn test_or_binds_looser_than_and() {
        // A AND B OR C => (A AND B) OR C
        let group = group_terms(&[leaf("a"), leaf("b"), leaf("c").or()]);
        assert_eq!(group.connective, Connective::Or);
        // C is a single-leaf child, spliced directly into the OR group
        assert_eq!(group.terms.len(), 1);
        assert_eq!(group.terms[0].column, "c");
        assert_eq!(group.groups.len(), 1);
        let and = &group.groups[0];
        assert_eq!(and.connective, Connective::And);
        assert_eq!(and.terms.len(), 2);
    }

    #[test]
    fn test_or_then_and_groups_tail() {
        // A OR B AND C => A OR (B AND C)
        let group = group_terms(&[leaf("a"), leaf("b").or(), leaf("c")]);
        assert_eq!(group.connective, Connective::Or);
        assert_eq!(group.terms.len(), 1);
        assert_eq!(group.terms[0].column, "a");
        assert_eq!(group.groups.len(), 1);
        assert_eq!(group.groups[0].terms.len(), 2);
    }

    #[test]
    fn test_same_connective_child_flattens() {
        let mut parent = TermGroup::new(Connective::And);
        parent.add_term(leaf("a"));
        let mut child = TermGroup::new(Connective::And);
        child.add_term(leaf("b"));
        child.add_term(leaf("c"));
        parent.add_group(child);
        assert_eq!(parent.terms.len(), 3);
        assert!(parent.groups.is_empty());
    }

    #[test]
    fn test_single_leaf_child_splices_across_connectives() {
        let mut parent = TermGroup::new(Connective::And);
        let mut child = TermGroup::new(Connective::Or);
        child.add_term(leaf("a"));
        parent.add_group(child);
        assert_eq!(parent.terms.len(), 1);
        assert!(parent.groups.is_empty());
    }

    #[test]
    fn test_multi_leaf_child_kept_nested() {
        let mut parent = TermGroup::new(Connective::And);
        let mut child = TermGroup::new(Connective::Or);
        child.add_term(leaf("a"));
        child.add_term(leaf("b"));
        parent.add_group(child);
        assert!(parent.terms.is_empty());
        assert_eq!(parent.groups.len(), 1);
    }

    #[test]
    fn test_child_terms_become_sub_group() {
        let nested = leaf("outer").with_terms(vec![leaf("x"), leaf("y").or()]);
        let group = group_terms(&[nested]);
        assert_eq!(group.terms.len(), 1);
        assert_eq!(group.groups.len(), 1);
        assert_eq!(group.groups[0].connective, Connective::Or);
    }

    #[test]
    fn test_valueless_term_contributes_no_leaf() {
        let mut bare = leaf("a");
        bare.value = None;
        let group = group_terms(&[bare, leaf("b")]);
        assert_eq!(group.terms.len(), 1);
        assert_eq!(group.terms[0].column, "b");
    }

    #[test]
    fn test_empty_sequence_yields_empty_group() {
        let group = group_terms(&[]);
        assert!(group.is_empty());
    }
}
