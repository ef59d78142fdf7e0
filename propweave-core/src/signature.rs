#![forbid(unsafe_code)]

//! Pattern-procedure vs. candidate signature compatibility.
//!
//! A pattern signature may escape its name with [`NAME_WILDCARD_PREFIX`]
//! and replace either parameter list with a single [`ANY_PARAMS`]
//! parameter. Parameters are compared by declaration kind only, which is a
//! deliberate approximation of type equality.

use propweave_ast::{
    AttrParam, Attributes, DeclKind, Implementation, Param, Procedure, ProcedureSig, TypeShape,
};

use crate::config::MatchOptions;

/// A pattern procedure whose name starts with this matches any name.
pub const NAME_WILDCARD_PREFIX: &str = "##";

/// Sole parameter name meaning "any parameter list".
pub const ANY_PARAMS: &str = "##ANYPARAMS";

/// Host predicate "attribute set `sub` is contained in `sup`".
pub trait AttributeOracle {
    fn is_subset(&self, sub: &Attributes, sup: &Attributes) -> bool;
}

/// Every attribute of `sub` must occur in `sup` with the same key and
/// structurally equal parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyValueSubset;

impl AttributeOracle for KeyValueSubset {
    fn is_subset(&self, sub: &Attributes, sup: &Attributes) -> bool {
        sub.iter().all(|a| {
            sup.iter()
                .any(|b| a.key == b.key && attr_params_eq(&a.params, &b.params))
        })
    }
}

fn attr_params_eq(a: &[AttrParam], b: &[AttrParam]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| match (x, y) {
            (AttrParam::Str(x), AttrParam::Str(y)) => x == y,
            (AttrParam::Expr(x), AttrParam::Expr(y)) => x.structurally_eq(y),
            _ => false,
        })
}

/// Why a candidate was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum SigMismatch {
    MissingAttributes,
    NameMismatch { pattern: String, candidate: String },
    InParamCount { expected: usize, found: usize },
    InParamKind { index: usize, expected: DeclKind, found: DeclKind },
    InParamShape { index: usize, expected: TypeShape, found: TypeShape },
    OutParamCount { expected: usize, found: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum SigMatch {
    /// The candidate is compatible. When the pattern used `##ANYPARAMS`,
    /// the sentinel's attributes are handed back for post-filtering.
    Matched {
        any_in_params: Option<Attributes>,
        any_out_params: Option<Attributes>,
    },
    Rejected(SigMismatch),
}

impl SigMatch {
    pub fn is_match(&self) -> bool {
        matches!(self, SigMatch::Matched { .. })
    }
}

pub struct SignatureMatcher<'a, O: AttributeOracle> {
    options: &'a MatchOptions,
    oracle: &'a O,
}

impl<'a, O: AttributeOracle> SignatureMatcher<'a, O> {
    pub fn new(options: &'a MatchOptions, oracle: &'a O) -> Self {
        Self { options, oracle }
    }

    pub fn match_sig(&self, pattern: &ProcedureSig, candidate: &ProcedureSig) -> SigMatch {
        match self.check(pattern, candidate) {
            Ok(m) => m,
            Err(reason) => {
                tracing::debug!(
                    pattern = %pattern.name,
                    candidate = %candidate.name,
                    ?reason,
                    "signature rejected"
                );
                SigMatch::Rejected(reason)
            }
        }
    }

    pub fn match_implementation(&self, pattern: &Procedure, imp: &Implementation) -> SigMatch {
        self.match_sig(&pattern.sig, &imp.sig)
    }

    fn check(&self, pattern: &ProcedureSig, candidate: &ProcedureSig) -> Result<SigMatch, SigMismatch> {
        if !self.oracle.is_subset(&pattern.attributes, &candidate.attributes) {
            return Err(SigMismatch::MissingAttributes);
        }

        if !pattern.name.starts_with(NAME_WILDCARD_PREFIX) && pattern.name != candidate.name {
            return Err(SigMismatch::NameMismatch {
                pattern: pattern.name.clone(),
                candidate: candidate.name.clone(),
            });
        }

        let any_in_params = match any_params(&pattern.ins) {
            Some(p) => Some(p.attributes.clone()),
            None => {
                self.check_in_params(&pattern.ins, &candidate.ins)?;
                None
            }
        };

        // Outputs only need to agree on count.
        let any_out_params = match any_params(&pattern.outs) {
            Some(p) => Some(p.attributes.clone()),
            None if pattern.outs.len() != candidate.outs.len() => {
                return Err(SigMismatch::OutParamCount {
                    expected: pattern.outs.len(),
                    found: candidate.outs.len(),
                });
            }
            None => None,
        };

        Ok(SigMatch::Matched {
            any_in_params,
            any_out_params,
        })
    }

    fn check_in_params(&self, pattern: &[Param], candidate: &[Param]) -> Result<(), SigMismatch> {
        if pattern.len() != candidate.len() {
            return Err(SigMismatch::InParamCount {
                expected: pattern.len(),
                found: candidate.len(),
            });
        }
        for (index, (p, c)) in pattern.iter().zip(candidate).enumerate() {
            if p.kind != c.kind {
                return Err(SigMismatch::InParamKind {
                    index,
                    expected: p.kind,
                    found: c.kind,
                });
            }
            if self.options.compare_param_types && p.ty.shape() != c.ty.shape() {
                return Err(SigMismatch::InParamShape {
                    index,
                    expected: p.ty.shape(),
                    found: c.ty.shape(),
                });
            }
        }
        Ok(())
    }
}

fn any_params(params: &[Param]) -> Option<&Param> {
    match params {
        [only] if only.name == ANY_PARAMS => Some(only),
        _ => None,
    }
}

/// Parameters of a matched candidate that carry every attribute of the
/// `##ANYPARAMS` sentinel.
pub fn filter_params<'p, O: AttributeOracle>(
    params: &'p [Param],
    filter: &Attributes,
    oracle: &O,
) -> Vec<&'p Param> {
    params
        .iter()
        .filter(|p| oracle.is_subset(filter, &p.attributes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use propweave_ast::{Attribute, Expr, Type};

    fn sig(name: &str, ins: Vec<Param>, outs: Vec<Param>) -> ProcedureSig {
        ProcedureSig::new(name, ins, outs)
    }

    fn any() -> Param {
        Param::formal(ANY_PARAMS, Type::Int)
    }

    fn check(pattern: &ProcedureSig, candidate: &ProcedureSig) -> SigMatch {
        let opts = MatchOptions::default();
        SignatureMatcher::new(&opts, &KeyValueSubset).match_sig(pattern, candidate)
    }

    #[test]
    fn same_name_and_shape_matches() {
        let p = sig("foo", vec![Param::formal("a", Type::Int)], vec![]);
        let c = sig("foo", vec![Param::formal("x", Type::Bool)], vec![]);
        assert!(check(&p, &c).is_match());
    }

    #[test]
    fn name_mismatch_rejected() {
        let p = sig("foo", vec![], vec![]);
        let c = sig("bar", vec![], vec![]);
        assert!(matches!(
            check(&p, &c),
            SigMatch::Rejected(SigMismatch::NameMismatch { .. })
        ));
    }

    #[test]
    fn escaped_name_matches_any_name() {
        let p = sig("##anything", vec![], vec![]);
        let c = sig("bar", vec![], vec![]);
        assert!(check(&p, &c).is_match());
    }

    #[test]
    fn any_params_accepts_every_in_list() {
        let p = sig("foo", vec![any()], vec![]);
        for n in 0..4 {
            let ins = (0..n)
                .map(|i| Param::new(format!("p{i}"), DeclKind::Local, Type::Int))
                .collect();
            assert!(check(&p, &sig("foo", ins, vec![])).is_match(), "{n} params");
        }
    }

    #[test]
    fn any_params_exposes_sentinel_attributes() {
        let attrs = Attributes::flags(["pointer"]);
        let p = sig("foo", vec![any().with_attributes(attrs.clone())], vec![any()]);
        let c = sig("foo", vec![Param::formal("x", Type::Int)], vec![Param::formal("r", Type::Int)]);
        assert_eq!(
            check(&p, &c),
            SigMatch::Matched {
                any_in_params: Some(attrs),
                any_out_params: Some(Attributes::new()),
            }
        );
    }

    #[test]
    fn in_param_count_and_kind_are_checked() {
        let p = sig("foo", vec![Param::formal("a", Type::Int)], vec![]);
        let two = sig(
            "foo",
            vec![Param::formal("a", Type::Int), Param::formal("b", Type::Int)],
            vec![],
        );
        assert!(matches!(
            check(&p, &two),
            SigMatch::Rejected(SigMismatch::InParamCount { expected: 1, found: 2 })
        ));

        let local = sig("foo", vec![Param::new("a", DeclKind::Local, Type::Int)], vec![]);
        assert!(matches!(
            check(&p, &local),
            SigMatch::Rejected(SigMismatch::InParamKind { index: 0, .. })
        ));
    }

    #[test]
    fn out_params_only_compare_count() {
        let p = sig("foo", vec![], vec![Param::formal("r", Type::Int)]);
        let c = sig("foo", vec![], vec![Param::new("r", DeclKind::Local, Type::Bool)]);
        assert!(check(&p, &c).is_match());
        let none = sig("foo", vec![], vec![]);
        assert!(matches!(
            check(&p, &none),
            SigMatch::Rejected(SigMismatch::OutParamCount { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn type_shapes_compared_when_enabled() {
        let p = sig("foo", vec![Param::formal("a", Type::Int)], vec![]);
        let c = sig("foo", vec![Param::formal("a", Type::map(Type::Int, Type::Int))], vec![]);
        assert!(check(&p, &c).is_match());

        let opts = MatchOptions {
            compare_param_types: true,
            ..MatchOptions::default()
        };
        let got = SignatureMatcher::new(&opts, &KeyValueSubset).match_sig(&p, &c);
        assert!(matches!(got, SigMatch::Rejected(SigMismatch::InParamShape { .. })));
    }

    #[test]
    fn candidate_must_carry_pattern_attributes() {
        let p = sig("foo", vec![], vec![]).with_attributes(Attributes::flags(["entrypoint"]));
        let bare = sig("foo", vec![], vec![]);
        assert_eq!(
            check(&p, &bare),
            SigMatch::Rejected(SigMismatch::MissingAttributes)
        );
        let tagged = sig("foo", vec![], vec![])
            .with_attributes(Attributes::flags(["inline", "entrypoint"]));
        assert!(check(&p, &tagged).is_match());
    }

    #[test]
    fn attribute_params_must_agree() {
        let want = Attributes(vec![Attribute::with_params(
            "bound",
            vec![AttrParam::Expr(Expr::int(3))],
        )]);
        let same = Attributes(vec![Attribute::with_params(
            "bound",
            vec![AttrParam::Expr(Expr::int(3))],
        )]);
        let other = Attributes(vec![Attribute::with_params(
            "bound",
            vec![AttrParam::Str("3".to_string())],
        )]);
        assert!(KeyValueSubset.is_subset(&want, &same));
        assert!(!KeyValueSubset.is_subset(&want, &other));
        assert!(KeyValueSubset.is_subset(&Attributes::new(), &other));
    }

    #[test]
    fn filter_params_keeps_tagged_ones() {
        let params = vec![
            Param::formal("a", Type::Int).with_attributes(Attributes::flags(["pointer"])),
            Param::formal("b", Type::Int),
        ];
        let kept = filter_params(&params, &Attributes::flags(["pointer"]), &KeyValueSubset);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "a");
        assert_eq!(filter_params(&params, &Attributes::new(), &KeyValueSubset).len(), 2);
    }
}
