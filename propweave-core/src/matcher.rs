#![forbid(unsafe_code)]

//! Structural matching of a pattern expression against a subject.
//!
//! The subject is walked in pre-order while a queue of pattern nodes is
//! consumed front to back: every visited subject node takes exactly one
//! pattern node, and a matched application puts the pattern's arguments at
//! the front of the queue before its own arguments are visited.
//!
//! Pattern identifiers are wildcards. They capture whatever subject node
//! sits in their position (a whole subtree for applications and
//! quantifiers). A pattern call to a declared function also matches a call
//! to a different function of the same arity, and records that function in
//! the function map.
//!
//! The walk is deterministic and stops at the first mismatch; a failed
//! result never carries bindings.

use std::collections::VecDeque;

use propweave_ast::{Cmd, CmdKind, Expr, ExprKind, FunctionSymbol, IdentRef};

use crate::config::MatchOptions;
use crate::subst::Substitution;

#[derive(Clone, Debug, PartialEq)]
pub enum Mismatch {
    /// The subject has more nodes than the pattern.
    PatternExhausted,
    /// Pattern nodes were left over after the subject was fully visited.
    PatternLeftover { remaining: usize },
    KindMismatch {
        pattern: &'static str,
        subject: &'static str,
    },
    LiteralMismatch,
    /// A wildcard identifier has no declaration to bind.
    UnresolvedWildcard { name: String },
    ArityMismatch { expected: usize, found: usize },
    FunctionMismatch { pattern: String, subject: String },
    /// A wildcard seen twice captured two different subtrees.
    InconsistentBinding { name: String },
    /// A pattern function seen twice was matched by two different functions.
    InconsistentFunction { name: String },
    QuantifierMismatch,
    /// The command has no expression to match against.
    NoCandidate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub success: bool,
    pub substitution: Substitution,
    pub mismatch: Option<Mismatch>,
}

impl MatchResult {
    fn matched(substitution: Substitution) -> Self {
        Self {
            success: true,
            substitution,
            mismatch: None,
        }
    }

    fn failed(reason: Mismatch) -> Self {
        Self {
            success: false,
            substitution: Substitution::new(),
            mismatch: Some(reason),
        }
    }

    pub fn into_substitution(self) -> Option<Substitution> {
        self.success.then_some(self.substitution)
    }
}

pub struct ExprMatcher<'o> {
    options: &'o MatchOptions,
}

impl<'o> ExprMatcher<'o> {
    pub fn new(options: &'o MatchOptions) -> Self {
        Self { options }
    }

    pub fn match_expr(&self, pattern: &Expr, subject: &Expr) -> MatchResult {
        let mut run = MatchRun {
            queue: VecDeque::from([pattern]),
            subst: Substitution::new(),
            options: self.options,
        };
        let outcome = run.visit(subject).and_then(|()| match run.queue.len() {
            0 => Ok(()),
            remaining => Err(Mismatch::PatternLeftover { remaining }),
        });
        match outcome {
            Ok(()) => {
                tracing::trace!(
                    %pattern,
                    %subject,
                    values = run.subst.values.len(),
                    functions = run.subst.functions.len(),
                    "expression matched"
                );
                MatchResult::matched(run.subst)
            }
            Err(reason) => {
                tracing::debug!(%pattern, %subject, ?reason, "expression match failed");
                MatchResult::failed(reason)
            }
        }
    }

    /// Tries `pattern` against each expression `cmd` evaluates, in order,
    /// and returns the first success (or the last failure).
    pub fn match_in_cmd(&self, pattern: &Expr, cmd: &Cmd) -> MatchResult {
        let candidates: Vec<&Expr> = match &cmd.kind {
            CmdKind::Assert(e) | CmdKind::Assume(e) => vec![e],
            CmdKind::Assign(pairs) => pairs.iter().map(|(_, rhs)| rhs).collect(),
            CmdKind::Call { ins, .. } => ins.iter().collect(),
            CmdKind::Havoc(_) => Vec::new(),
        };
        let mut last = MatchResult::failed(Mismatch::NoCandidate);
        for subject in candidates {
            last = self.match_expr(pattern, subject);
            if last.success {
                break;
            }
        }
        last
    }
}

struct MatchRun<'p, 'o> {
    queue: VecDeque<&'p Expr>,
    subst: Substitution,
    options: &'o MatchOptions,
}

impl<'p> MatchRun<'p, '_> {
    fn visit(&mut self, subject: &Expr) -> Result<(), Mismatch> {
        let front = self.queue.pop_front().ok_or(Mismatch::PatternExhausted)?;

        // A wildcard takes the whole subject subtree, whatever its kind.
        if let ExprKind::Ident(wildcard) = &front.kind {
            return self.capture(wildcard, subject);
        }

        match (&front.kind, &subject.kind) {
            (ExprKind::Literal(p), ExprKind::Literal(s)) => {
                if p == s {
                    Ok(())
                } else {
                    Err(Mismatch::LiteralMismatch)
                }
            }
            (
                ExprKind::Apply {
                    func: pfunc,
                    args: pargs,
                },
                ExprKind::Apply { func, args },
            ) => {
                if pargs.len() != args.len() {
                    return Err(Mismatch::ArityMismatch {
                        expected: pargs.len(),
                        found: args.len(),
                    });
                }
                self.unify_function(pfunc, func)?;
                for p in pargs.iter().rev() {
                    self.queue.push_front(p);
                }
                for arg in args {
                    self.visit(arg)?;
                }
                Ok(())
            }
            (
                ExprKind::Quantified {
                    kind: pkind,
                    bound: pbound,
                    body: pbody,
                },
                ExprKind::Quantified { kind, bound, body },
            ) => {
                if pkind != kind || pbound.len() != bound.len() {
                    return Err(Mismatch::QuantifierMismatch);
                }
                for (pb, sb) in pbound.iter().zip(bound) {
                    if pb.decl.is_some() {
                        self.capture(pb, &Expr::new(subject.span, ExprKind::Ident(sb.clone())))?;
                    }
                }
                self.queue.push_front(pbody);
                self.visit(body)
            }
            _ => Err(Mismatch::KindMismatch {
                pattern: front.kind_name(),
                subject: subject.kind_name(),
            }),
        }
    }

    fn capture(&mut self, wildcard: &IdentRef, subject: &Expr) -> Result<(), Mismatch> {
        let Some(decl) = wildcard.decl else {
            return Err(Mismatch::UnresolvedWildcard {
                name: wildcard.name.clone(),
            });
        };
        match self.subst.values.get(&decl) {
            Some(prev) if prev.structurally_eq(subject) => Ok(()),
            Some(_) => Err(Mismatch::InconsistentBinding {
                name: wildcard.name.clone(),
            }),
            None => {
                self.subst.values.insert(decl, subject.clone());
                Ok(())
            }
        }
    }

    fn unify_function(&mut self, pattern: &FunctionSymbol, subject: &FunctionSymbol) -> Result<(), Mismatch> {
        let name = pattern.function_name();
        let previous = self.subst.functions.get(name);

        if pattern == subject {
            return match previous {
                Some(prev) if self.options.strict_function_capture && prev != subject => {
                    Err(Mismatch::InconsistentFunction { name: name.to_string() })
                }
                Some(_) => Ok(()),
                // A user function matched by itself is still a capture.
                None if pattern.is_user_function() => {
                    self.subst.functions.insert(name.to_string(), subject.clone());
                    Ok(())
                }
                None => Ok(()),
            };
        }

        if !pattern.is_user_function() {
            return Err(Mismatch::FunctionMismatch {
                pattern: name.to_string(),
                subject: subject.function_name().to_string(),
            });
        }

        match previous {
            Some(prev) if self.options.strict_function_capture && prev != subject => {
                Err(Mismatch::InconsistentFunction { name: name.to_string() })
            }
            // First capture wins.
            Some(_) => Ok(()),
            None => {
                tracing::trace!(pattern = name, subject = subject.function_name(), "function captured");
                self.subst.functions.insert(name.to_string(), subject.clone());
                Ok(())
            }
        }
    }
}
