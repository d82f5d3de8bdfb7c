//! RuleGroup: a lexical scope of variables, macros, and rules that
//! compiles down to one `TranscriptionTree` (spec section 4 "RuleGroup").
//!
//! Finalization runs in three phases, matching the authoring model: code
//! statements (variable bindings and macro deployments) run first and can
//! append more raw rule text to the same scope; only once no more code
//! statements remain are the accumulated rule lines expanded into
//! `SubRule`s; only once every rule line has expanded is the tree built.
//! Running macro deployment before rule expansion is what makes "deploy
//! re-parses the macro body as more raw rule text" (`macro_def.rs`) work:
//! a deployed macro's rule lines need to go through the same variable
//! substitution and expansion as hand-written ones.

use crate::error::FinalizeError;
use crate::macro_def::{Macro, MacroTable};
use crate::options::OptionsMap;
use crate::rule::{Rule, SubRule};
use crate::tree::TranscriptionTree;
use crate::variable::VariableTable;

/// A `deploy ... if [not] <option>` guard: the deployment only runs when
/// the named option's truthiness matches (spec 4.3 "deploy macros when
/// their conditions on the active option map evaluate true").
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeployGuard {
    option: String,
    negated: bool,
}

impl DeployGuard {
    fn satisfied(&self, options: &OptionsMap) -> bool {
        let truthy = options.get(&self.option).is_some_and(|v| v.is_truthy());
        truthy != self.negated
    }
}

/// One statement in a rule group's source text, before finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    /// `var name = text;`
    VarDef { name: String, value: String },
    /// `macro name(p1, p2) { body };`
    MacroDef(Macro),
    /// `deploy name(arg1, arg2) [if [not] opt];`
    Deploy {
        name: String,
        args: Vec<String>,
        guard: Option<DeployGuard>,
    },
    /// A plain rule line, to be substituted and parsed once all code
    /// statements (including macro deployments) have run.
    RuleLine { text: String, line_no: usize },
}

/// A named lexical scope: its own variables, macros, and rules, compiling
/// to its own trie.
#[derive(Debug, Clone, Default)]
pub struct RuleGroup {
    pub name: String,
    statements: Vec<Statement>,
}

impl RuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statements: Vec::new(),
        }
    }

    /// Parse a rule group's raw body text (one statement per logical line,
    /// already stripped of group `{ }` delimiters by the caller).
    pub fn parse_body(&mut self, body: &str, line_offset: usize) -> Result<(), crate::error::ParseError> {
        for (i, raw_line) in body.lines().enumerate() {
            let line_no = line_offset + i + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let line = line.trim_end_matches(';').trim();

            if let Some(rest) = line.strip_prefix("var ") {
                let (name, value) = rest.split_once('=').ok_or_else(|| {
                    crate::error::ParseError::new(line_no, 1, "'var name = value'", line.to_string())
                })?;
                self.statements.push(Statement::VarDef {
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                });
            } else if let Some(rest) = line.strip_prefix("macro ") {
                self.statements.push(Statement::MacroDef(parse_macro_def(rest, line_no)?));
            } else if let Some(rest) = line.strip_prefix("deploy ") {
                let (name, args, guard) = parse_deploy(rest, line_no)?;
                self.statements.push(Statement::Deploy { name, args, guard });
            } else {
                self.statements.push(Statement::RuleLine {
                    text: line.to_string(),
                    line_no,
                });
            }
        }
        Ok(())
    }

    /// Run the three-phase finalize: execute code statements (binding
    /// variables, registering and deploying macros whose guard passes
    /// against `options`, appending deployed text as more rule lines),
    /// expand every rule line into `SubRule`s, then install them into a
    /// `TranscriptionTree`. Errors are accumulated, not returned early
    /// (spec 4.3).
    pub fn finalize(&self, options: &OptionsMap) -> (TranscriptionTree, Vec<FinalizeError>) {
        let mut errors = Vec::new();
        let mut vars = VariableTable::new();
        let mut macros = MacroTable::new();
        let mut rule_lines: Vec<(String, usize)> = Vec::new();
        let mut pending: Vec<Statement> = self.statements.clone();
        let mut depth = 0usize;

        loop {
            let mut deployed_any = false;
            let mut next_round = Vec::new();

            for statement in pending {
                match statement {
                    Statement::VarDef { name, value } => match vars.substitute(&value) {
                        Ok(resolved) => vars.bind(name, resolved),
                        Err(e) => errors.push(e),
                    },
                    Statement::MacroDef(m) => macros.define(m),
                    Statement::Deploy { name, args, guard } => {
                        if guard.as_ref().is_some_and(|g| !g.satisfied(options)) {
                            log::debug!("skipping deploy of '{name}': guard not satisfied");
                            continue;
                        }
                        match macros.deploy(&name, &args, depth) {
                            Ok(body_text) => {
                                deployed_any = true;
                                for (i, line) in body_text.lines().enumerate() {
                                    next_round.push(Statement::RuleLine {
                                        text: line.to_string(),
                                        line_no: i + 1,
                                    });
                                }
                            }
                            Err(e) => errors.push(e),
                        }
                    }
                    Statement::RuleLine { text, line_no } => rule_lines.push((text, line_no)),
                }
            }

            if !deployed_any || next_round.is_empty() {
                break;
            }
            depth += 1;
            pending = next_round;
        }

        let mut subrules: Vec<SubRule> = Vec::new();
        for (text, line_no) in rule_lines {
            let substituted = match vars.substitute(&text) {
                Ok(s) => s,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            match Rule::parse(&substituted, line_no) {
                Ok(rule) => match rule.finalize() {
                    Ok(mut expanded) => subrules.append(&mut expanded),
                    Err(e) => errors.push(e),
                },
                Err(e) => errors.push(FinalizeError::UnresolvedVariable(e.to_string())),
            }
        }

        let mut tree = TranscriptionTree::new();
        for (priority, subrule) in subrules.into_iter().enumerate() {
            tree.insert(subrule, priority);
        }

        (tree, errors)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_macro_def(rest: &str, line_no: usize) -> Result<Macro, crate::error::ParseError> {
    let open_paren = rest
        .find('(')
        .ok_or_else(|| crate::error::ParseError::new(line_no, 1, "'('", rest.to_string()))?;
    let close_paren = rest
        .find(')')
        .ok_or_else(|| crate::error::ParseError::new(line_no, 1, "')'", rest.to_string()))?;
    let name = rest[..open_paren].trim().to_string();
    let params: Vec<String> = rest[open_paren + 1..close_paren]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let open_brace = rest
        .find('{')
        .ok_or_else(|| crate::error::ParseError::new(line_no, 1, "'{'", rest.to_string()))?;
    let close_brace = rest
        .rfind('}')
        .ok_or_else(|| crate::error::ParseError::new(line_no, 1, "'}'", rest.to_string()))?;
    let body = rest[open_brace + 1..close_brace].trim().to_string();

    Ok(Macro::new(name, params, body))
}

#[allow(clippy::type_complexity)]
fn parse_deploy(
    rest: &str,
    line_no: usize,
) -> Result<(String, Vec<String>, Option<DeployGuard>), crate::error::ParseError> {
    let open_paren = rest
        .find('(')
        .ok_or_else(|| crate::error::ParseError::new(line_no, 1, "'('", rest.to_string()))?;
    let close_paren = rest
        .find(')')
        .ok_or_else(|| crate::error::ParseError::new(line_no, 1, "')'", rest.to_string()))?;
    let name = rest[..open_paren].trim().to_string();
    let args: Vec<String> = rest[open_paren + 1..close_paren]
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let guard = match rest[close_paren + 1..].trim().strip_prefix("if ") {
        Some(cond) => {
            let cond = cond.trim();
            if let Some(negated) = cond.strip_prefix("not ") {
                Some(DeployGuard {
                    option: negated.trim().to_string(),
                    negated: true,
                })
            } else {
                Some(DeployGuard {
                    option: cond.to_string(),
                    negated: false,
                })
            }
        }
        None => None,
    };

    Ok((name, args, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalizes_simple_rule_group_with_no_errors() {
        let mut group = RuleGroup::new("consonants");
        group.parse_body("(t,c) --> (tinco,calma);", 0).unwrap();
        let (tree, errors) = group.finalize(&OptionsMap::new());
        assert!(errors.is_empty());
        assert!(tree.len() >= 2);
    }

    #[test]
    fn variable_binding_feeds_later_rule_lines() {
        let mut group = RuleGroup::new("vowels");
        group.parse_body("var v = (a,e,i);\nt{v} --> tinco;", 0).unwrap();
        let (tree, errors) = group.finalize(&OptionsMap::new());
        assert!(errors.is_empty());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn macro_deployment_appends_reparsed_rule_lines() {
        let mut group = RuleGroup::new("nasal");
        group
            .parse_body(
                "macro nasal(base) { {base}n --> {base}tilde };\ndeploy nasal(m);",
                0,
            )
            .unwrap();
        let (tree, errors) = group.finalize(&OptionsMap::new());
        assert!(errors.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn unknown_variable_is_accumulated_not_fatal() {
        let mut group = RuleGroup::new("broken");
        group
            .parse_body("t{missing} --> tinco;\nc --> calma;", 0)
            .unwrap();
        let (tree, errors) = group.finalize(&OptionsMap::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn guarded_deploy_runs_only_when_option_is_truthy() {
        let mut group = RuleGroup::new("archaic");
        group
            .parse_body(
                "macro arch(base) { {base}y --> {base}anna };\ndeploy arch(l) if archaic;",
                0,
            )
            .unwrap();

        let (tree, errors) = group.finalize(&OptionsMap::new());
        assert!(errors.is_empty());
        assert_eq!(tree.len(), 0);

        let mut options = OptionsMap::new();
        options.insert("archaic".to_string(), crate::options::OptionValue::Bool(true));
        let (tree, errors) = group.finalize(&options);
        assert!(errors.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn negated_guard_runs_when_option_is_absent() {
        let mut group = RuleGroup::new("modern");
        group
            .parse_body(
                "macro mod_rule(base) { {base}y --> {base}anna };\ndeploy mod_rule(l) if not archaic;",
                0,
            )
            .unwrap();

        let (tree, errors) = group.finalize(&OptionsMap::new());
        assert!(errors.is_empty());
        assert_eq!(tree.len(), 1);
    }
}
