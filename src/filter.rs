//! Filter sub-language environment (§6).
//!
//! The crate specifies only the environment a safe user expression runs
//! in, not the grammar/evaluator internals (explicitly out of scope, §1).
//! We provide that environment on top of `evalexpr`, an ecosystem crate
//! for safe arithmetic/boolean expression evaluation with no attribute
//! access, indexing or imports by construction — matching the spec's
//! "environment it runs in" framing rather than reimplementing an AST
//! walker the way `original_source/hepconduit/filtering.py` does.

use evalexpr::{context_map, ContextWithMutableFunctions, EvalexprError, HashMapContext, Node, Value};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::event::Event;

lazy_static! {
    // Word boundaries keep these from matching inside identifiers such as
    // `android` or `note`; `evalexpr` itself only understands `&&`/`||`/`!`.
    static ref WORD_AND: Regex = Regex::new(r"\band\b").unwrap();
    static ref WORD_OR: Regex = Regex::new(r"\bor\b").unwrap();
    static ref WORD_NOT: Regex = Regex::new(r"\bnot\b").unwrap();
}

/// Rewrite the spec's `and`/`or`/`not` word operators (§6/§8) into the
/// symbolic form `evalexpr::build_operator_tree` actually understands.
fn rewrite_word_operators(expr: &str) -> String {
    let expr = WORD_AND.replace_all(expr, "&&");
    let expr = WORD_OR.replace_all(&expr, "||");
    WORD_NOT.replace_all(&expr, "!").into_owned()
}

#[derive(Debug, Error)]
pub enum UnsafeFilterExpression {
    #[error("filter expression is not valid: {0}")]
    Parse(#[from] EvalexprError),
    #[error("filter expression did not evaluate to a boolean")]
    NotBoolean,
}

/// A compiled, pure filter predicate over an event's derived scalars.
pub struct CompiledFilter {
    node: Node,
}

/// Compile `expr` against the fixed environment of §6: comparisons,
/// boolean and/or/not, arithmetic, unary minus, power, and the functions
/// `abs, min, max, round, sqrt, log, exp`. `evalexpr` has no attribute
/// access, indexing, imports or identifier prefixes to reject — anything
/// parseable in its grammar is already within the allowed subset; a
/// reference to a variable outside the fixed environment fails at eval
/// time (undefined identifier), not at compile time.
pub fn compile_filter(expr: &str) -> Result<CompiledFilter, UnsafeFilterExpression> {
    let node = evalexpr::build_operator_tree(&rewrite_word_operators(expr))?;
    Ok(CompiledFilter { node })
}

fn filter_environment(event: &Event) -> HashMapContext {
    let final_particles: Vec<_> = event.final_particles().collect();
    let n_incoming = event.incoming_particles().count();

    let mut n_jets = 0i64;
    let mut n_leptons = 0i64;
    let mut n_photons = 0i64;
    let mut n_neutrinos = 0i64;
    let mut ht = 0.0f64;
    let mut met_x = 0.0f64;
    let mut met_y = 0.0f64;

    for p in &final_particles {
        let aid = p.pdg_id.abs();
        let pt = p.pt();
        if (1..=6).contains(&aid) || aid == 21 {
            n_jets += 1;
            ht += pt;
        } else if matches!(aid, 11 | 13 | 15) {
            n_leptons += 1;
            ht += pt;
        } else if matches!(aid, 12 | 14 | 16) {
            n_neutrinos += 1;
            met_x += p.px;
            met_y += p.py;
        } else if aid == 22 {
            n_photons += 1;
            ht += pt;
        } else {
            ht += pt;
        }
    }
    let met = met_x.hypot(met_y);

    context_map! {
        "n_particles" => event.particles.len() as i64,
        "n_final" => final_particles.len() as i64,
        "n_incoming" => n_incoming as i64,
        "weight" => event.weight(),
        "process_id" => event.process_id as i64,
        "scale" => event.scale,
        "alpha_qed" => event.alpha_qed,
        "alpha_qcd" => event.alpha_qcd,
        "n_jets" => n_jets,
        "n_leptons" => n_leptons,
        "n_photons" => n_photons,
        "n_neutrinos" => n_neutrinos,
        "ht" => ht,
        "met" => met,
    }
    .expect("context_map literal construction cannot fail")
}

fn install_functions(ctx: &mut HashMapContext) {
    use evalexpr::Function;

    let unary = |f: fn(f64) -> f64| {
        Function::new(move |arg: &Value| {
            let x = arg.as_number()?;
            Ok(Value::Float(f(x)))
        })
    };

    ctx.set_function("abs".to_string(), unary(f64::abs)).unwrap();
    ctx.set_function("sqrt".to_string(), unary(f64::sqrt)).unwrap();
    ctx.set_function("log".to_string(), unary(f64::ln)).unwrap();
    ctx.set_function("exp".to_string(), unary(f64::exp)).unwrap();
    ctx.set_function(
        "round".to_string(),
        Function::new(|arg: &Value| Ok(Value::Float(arg.as_number()?.round()))),
    )
    .unwrap();
    ctx.set_function(
        "min".to_string(),
        Function::new(|arg: &Value| {
            let tuple = arg.as_fixed_len_tuple(2)?;
            Ok(Value::Float(tuple[0].as_number()?.min(tuple[1].as_number()?)))
        }),
    )
    .unwrap();
    ctx.set_function(
        "max".to_string(),
        Function::new(|arg: &Value| {
            let tuple = arg.as_fixed_len_tuple(2)?;
            Ok(Value::Float(tuple[0].as_number()?.max(tuple[1].as_number()?)))
        }),
    )
    .unwrap();
}

impl CompiledFilter {
    /// Evaluate the filter against one event.
    pub fn matches(&self, event: &Event) -> Result<bool, UnsafeFilterExpression> {
        let mut ctx = filter_environment(event);
        install_functions(&mut ctx);
        let value = self.node.eval_with_context(&ctx)?;
        value.as_boolean().map_err(|_| UnsafeFilterExpression::NotBoolean)
    }
}

/// Compile and immediately return a boxed predicate, the shape
/// `compile_filter_fn` takes in the original (§8 testable property:
/// `compile_filter_fn("n_leptons >= 1 and ht > 0")` succeeds and is pure).
pub fn compile_filter_fn(
    expr: &str,
) -> Result<impl Fn(&Event) -> Result<bool, UnsafeFilterExpression>, UnsafeFilterExpression> {
    let compiled = compile_filter(expr)?;
    Ok(move |event: &Event| compiled.matches(event))
}

/// Lazily filter a stream of events by a compiled predicate.
pub struct FilteredStream<I> {
    inner: I,
    filter: CompiledFilter,
}

impl<I> FilteredStream<I> {
    pub fn new(inner: I, filter: CompiledFilter) -> Self {
        FilteredStream { inner, filter }
    }
}

impl<I, E> Iterator for FilteredStream<I>
where
    I: Iterator<Item = Result<Event, E>>,
    E: From<UnsafeFilterExpression>,
{
    type Item = Result<Event, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.inner.next()?;
            let event = match next {
                Ok(event) => event,
                Err(err) => return Some(Err(err)),
            };
            match self.filter.matches(&event) {
                Ok(true) => return Some(Ok(event)),
                Ok(false) => continue,
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Particle;

    fn event_with_lepton() -> Event {
        Event {
            particles: vec![Particle {
                status: 1,
                pdg_id: 11,
                px: 10.0,
                py: 0.0,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn safe_expression_compiles_and_is_pure() {
        let filter = compile_filter_fn("n_leptons >= 1 and ht > 0").unwrap();
        let event = event_with_lepton();
        assert!(filter(&event).unwrap());
        assert!(filter(&event).unwrap());
    }

    #[test]
    fn unsafe_syntax_is_rejected_at_compile_time() {
        assert!(compile_filter("not_a_real_identifier_but_(((").is_err());
    }

    #[test]
    fn or_and_not_word_operators_evaluate_correctly() {
        let event = event_with_lepton();
        let filter = compile_filter_fn("n_jets >= 1 or n_leptons >= 1").unwrap();
        assert!(filter(&event).unwrap());
        let filter = compile_filter_fn("not (n_leptons == 0)").unwrap();
        assert!(filter(&event).unwrap());
        let filter = compile_filter_fn("n_jets >= 1 and not (n_leptons >= 1)").unwrap();
        assert!(!filter(&event).unwrap());
    }

    #[test]
    fn jets_are_classified_by_absolute_pdg() {
        let event = Event {
            particles: vec![Particle {
                status: 1,
                pdg_id: -5,
                px: 3.0,
                py: 4.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        let filter = compile_filter_fn("n_jets == 1 and ht > 4.9").unwrap();
        assert!(filter(&event).unwrap());
    }
}
