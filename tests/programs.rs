#![expect(clippy::unwrap_used)] // test code OK

use std::fs;

use lispy::evaluator::create_global_env_with_config;
use lispy::{
    Environment, Error, ParseConfig, Value, create_global_env, eval, load_library, read_forms,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Evaluate every form of `source`, returning the rendered results
fn run(env: &mut Environment, source: &str) -> Vec<String> {
    read_forms(source, &env.parse_config())
        .unwrap()
        .into_iter()
        .map(|form| eval(env, form).to_string())
        .collect()
}

fn run_last(env: &mut Environment, source: &str) -> String {
    run(env, source).pop().unwrap_or_default()
}

/// Source text of a `load` call for `path`, escaped the way strings print
fn load_call(path: &std::path::Path) -> String {
    format!("(load {})", Value::String(path.to_string_lossy().into_owned()))
}

#[test]
fn test_whole_programs() {
    let programs: Vec<(&str, &str)> = vec![
        ("(+ 1 2) (* 3 4)", "12"),
        (
            "(def {fib} (\\ {n} {if (< n 2) {n} {+ (fib (- n 1)) (fib (- n 2))}}))
             (fib 15)",
            "610",
        ),
        (
            "(def {add} (\\ {x y} {+ x y}))
             (def {add10} (add 10))
             (list (add10 1) (add10 2))",
            "{11 12}",
        ),
        (
            "(def {count-args} (\\ {& xs} {len xs}))
             (list (count-args) (count-args 1 2 3))",
            "{0 3}",
        ),
        (
            "(def {apply-to-list} (\\ {f l} {eval (join (list f) l)}))
             (apply-to-list + {1 2 3 4})",
            "10",
        ),
        ("(print \"hello\" 1 {2})", "()"),
        ("(print-env)", "()"),
        ("(eval {head (list 1 2 3)})", "{1}"),
        ("(if (>= 3 3) {\"yes\"} {\"no\"})", "\"yes\""),
        ("(join {\"a\\nb\"} {x})", "{\"a\\nb\" x}"),
    ];

    for (i, (source, expected)) in programs.into_iter().enumerate() {
        let mut env = create_global_env();
        assert_eq!(run_last(&mut env, source), expected, "program #{}", i + 1);
    }
}

#[test]
fn test_errors_do_not_stop_a_session() {
    let mut env = create_global_env();
    let results = run(
        &mut env,
        "(def {a} 1) (head {}) (+ a nope) (def {b} 2) (+ a b)",
    );
    assert_eq!(
        results,
        vec![
            "()",
            "Error: head: empty list",
            "Error: Unbound symbol: nope",
            "()",
            "3"
        ]
    );
}

#[test]
fn test_load_evaluates_forms_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.lspy");
    fs::write(
        &path,
        "; helpers\n(def {double} (\\ {x} {* x 2}))\n(head {})\n(def {four} (double 2))\n",
    )
    .unwrap();

    let mut env = create_global_env();
    // The failing form in the middle does not stop the forms after it
    assert_eq!(run_last(&mut env, &load_call(&path)), "()");
    assert_eq!(run_last(&mut env, "four"), "4");
    assert_eq!(run_last(&mut env, "(double 21)"), "42");
}

#[test]
fn test_load_defines_globally_from_inside_a_function() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defs.lspy");
    fs::write(&path, "(def {loaded} 99)").unwrap();

    let mut env = create_global_env();
    let source = format!("(def {{load-it}} (\\ {{}} {{{}}}))", load_call(&path));
    run(&mut env, &source);
    assert_eq!(run_last(&mut env, "(load-it)"), "()");
    assert_eq!(run_last(&mut env, "loaded"), "99");
}

#[test]
fn test_load_failures_are_error_values() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.lspy");
    fs::write(&broken, "(def {x} 1) (+ 1").unwrap();
    let missing = dir.path().join("missing.lspy");

    let mut env = create_global_env();
    let result = run_last(&mut env, &load_call(&broken));
    assert!(result.starts_with("Error: could not load library"), "{result}");
    assert!(result.contains("unexpected end of input"), "{result}");
    // Nothing of a file that does not parse is evaluated
    assert_eq!(run_last(&mut env, "x"), "Error: Unbound symbol: x");

    let result = load_library(&mut env, &missing.to_string_lossy());
    let Value::Error(Error::Load { path, .. }) = result else {
        panic!("expected a load error, got {result:?}");
    };
    assert_eq!(path, missing.to_string_lossy());

    assert_eq!(
        run_last(&mut env, "(load 42)"),
        "Error: load: expected String, got Number at position 0"
    );
}

#[test]
fn test_load_uses_the_global_parse_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("commented.lspy");
    fs::write(&path, "(def {y} 2) ; trailing comment").unwrap();

    let mut strict = create_global_env_with_config(ParseConfig {
        handle_comments: false,
        ..ParseConfig::default()
    });
    let result = load_library(&mut strict, &path.to_string_lossy());
    assert!(result.is_error());

    let mut env = create_global_env();
    assert_eq!(load_library(&mut env, &path.to_string_lossy()), Value::unit());
    assert_eq!(run_last(&mut env, "y"), "2");
}

proptest! {
    #[test]
    fn prop_addition_matches_checked_integer_addition(a in any::<i64>(), b in any::<i64>()) {
        let mut env = create_global_env();
        let expected = match a.checked_add(b) {
            Some(sum) => sum.to_string(),
            None => "Error: +: integer overflow".to_owned(),
        };
        prop_assert_eq!(run_last(&mut env, &format!("(+ {a} {b})")), expected);
    }

    #[test]
    fn prop_division_by_zero_is_an_error(a in any::<i64>()) {
        let mut env = create_global_env();
        prop_assert_eq!(run_last(&mut env, &format!("(/ {a} 0)")), "Error: division by zero");
    }

    #[test]
    fn prop_comparisons_agree_with_integers(a in -1000i64..1000, b in -1000i64..1000) {
        let mut env = create_global_env();
        let source = format!("(< {a} {b}) (<= {a} {b}) (== {a} {b}) (!= {a} {b})");
        let rendered = run(&mut env, &source);
        let expected: Vec<String> = [a < b, a <= b, a == b, a != b]
            .iter()
            .map(|holds| i64::from(*holds).to_string())
            .collect();
        prop_assert_eq!(rendered, expected);
    }
}
