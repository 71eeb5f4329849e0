#![expect(clippy::unwrap_used)] // test code OK

use lispy::{
    EVAL_STACK_SIZE, Environment, Value, create_global_env, eval, load_library, read_forms,
};
use pretty_assertions::assert_eq;

const STDLIB: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/stdlib.lspy");

fn stdlib_env() -> Environment {
    let mut env = create_global_env();
    assert_eq!(load_library(&mut env, STDLIB), Value::unit());
    env
}

fn eval_str(env: &mut Environment, source: &str) -> String {
    read_forms(source, &env.parse_config())
        .unwrap()
        .into_iter()
        .map(|form| eval(env, form).to_string())
        .last()
        .unwrap_or_default()
}

#[test]
fn test_stdlib_functions_data_driven() {
    let test_cases = vec![
        // Atoms and logic
        ("nil", "{}"),
        ("(list true false)", "{1 0}"),
        ("(not true)", "0"),
        ("(not 0)", "1"),
        ("(and 1 5)", "1"),
        ("(and 1 0)", "0"),
        ("(or 0 0)", "0"),
        ("(or 0 -2)", "1"),
        // Function definition
        ("(fun {square x} {* x x}) (square 7)", "49"),
        ("(fun {sum-all & xs} {sum xs}) (sum-all 1 2 3 4)", "10"),
        // Packing
        ("(unpack + {1 2 3})", "6"),
        ("(curry * {2 3 4})", "24"),
        ("(pack head 5 6 7)", "{5}"),
        ("(uncurry len 1 2 3)", "3"),
        // Sequencing and scope
        ("(do (def {seen} 1) (+ seen 1))", "2"),
        ("(let {do (= {inner} 5) inner})", "5"),
        ("(let {do (= {inner} 5) inner}) inner", "Error: Unbound symbol: inner"),
        // Combinators
        ("(flip - 1 10)", "9"),
        ("(comp - (\\ {x} {* x 2}) 5)", "-10"),
        // List access
        ("(first {7 8 9})", "7"),
        ("(second {7 8 9})", "8"),
        ("(third {7 8 9})", "9"),
        ("(first {{1 2} 3})", "{1 2}"),
        ("(nth 1 {\"a\" \"b\"})", "\"b\""),
        ("(last {1 2 3})", "3"),
        ("(first {})", "Error: head: empty list"),
        // Slicing
        ("(take 2 {1 2 3})", "{1 2}"),
        ("(drop 2 {1 2 3})", "{3}"),
        ("(split 1 {1 2 3})", "{{1} {2 3}}"),
        ("(elem 2 {1 2 3})", "1"),
        ("(elem 4 {1 2 3})", "0"),
        // Higher order
        ("(map (\\ {x} {* x 10}) {1 2 3})", "{10 20 30}"),
        ("(map - {1 2})", "{-1 -2}"),
        ("(filter (\\ {x} {> x 1}) {0 1 2 3})", "{2 3}"),
        ("(foldl (\\ {acc x} {- acc x}) 10 {1 2 3})", "4"),
        ("(sum {1 2 3 4 5})", "15"),
        ("(product {1 2 3 4 5})", "120"),
        ("(reverse {1 2 3})", "{3 2 1}"),
        ("(reverse nil)", "{}"),
        ("(map (flip - 1) {5 6})", "{4 5}"),
    ];

    for (i, (source, expected)) in test_cases.into_iter().enumerate() {
        let mut env = stdlib_env();
        assert_eq!(eval_str(&mut env, source), expected, "stdlib case #{} ('{source}')", i + 1);
    }
}

/// Run on a thread with the stack evaluation is sized for
fn with_eval_stack(f: impl FnOnce() + Send + 'static) {
    std::thread::Builder::new()
        .stack_size(EVAL_STACK_SIZE)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn test_stdlib_recursion_over_long_lists() {
    with_eval_stack(|| {
        let numbers: Vec<String> = (0..1000).map(|n| n.to_string()).collect();
        let list = format!("{{{}}}", numbers.join(" "));

        let test_cases = vec![
            (format!("(len (map (\\ {{x}} {{x}}) {list}))"), "1000"),
            (format!("(last (map (\\ {{x}} {{* x 2}}) {list}))"), "1998"),
            (format!("(last {list})"), "999"),
            (format!("(nth 998 {list})"), "998"),
            (format!("(sum {list})"), "499500"),
            (format!("(len (filter (\\ {{x}} {{> x 499}}) {list}))"), "500"),
            (format!("(first (reverse {list}))"), "999"),
            (format!("(len (take 900 (drop 50 {list})))"), "900"),
            (format!("(elem 999 {list})"), "1"),
        ];

        let mut env = stdlib_env();
        for (i, (source, expected)) in test_cases.into_iter().enumerate() {
            assert_eq!(eval_str(&mut env, &source), expected, "long list case #{}", i + 1);
        }
    });
}

#[test]
fn test_stdlib_definitions_are_printable() {
    let mut env = stdlib_env();
    assert_eq!(eval_str(&mut env, "first"), "(\\ {l} {eval (head l)})");
    assert_eq!(eval_str(&mut env, "pack"), "(\\ {f & xs} {f xs})");
}
