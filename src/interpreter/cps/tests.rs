#![allow(unused_imports)]

use crate::interpreter::cps::env::Env;
use crate::interpreter::cps::error::*;
use crate::interpreter::cps::printer::print;
use crate::interpreter::cps::trampoline::*;
use crate::interpreter::cps::value::*;
use crate::interpreter::cps::*;
use crate::interpreter::Error;

#[cfg(test)]
mod test_trampoline {
    use super::*;
    use crate::interpreter::cps::cont::memo;

    #[test]
    fn test_quasiquote_atom_lands() {
        let rt = Interpreter::bare();
        let result = quasiquote_bounce(&rt, Value::Number(42.0), rt.root(), Cont::Return).unwrap();
        match result {
            Trampoline::Land(Value::Number(n)) => assert_eq!(n, 42.0),
            _ => panic!("Expected Land(42), got {:?}", result),
        }
    }

    #[test]
    fn test_quasiquote_unquote_bounces() {
        let rt = Interpreter::bare();
        let form = Value::list(vec![Value::symbol("unquote"), Value::Number(42.0)]);
        let result = quasiquote_bounce(&rt, form, rt.root(), Cont::Return).unwrap();
        match result {
            Trampoline::Bounce(Value::Number(n), _, Cont::Return) => assert_eq!(n, 42.0),
            _ => panic!("Expected Bounce with the unquoted expression, got {:?}", result),
        }
    }

    #[test]
    fn test_unbound_symbol() {
        let rt = Interpreter::bare();
        let err = bounce(&rt, Value::symbol("missing"), rt.root(), Cont::Return).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnboundSymbol);
        assert_eq!(err.message, "Symbol 'missing' not found");
    }

    #[test]
    fn test_return_lands() {
        let rt = Interpreter::bare();
        match Cont::Return.run(&rt, Value::Boolean(true)).unwrap() {
            Trampoline::Land(Value::Boolean(true)) => (),
            other => panic!("Expected Land(true), got {:?}", other),
        }
    }

    #[test]
    fn test_memo_frames_merge() {
        let node = Value::list(vec![Value::symbol("f")]);
        let other = Value::list(vec![Value::symbol("g")]);
        let k = memo(node.clone(), Cont::Return);
        let k = memo(other, k);
        let k = memo(node, k);
        match &k {
            Cont::Memo(nodes, next) => {
                assert_eq!(nodes.len(), 2);
                assert!(matches!(**next, Cont::Return));
            }
            other => panic!("Expected one Memo frame, got {:?}", other),
        }
    }

    #[test]
    fn test_special_form_identification() {
        assert_eq!(SPECIAL_FORMS.get("defsyntax"), Some(&SpecialForm::Defsyntax));
        assert_eq!(SPECIAL_FORMS.get("macroexpand"), Some(&SpecialForm::Macroexpand));
        assert_eq!(SPECIAL_FORMS.get("first"), None);
    }

    #[test]
    fn test_run_literal() {
        let rt = Interpreter::bare();
        let start = Trampoline::Bounce(Value::string("s"), rt.root(), Cont::Return);
        assert_eq!(trampoline::run(&rt, start).unwrap(), Value::string("s"));
    }
}

#[cfg(test)]
mod test_cps {
    use super::*;

    fn exec(src: &str) -> Value {
        let rt = Interpreter::new();
        match rt.read_eval(src) {
            Ok(v) => v,
            Err(e) => panic!("{} failed: {}", src, e),
        }
    }

    fn show(src: &str) -> String { print(&exec(src)) }

    fn fails(src: &str) -> RuntimeError {
        match Interpreter::new().read_eval(src) {
            Err(Error::Runtime(e)) => e,
            other => panic!("Expected a runtime error from {}, got {:?}", src, other),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(exec("(+ 1 2) (+ 3 4)"), Value::Number(7.0));
        assert_eq!(exec("(- 5)"), Value::Number(-5.0));
        assert_eq!(exec("(- 10 1 2)"), Value::Number(7.0));
        assert_eq!(exec("(/ 2)"), Value::Number(0.5));
        assert_eq!(exec("(mod -1 3)"), Value::Number(2.0));
        assert_eq!(show("(* 1.1 3)"), "3.3");
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(exec(""), Value::Nil);
        assert_eq!(exec("(do)"), Value::Nil);
    }

    #[test]
    fn test_if() {
        assert_eq!(exec("(if false 1)"), Value::Nil);
        assert_eq!(exec("(if nil 1 2)"), Value::Number(2.0));
        assert_eq!(exec("(if 0 1 2)"), Value::Number(1.0));
        assert_eq!(fails("(if true)").kind, ErrorKind::Bind);
    }

    #[test]
    fn test_and_or() {
        assert_eq!(exec("(and)"), Value::Boolean(true));
        assert_eq!(exec("(or)"), Value::Nil);
        assert_eq!(exec("(and 1 false 3)"), Value::Boolean(false));
        assert_eq!(exec("(and 1 2 3)"), Value::Number(3.0));
        assert_eq!(exec("(or false 2)"), Value::Number(2.0));
        assert_eq!(exec("(or true (throw \"boom\"))"), Value::Boolean(true));
        assert_eq!(exec("(and false (throw \"boom\"))"), Value::Boolean(false));
    }

    #[test]
    fn test_def_and_fn() {
        assert_eq!(exec("(def x 3)"), Value::Number(3.0));
        assert_eq!(exec("(defn sq [x] (* x x)) (sq 5)"), Value::Number(25.0));
        assert_eq!(exec("(defn f [x] (def y x) (+ y 1)) (f 2)"), Value::Number(3.0));
        assert_eq!(exec("((fn [a & more] more) 1 2 3)"), exec("[2 3]"));
        assert_eq!(exec("((fn [& more] (count more)))"), Value::Number(0.0));
    }

    #[test]
    fn test_closures_capture() {
        let src = "(def make-adder (fn [n] (fn [x] (+ x n)))) ((make-adder 3) 4)";
        assert_eq!(exec(src), Value::Number(7.0));
    }

    #[test]
    fn test_shadowing_in_closure_body() {
        let rt = Interpreter::new();
        rt.read_eval("(def x 1) (defn f [] (def x 2) x)").unwrap();
        assert_eq!(rt.read_eval("(f)").unwrap(), Value::Number(2.0));
        assert_eq!(rt.read_eval("x").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_call_leaves_caller_frame_alone() {
        let rt = Interpreter::new();
        let f = rt.read_eval("(def x 1) (fn [x] (def y x) y)").unwrap();
        let before = rt.root().borrow().values.len();
        let out = rt.apply(&f, vec![Value::Number(5.0)], Some(rt.root())).unwrap();
        assert_eq!(out, Value::Number(5.0));
        assert_eq!(rt.root().borrow().values.len(), before);
        assert_eq!(rt.read_eval("x").unwrap(), Value::Number(1.0));
        assert_eq!(fails("(def g (fn [] 1)) (g) y").kind, ErrorKind::UnboundSymbol);
    }

    #[test]
    fn test_let() {
        assert_eq!(exec("(def x 10) (let [x 1] (+ x 1))"), Value::Number(2.0));
        assert_eq!(exec("(def x 10) (let [x 1] x) x"), Value::Number(10.0));
        assert_eq!(exec("(let [a 1 b (+ a 1)] b)"), Value::Number(2.0));
        assert_eq!(show("(let [[a b & more] [1 2 3 4]] more)"), "[3 4]");
        assert_eq!(show("(let [[a [b c]] [1 [2 3]]] (list a b c))"), "(1 2 3)");
        assert_eq!(fails("(let [a] a)").kind, ErrorKind::Bind);
        assert_eq!(fails("(let [[a b] [1]] a)").kind, ErrorKind::Bind);
    }

    #[test]
    fn test_quoting() {
        assert_eq!(show("'(a b)"), "(a b)");
        assert_eq!(show("(quote [x y])"), "[x y]");
        assert_eq!(exec("(symbol? 'a)"), Value::Boolean(true));
    }

    #[test]
    fn test_quasiquoting() {
        assert_eq!(show("(def xs [2 3]) `(1 ~@xs ~(+ 2 2))"), "(1 2 3 4)");
        assert_eq!(show("`[1 ~(+ 1 1)]"), "[1 2]");
        assert_eq!(show("`(a ~@nil b)"), "(a b)");
        assert_eq!(show("`x"), "x");
        assert_eq!(fails("`(a ~@1)").kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_eval() {
        assert_eq!(exec("(eval (list '+ 1 2))"), Value::Number(3.0));
        assert_eq!(exec("(def x 5) (let [x 1] (eval 'x))"), Value::Number(5.0));
    }

    #[test]
    fn test_collections_evaluate_elements() {
        assert_eq!(show("[1 (+ 1 1)]"), "[1 2]");
        assert_eq!(show("{:a (+ 1 2) :b [1 (+ 1 1)]}"), "{:a 3 :b [1 2]}");
        assert_eq!(show("[]"), "[]");
    }

    #[test]
    fn test_procedural_macro() {
        let src = "(defmacro unless [c body] `(if ~c nil ~body))";
        assert_eq!(exec(&format!("{} (unless false 7)", src)), Value::Number(7.0));
        assert_eq!(exec(&format!("{} (unless true 7)", src)), Value::Nil);
        assert_eq!(show(&format!("{} (macroexpand (unless false 7))", src)), "(if false nil 7)");
        assert_eq!(show("(macroexpand (+ 1 2))"), "(+ 1 2)");
    }

    #[test]
    fn test_native_macros() {
        assert_eq!(exec("(when true 1 2)"), Value::Number(2.0));
        assert_eq!(exec("(when false (throw \"no\"))"), Value::Nil);
        assert_eq!(exec("(cond false 1 true 2)"), Value::Number(2.0));
        assert_eq!(exec("(cond false 1)"), Value::Nil);
        assert_eq!(exec("(-> 5 (- 1) (* 2))"), Value::Number(8.0));
        assert_eq!(show("(macroexpand (when x y))"), "(if x (do y))");
    }

    #[test]
    fn test_error_deep_in_recursion_reaches_host() {
        let err = fails("(defn f [n] (if (= n 0) (throw \"bottom\") (+ 1 (f (- n 1))))) (f 200000)");
        assert_eq!(err.kind, ErrorKind::Thrown);
        assert_eq!(exec("(defn f [n] (if (= n 0) 0 (+ 1 (f (- n 1))))) (f 200000)"), Value::Number(200000.0));
    }

    #[test]
    fn test_constant_expansion_is_cached() {
        let rt = Interpreter::new();
        rt.read_eval("(def counter (atom 0)) (defmacro m [x] (swap! counter (fn [n] (+ n 1))) `(+ ~x 1))")
            .unwrap();
        let program = rt.read("(m 5)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(6.0));
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(6.0));
        assert_eq!(rt.read_eval("(deref counter)").unwrap(), Value::Number(1.0));

        let tree = Tree::new(program.clone());
        let call = tree.at_path(&[0]).unwrap();
        assert!(matches!(tree.expansion(call), Some(Expansion::Constant(..))));
        assert!(tree.is_macro_call(call));
        assert_eq!(print(&rt.expand(tree.node(call).unwrap())), "(+ 5 1)");

        // clearing the cache re-runs the macro and yields the same value
        tree.node(call).unwrap().invalidate();
        assert!(tree.expansion(call).is_none());
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(6.0));
        assert_eq!(rt.read_eval("(deref counter)").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_redefined_macro_is_not_served_from_cache() {
        let rt = Interpreter::new();
        rt.read_eval("(defmacro m [] 1)").unwrap();
        let program = rt.read("(m)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(1.0));
        rt.read_eval("(defmacro m [] 2)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_expansion_reading_a_changed_binding_is_recomputed() {
        let rt = Interpreter::new();
        rt.read_eval("(def n 1) (defmacro m [] n)").unwrap();
        let program = rt.read("(m)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(1.0));
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(1.0));
        rt.read_eval("(def n 2)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(2.0));

        let tree = Tree::new(program.clone());
        let call = tree.at_path(&[0]).unwrap();
        assert_eq!(print(&rt.expand(tree.node(call).unwrap())), "2");
    }

    #[test]
    fn test_outer_expansion_depends_on_inner_reads() {
        let rt = Interpreter::new();
        rt.read_eval("(def k 1) (defmacro inner [] k) (defmacro outer [] (list 'do (inner)))").unwrap();
        let program = rt.read("(outer)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(1.0));
        rt.read_eval("(def k 5)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_failed_expansion_leaves_no_recording_open() {
        let rt = Interpreter::new();
        rt.read_eval("(defmacro bad [] (throw \"no\"))").unwrap();
        assert!(rt.read_eval("(bad)").is_err());
        assert_eq!(rt.recording_depth(), 0);
        assert_eq!(rt.read_eval("(when true 3)").unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_template_macro() {
        let rt = Interpreter::new();
        rt.read_eval("(defsyntax swap-args [f a b] (f b a))").unwrap();
        let program = rt.read("(swap-args - 1 10)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(9.0));

        let tree = Tree::new(program.clone());
        let call = tree.at_path(&[0]).unwrap();
        assert!(matches!(tree.expansion(call), Some(Expansion::Env(_))));
        assert_eq!(print(&rt.expand(tree.node(call).unwrap())), "(- 10 1)");

        assert_eq!(rt.eval(&program).unwrap(), Value::Number(9.0));
        tree.node(call).unwrap().invalidate();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(9.0));
        assert_eq!(fails("(defsyntax bad [a] a a)").kind, ErrorKind::Bind);
    }

    #[test]
    fn test_plain_call_is_not_macro_call() {
        let rt = Interpreter::new();
        let program = rt.read("(+ 1 2)").unwrap();
        rt.eval(&program).unwrap();
        let tree = Tree::new(program);
        let call = tree.at_path(&[0]).unwrap();
        assert!(matches!(tree.expansion(call), Some(Expansion::Unchanged)));
        assert!(!tree.is_macro_call(call));
        assert!(rt.expand(tree.node(call).unwrap()).ptr_eq(tree.node(call).unwrap()));
    }

    #[test]
    fn test_evaluated_values_are_memoized() {
        let rt = Interpreter::new();
        let program = rt.read("(def a (+ 1 2)) (* a 2)").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(6.0));
        let tree = Tree::new(program.clone());

        let sum = tree.node(tree.at_path(&[0, 2]).unwrap()).unwrap();
        assert_eq!(sum.evaluated(), Value::Number(3.0));
        assert_eq!(program.evaluated(), Value::Number(6.0));

        let a = tree.node(tree.at_path(&[1, 1]).unwrap()).unwrap();
        assert_eq!(a.evaluated(), Value::Number(3.0));
        let def = tree.node(tree.at_path(&[0]).unwrap()).unwrap().as_seq().unwrap().clone();
        match a {
            Value::Symbol(sym) => assert!(std::rc::Rc::ptr_eq(&sym.def().unwrap(), &def)),
            other => panic!("Expected a symbol, got {:?}", other),
        }
    }

    #[test]
    fn test_edit_and_rerun() {
        let rt = Interpreter::new();
        let program = rt.read("(def y (+ 1 2)) y").unwrap();
        assert_eq!(rt.eval(&program).unwrap(), Value::Number(3.0));

        let mut tree = Tree::new(program);
        let two = tree.at_path(&[0, 2, 2]).unwrap();
        tree.replace(two, Value::Number(5.0)).unwrap();
        assert_eq!(print(tree.root()), "(def y (+ 1 5)) y");
        assert_eq!(rt.eval(tree.root()).unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_round_trip_after_eval() {
        let src = "(def  x\n  [1 2 , 3])  ; done\n{:a 1,  \"b\" [ ]}\n'(a b) `[c ~x]";
        let rt = Interpreter::new();
        let program = rt.read(src).unwrap();
        assert_eq!(print(&program), src);
        rt.eval(&program).unwrap();
        assert_eq!(print(&program), src);
    }

    #[test]
    fn test_keywords_are_interned() {
        let rt = Interpreter::new();
        let a = rt.read_eval(":k").unwrap();
        let b = rt.read_eval("(keyword \"k\")").unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(exec("(= :k :k)"), Value::Boolean(true));
        assert_eq!(show("(type :k)"), ":keyword");
    }

    #[test]
    fn test_range() {
        assert_eq!(show("(range 0)"), "[]");
        assert_eq!(show("(range 5)"), "[0 1 2 3 4]");
        assert_eq!(show("(range 2 2)"), "[]");
        assert_eq!(show("(range 5 0 -1)"), "[5 4 3 2 1]");
        assert_eq!(show("(range 0 5 2)"), "[0 2 4]");
    }

    #[test]
    fn test_nth() {
        assert_eq!(exec("(nth [1 2 3] -1)"), Value::Number(3.0));
        assert_eq!(exec("(nth '(1 2 3) 0)"), Value::Number(1.0));
        assert_eq!(fails("(nth [1 2 3] 3)").kind, ErrorKind::IndexOutOfRange);
        assert_eq!(fails("(nth [1 2 3] -4)").kind, ErrorKind::IndexOutOfRange);
        assert_eq!(fails("(nth 5 0)").kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(fails("nope").kind, ErrorKind::UnboundSymbol);
        assert_eq!(fails("((fn [a] a))").kind, ErrorKind::Bind);
        assert_eq!(fails("(1 2)").kind, ErrorKind::TypeMismatch);
        assert_eq!(fails("(hash-map 1 2)").kind, ErrorKind::InvalidMapKey);
        assert_eq!(fails("(< :a 1)").kind, ErrorKind::Unsupported);
        assert_eq!(fails("(first 5)").kind, ErrorKind::TypeMismatch);
        assert_eq!(fails("(fn (a) a)").kind, ErrorKind::Bind);

        let thrown = fails("(throw \"boom\")");
        assert_eq!(thrown.kind, ErrorKind::Thrown);
        assert_eq!(thrown.message, "boom");
    }

    #[test]
    fn test_read_errors() {
        let rt = Interpreter::new();
        assert!(matches!(rt.read_eval("(1 2"), Err(Error::Read(_))));
        assert!(matches!(rt.read_eval("{:a}"), Err(Error::Read(_))));
        assert_eq!(fails("(read-string \"(\")").kind, ErrorKind::Unsupported);
        assert_eq!(show("(read-string \"(a  b)\")"), "(a  b)");
    }

    #[test]
    fn test_atoms() {
        let src = "(def a (atom 1)) (swap! a + 10) (reset! a (+ @a 1)) @a";
        assert_eq!(exec(src), Value::Number(12.0));
        assert_eq!(exec("(def a (atom [1])) (swap! a conj 2)"), exec("[1 2]"));
        assert_eq!(show("(atom 1)"), "(atom 1)");
    }

    #[test]
    fn test_sequences() {
        assert_eq!(show("(cons 1 [2 3])"), "(1 2 3)");
        assert_eq!(show("(conj [1] 2 3)"), "[1 2 3]");
        assert_eq!(show("(conj '(1) 2 3)"), "(3 2 1)");
        assert_eq!(show("(concat [1] '(2) nil [3])"), "[1 2 3]");
        assert_eq!(show("(rest [1 2 3])"), "[2 3]");
        assert_eq!(exec("(first [])"), Value::Nil);
        assert_eq!(exec("(last [1 2 3])"), Value::Number(3.0));
        assert_eq!(show("(butlast [1 2 3])"), "[1 2]");
        assert_eq!(show("(slice [1 2 3 4] 1 -1)"), "[2 3]");
        assert_eq!(show("(reverse [1 2 3])"), "[3 2 1]");
        assert_eq!(show("(map (fn [x] (* x x)) [1 2 3])"), "[1 4 9]");
        assert_eq!(show("(map-indexed (fn [i x] (+ i x)) [10 10])"), "[10 11]");
        assert_eq!(show("(filter (fn [x] (> x 1)) [1 2 3])"), "[2 3]");
        assert_eq!(show("(remove (fn [x] (> x 1)) [1 2 3])"), "[1]");
        assert_eq!(exec("(apply + 1 [2 3])"), Value::Number(6.0));
        assert_eq!(exec("(index-of [:a :b] :b)"), Value::Number(1.0));
        assert_eq!(exec("(count {:a 1})"), Value::Number(1.0));
        assert_eq!(exec("(empty? [])"), Value::Boolean(true));
        assert_eq!(exec("(= [1 2] '(1 2))"), Value::Boolean(true));
    }

    #[test]
    fn test_sequence_helpers() {
        assert_eq!(show("(seq '(1 2))"), "[1 2]");
        assert_eq!(show("(seq \"ab\")"), "[\"a\" \"b\"]");
        assert_eq!(show("(seq {:a 1})"), "[[:a 1]]");
        assert_eq!(exec("(seq 5)"), Value::Nil);
        assert_eq!(show("(lst [1 2])"), "(1 2)");
        assert_eq!(show("(sort [3 1 2])"), "[1 2 3]");
        assert_eq!(show("(sort [\"b\" :a \"c\"])"), "[:a \"b\" \"c\"]");
        assert_eq!(fails("(sort [1 :a])").kind, ErrorKind::Unsupported);
        assert_eq!(show("(partition 2 [1 2 3])"), "[[1 2] [3]]");
        assert_eq!(fails("(partition 0 [1])").kind, ErrorKind::TypeMismatch);
        assert_eq!(show("(repeat :a 2)"), "[:a :a]");
        assert_eq!(show("(repeat :a -1)"), "[]");
        assert_eq!(exec("(last-index-of [1 2 1] 1)"), Value::Number(2.0));
        assert_eq!(exec("(last-index-of [1 2 1] 3)"), Value::Number(-1.0));
    }

    #[test]
    fn test_function_metadata() {
        assert_eq!(exec("(meta +)"), Value::Nil);
        assert_eq!(exec("(get (meta (with-meta + {:doc \"add\"})) :doc)"), Value::string("add"));
        assert_eq!(exec("((with-meta + {:doc \"add\"}) 1 2)"), Value::Number(3.0));
        let src = "(defn f [x] (* x 2)) (def g (with-meta f {:n 1})) [(g 4) (meta f) (get (meta g) :n)]";
        assert_eq!(show(src), "[8 nil 1]");
        assert_eq!(fails("(with-meta 1 {})").kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_rnd_repeats_for_a_seed() {
        assert_eq!(exec("(= (rnd 1) (rnd 1))"), Value::Boolean(true));
        assert_eq!(exec("(= (rnd :x) (rnd :x))"), Value::Boolean(true));
        assert_eq!(exec("(let [r (rnd 42)] (and (>= r 0) (< r 1)))"), Value::Boolean(true));
    }

    #[test]
    fn test_maps() {
        assert_eq!(exec("(get {:a 1} :a)"), Value::Number(1.0));
        assert_eq!(exec("(get {:a 1} :b)"), Value::Nil);
        assert_eq!(exec("(get {:a 1} :b 0)"), Value::Number(0.0));
        assert_eq!(show("(assoc {:a 1} :b 2 :a 3)"), "{:a 3 :b 2}");
        assert_eq!(show("(dissoc {:a 1 :b 2} :a)"), "{:b 2}");
        assert_eq!(show("(keys {:a 1 \"b\" 2})"), "[:a \"b\"]");
        assert_eq!(show("(vals {:a 1 :b 2})"), "[1 2]");
        assert_eq!(exec("(contains? {:a nil} :a)"), Value::Boolean(true));
        assert_eq!(show("(merge {:a 1} nil {:a 2 :b 3})"), "{:a 2 :b 3}");
        assert_eq!(exec("(= {:a 1 :b 2} {:b 2 :a 1})"), Value::Boolean(true));
    }

    #[test]
    fn test_strings() {
        assert_eq!(exec("(str \"a\" 1 :k)"), Value::string("a1:k"));
        assert_eq!(exec("(pr-str \"a\" 1)"), Value::string("\"a\" 1"));
        assert_eq!(exec("(subs \"hello\" 1 3)"), Value::string("el"));
        assert_eq!(exec("(join \", \" [1 2])"), Value::string("1, 2"));
    }

    #[test]
    fn test_math() {
        assert_eq!(exec("(sqrt 16)"), Value::Number(4.0));
        assert_eq!(exec("(max 1 5 3)"), Value::Number(5.0));
        assert_eq!(show("PI"), "3.1416");
    }

    #[test]
    fn test_json() {
        assert_eq!(exec("(json-stringify {:a [1 2.5] \"b\" nil})"), Value::string(r#"{":a":[1,2.5],"b":null}"#));
        assert_eq!(exec(r#"(get (json-parse "{\":k\": 1}") :k)"#), Value::Number(1.0));
        assert_eq!(fails("(json-stringify +)").kind, ErrorKind::Unsupported);
    }

    #[test]
    fn test_deep_tail_recursion() {
        let src = "(defn count-down [n] (if (= n 0) :done (count-down (- n 1)))) (count-down 20000)";
        assert_eq!(show(src), ":done");
    }

    #[test]
    fn test_deep_recursion_in_argument_position() {
        let src = "(defn sum [n] (if (= n 0) 0 (+ n (sum (- n 1))))) (sum 500)";
        assert_eq!(exec(src), Value::Number(125250.0));
    }

    #[test]
    fn test_host_apply_and_macroexpand() {
        let rt = Interpreter::new();
        let f = rt.read_eval("(fn [a b] (+ a b))").unwrap();
        assert_eq!(rt.apply(&f, vec![Value::Number(1.0), Value::Number(2.0)], None).unwrap(), Value::Number(3.0));
        let form = crate::reader::read_form("(when a b)", rt.keywords()).unwrap();
        assert_eq!(print(&rt.macroexpand(&form).unwrap()), "(if a (do b))");
    }
}
