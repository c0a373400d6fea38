// Integration tests for the execution engine

use jodin_exec::interpreter::{EngineConfig, Interpreter, RuntimeError};
use jodin_exec::output::OutputSink;
use jodin_exec::tree::build::*;
use jodin_exec::tree::{BinaryOp, CxType, FunctionDef, Node, PostfixOp, Program};
use pretty_assertions::assert_eq;

fn char_ptr() -> CxType {
    CxType::char().pointer_to()
}

fn start(body: Vec<Node>) -> FunctionDef {
    function(
        "start",
        vec![param("argc", CxType::int()), param("argv", char_ptr().pointer_to())],
        CxType::int(),
        body,
    )
}

fn interpreter(program: Program) -> Interpreter {
    Interpreter::with_options(program, EngineConfig::default(), OutputSink::buffer())
        .expect("Globals failed to initialize")
}

fn run(program: Program) -> (i32, Interpreter) {
    let mut interpreter = interpreter(program);
    let status = interpreter.run(&["prog".to_string()]);
    (status, interpreter)
}

fn x(name: &str) -> Node {
    id(name, CxType::int())
}

#[test]
fn test_simple_arithmetic() {
    let program = Program::new().with_function(start(vec![
        declare_init("x", CxType::int(), int(5)),
        ret(binary(BinaryOp::Add, x("x"), int(3))),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 8);
}

#[test]
fn test_function_call() {
    let add = function(
        "add",
        vec![param("a", CxType::int()), param("b", CxType::int())],
        CxType::int(),
        vec![ret(binary(BinaryOp::Add, x("a"), x("b")))],
    );
    let program = Program::new().with_function(add).with_function(start(vec![
        declare_init("result", CxType::int(), call("add", vec![int(3), int(4)], CxType::int())),
        ret(x("result")),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 7);
}

#[test]
fn test_recursion() {
    // int fact(int n) { if (n <= 1) return 1; return n * fact(n - 1); }
    let fact = function(
        "fact",
        vec![param("n", CxType::int())],
        CxType::int(),
        vec![
            if_then(binary(BinaryOp::Le, x("n"), int(1)), ret(int(1))),
            ret(binary(
                BinaryOp::Mul,
                x("n"),
                call("fact", vec![binary(BinaryOp::Sub, x("n"), int(1))], CxType::int()),
            )),
        ],
    );
    let program = Program::new()
        .with_function(fact)
        .with_function(start(vec![ret(call("fact", vec![int(5)], CxType::int()))]));

    let (status, _) = run(program);
    assert_eq!(status, 120);
}

#[test]
fn test_argc_and_argv() {
    let program = Program::new().with_function(start(vec![ret(binary(
        BinaryOp::Add,
        binary(BinaryOp::Mul, x("argc"), int(1000)),
        index(index(id("argv", char_ptr().pointer_to()), int(1)), int(0)),
    ))]));

    let mut interpreter = interpreter(program);
    let status = interpreter.run(&["prog".to_string(), "xy".to_string()]);
    assert_eq!(status, 2000 + b'x' as i32);
}

#[test]
fn test_string_walk() {
    // char *p = "hi"; int n = 0; while (*p) { n++; p++; } return n;
    let p = || id("p", char_ptr());
    let program = Program::new().with_function(start(vec![
        declare_init("p", char_ptr(), string("hi")),
        declare_init("n", CxType::int(), int(0)),
        while_loop(
            deref(p()),
            block(vec![
                postfix(PostfixOp::Increment, x("n")),
                postfix(PostfixOp::Increment, p()),
            ]),
        ),
        ret(x("n")),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 2);
}

#[test]
fn test_printf_output() {
    let program = Program::new().with_function(start(vec![
        call("printf", vec![string(r"hello\tworld\n")], CxType::int()),
        call("printf", vec![string(r"bye\n"), int(3)], CxType::int()),
        ret(int(0)),
    ]));

    let (status, interpreter) = run(program);
    assert_eq!(status, 0);
    assert_eq!(interpreter.output().get_output(), "hello\tworld\nbye\n");
    assert_eq!(interpreter.output().lines(), vec!["hello\tworld", "bye"]);
}

#[test]
fn test_virtual_dispatch() {
    // class A { int m() { return 1; } int n() { return 10; } }
    // class B : A { int m() { return 2; } }
    let a = class("A", None, vec![member("v", CxType::int())])
        .with_method(function("m", vec![], CxType::int(), vec![ret(int(1))]))
        .with_method(function("n", vec![], CxType::int(), vec![ret(int(10))]));
    let b = class("B", Some("A"), vec![])
        .with_method(function("m", vec![], CxType::int(), vec![ret(int(2))]));
    let a_ptr = CxType::class("A").pointer_to();
    let program = Program::new()
        .with_compound(a)
        .with_compound(b)
        .with_function(start(vec![
            declare_init("o", a_ptr.clone(), construct("B", 0, vec![])),
            ret(binary(
                BinaryOp::Add,
                method(id("o", a_ptr.clone()), "m", vec![], CxType::int()),
                method(id("o", a_ptr), "n", vec![], CxType::int()),
            )),
        ]));

    let (status, _) = run(program);
    assert_eq!(status, 12);
}

#[test]
fn test_overload_by_argument_type() {
    let shape = class("Shape", None, vec![])
        .with_method(function(
            "scale",
            vec![param("factor", CxType::int())],
            CxType::int(),
            vec![ret(int(1))],
        ))
        .with_method(function(
            "scale",
            vec![param("factor", CxType::double())],
            CxType::int(),
            vec![ret(int(2))],
        ));
    let shape_ptr = CxType::class("Shape").pointer_to();
    let program = Program::new().with_compound(shape).with_function(start(vec![
        declare_init("s", shape_ptr.clone(), construct("Shape", 0, vec![])),
        ret(binary(
            BinaryOp::Add,
            binary(
                BinaryOp::Mul,
                method(id("s", shape_ptr.clone()), "scale", vec![double(0.5)], CxType::int()),
                int(10),
            ),
            method(id("s", shape_ptr), "scale", vec![int(3)], CxType::int()),
        )),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 21);
}

#[test]
fn test_prior_constructor_and_fields() {
    // class A { int v; A(int x) { this->v = x; } }
    // class B : A { int w; B(int x) : A(x * 2) { this->w = x; } }
    let a = class("A", None, vec![member("v", CxType::int())]).with_constructor(constructor(
        "A",
        vec![param("x", CxType::int())],
        vec![assign(arrow(this("A"), "v", CxType::int()), x("x"))],
    ));
    let b = class("B", Some("A"), vec![member("w", CxType::int())]).with_constructor(
        constructor(
            "B",
            vec![param("x", CxType::int())],
            vec![assign(arrow(this("B"), "w", CxType::int()), x("x"))],
        )
        .with_prior(prior("A", 0, vec![binary(BinaryOp::Mul, x("x"), int(2))])),
    );
    let b_ptr = CxType::class("B").pointer_to();
    let program = Program::new()
        .with_compound(a)
        .with_compound(b)
        .with_function(start(vec![
            declare_init("b", b_ptr.clone(), construct("B", 0, vec![int(5)])),
            ret(binary(
                BinaryOp::Add,
                arrow(id("b", b_ptr.clone()), "v", CxType::int()),
                arrow(id("b", b_ptr), "w", CxType::int()),
            )),
        ]));

    let (status, _) = run(program);
    assert_eq!(status, 15);
}

#[test]
fn test_call_method_from_host() {
    let counter = class("Counter", None, vec![member("count", CxType::int())]).with_method(
        function(
            "bump",
            vec![param("by", CxType::int())],
            CxType::int(),
            vec![
                op_assign(
                    jodin_exec::tree::AssignOp::Compound(BinaryOp::Add),
                    arrow(this("Counter"), "count", CxType::int()),
                    x("by"),
                ),
                ret(arrow(this("Counter"), "count", CxType::int())),
            ],
        ),
    );
    let program = Program::new().with_compound(counter);
    let mut interpreter = interpreter(program);

    let object = interpreter
        .evaluate_expression(&construct("Counter", 0, vec![]))
        .unwrap()
        .expect("constructor produced no object");
    let arg = interpreter.evaluate_expression(&int(4)).unwrap().unwrap();
    interpreter.call_method(&object, "bump", vec![arg.clone()]).unwrap();
    let total = interpreter
        .call_method(&object, "bump", vec![arg])
        .unwrap()
        .unwrap();
    assert_eq!(total.as_primitive().unwrap().as_i64(), 8);
}

#[test]
fn test_struct_assignment_copies() {
    // struct P { int x; }; struct P a; a.x = 1; struct P b = a; b.x = 2; return a.x * 10 + b.x;
    let point = CxType::structure("P");
    let program = Program::new()
        .with_compound(structure("P", vec![member("x", CxType::int())]))
        .with_function(start(vec![
            declare("a", point.clone()),
            assign(field(id("a", point.clone()), "x", CxType::int()), int(1)),
            declare_init("b", point.clone(), id("a", point.clone())),
            assign(field(id("b", point.clone()), "x", CxType::int()), int(2)),
            ret(binary(
                BinaryOp::Add,
                binary(
                    BinaryOp::Mul,
                    field(id("a", point.clone()), "x", CxType::int()),
                    int(10),
                ),
                field(id("b", point), "x", CxType::int()),
            )),
        ]));

    let (status, _) = run(program);
    assert_eq!(status, 12);
}

#[test]
fn test_pointer_aliases_array() {
    // int a[3]; int *p = a; p[1] = 5; *(p + 2) = 6; return a[1] * 10 + a[2];
    let array = CxType::int().array_of(Some(3));
    let int_ptr = CxType::int().pointer_to();
    let p = || id("p", int_ptr.clone());
    let program = Program::new().with_function(start(vec![
        declare("a", array.clone()),
        declare_init("p", int_ptr.clone(), id("a", array.clone())),
        assign(index(p(), int(1)), int(5)),
        assign(deref(binary(BinaryOp::Add, p(), int(2))), int(6)),
        ret(binary(
            BinaryOp::Add,
            binary(BinaryOp::Mul, index(id("a", array.clone()), int(1)), int(10)),
            index(id("a", array), int(2)),
        )),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 56);
}

#[test]
fn test_array_parameter_decays_to_pointer() {
    // void fill(int *xs) { xs[0] = 9; }
    let int_ptr = CxType::int().pointer_to();
    let array = CxType::int().array_of(Some(2));
    let fill = function(
        "fill",
        vec![param("xs", int_ptr.clone())],
        CxType::void(),
        vec![assign(index(id("xs", int_ptr), int(0)), int(9))],
    );
    let program = Program::new().with_function(fill).with_function(start(vec![
        declare("a", array.clone()),
        call("fill", vec![id("a", array.clone())], CxType::void()),
        ret(index(id("a", array), int(0))),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 9);
}

#[test]
fn test_address_of_local() {
    // int v = 1; int *p = &v; *p = 4; return v;
    let int_ptr = CxType::int().pointer_to();
    let program = Program::new().with_function(start(vec![
        declare_init("v", CxType::int(), int(1)),
        declare_init("p", int_ptr.clone(), address_of(x("v"))),
        assign(deref(id("p", int_ptr)), int(4)),
        ret(x("v")),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 4);
}

#[test]
fn test_multidimensional_array() {
    // int m[2][3]; m[1][2] = 7; return m[1][2] + m[0][0];
    let row = CxType::int().array_of(Some(3));
    let matrix = row.clone().array_of(Some(2));
    let m = || id("m", matrix.clone());
    let program = Program::new().with_function(start(vec![
        declare_array("m", matrix.clone(), vec![int(2), int(3)]),
        assign(index(index(m(), int(1)), int(2)), int(7)),
        ret(binary(
            BinaryOp::Add,
            index(index(m(), int(1)), int(2)),
            index(index(m(), int(0)), int(0)),
        )),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 7);
}

#[test]
fn test_unsized_array_takes_initializer_length() {
    // char s[] = "abc"; int n = 0; while (s[n]) n++; return n;
    let text = CxType::char().array_of(None);
    let program = Program::new().with_function(start(vec![
        declare_init("s", text.clone(), string("abc")),
        declare_init("n", CxType::int(), int(0)),
        while_loop(
            index(id("s", text), x("n")),
            postfix(PostfixOp::Increment, x("n")),
        ),
        ret(x("n")),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 3);
}

#[test]
fn test_unsized_array_without_initializer_faults() {
    let program = Program::new().with_function(start(vec![
        declare("a", CxType::int().array_of(None)),
        ret(int(0)),
    ]));

    let mut interpreter = interpreter(program);
    let result = interpreter.run_entry(&[]);
    assert!(matches!(result, Err(RuntimeError::UnsizedArray { .. })));
}

#[test]
fn test_calloc_and_free() {
    // int *p = calloc(2, sizeof(int)); int *q = p; p[1] = 3; int kept = q[1];
    // free(p); return (q == 0) * 10 + kept;
    let int_ptr = CxType::int().pointer_to();
    let p = || id("p", int_ptr.clone());
    let program = Program::new().with_function(start(vec![
        declare_init(
            "p",
            int_ptr.clone(),
            call("calloc", vec![int(2), size_of(CxType::int())], int_ptr.clone()),
        ),
        declare_init("q", int_ptr.clone(), p()),
        assign(index(p(), int(1)), int(3)),
        declare_init("kept", CxType::int(), index(id("q", int_ptr.clone()), int(1))),
        call("free", vec![p()], CxType::void()),
        ret(binary(
            BinaryOp::Add,
            binary(
                BinaryOp::Mul,
                binary(BinaryOp::Eq, id("q", int_ptr), int(0)),
                int(10),
            ),
            x("kept"),
        )),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 13);
}

#[test]
fn test_free_null_is_noop() {
    let int_ptr = CxType::int().pointer_to();
    let program = Program::new().with_function(start(vec![
        declare("p", int_ptr.clone()),
        call("free", vec![id("p", int_ptr)], CxType::void()),
        ret(int(1)),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 1);
}

#[test]
fn test_null_dereference_faults() {
    let int_ptr = CxType::int().pointer_to();
    let program = Program::new().with_function(start(vec![
        declare("p", int_ptr.clone()),
        ret(deref(id("p", int_ptr))),
    ]));

    let mut interpreter = interpreter(program);
    let result = interpreter.run_entry(&[]);
    assert!(matches!(result, Err(RuntimeError::SegmentationFault { .. })));
}

#[test]
fn test_index_out_of_bounds_reports_call_stack() {
    // void poke() { int a[3]; a[3] = 1; }  int start() { poke(); return 0; }
    let array = CxType::int().array_of(Some(3));
    let poke = function(
        "poke",
        vec![],
        CxType::void(),
        vec![
            declare("a", array.clone()),
            assign(index(id("a", array), int(3)), int(1)),
        ],
    );
    let program = Program::new()
        .with_function(poke)
        .with_function(start(vec![call("poke", vec![], CxType::void()), ret(int(0))]));

    let mut interpreter = interpreter(program);
    let error = interpreter.run_entry(&[]).unwrap_err();
    assert!(matches!(error, RuntimeError::SegmentationFault { .. }));
    assert_eq!(interpreter.fault_trace().unwrap(), &["poke", "start"]);

    let report = interpreter.fault_report(&error);
    assert!(report.starts_with("Error: Segmentation fault"));
    assert!(report.contains("\n\tat poke\n\tat start"));

    // Every frame was closed on the way out
    assert_eq!(interpreter.state().call_depth(), 0);
    assert_eq!(interpreter.state().diagnostics().len(), 0);
    assert_eq!(interpreter.run(&[]), -1);
}

#[test]
fn test_dump_state_on_fault() {
    let array = CxType::int().array_of(Some(1));
    let program = Program::new().with_function(start(vec![
        declare("cells", array.clone()),
        ret(index(id("cells", array), int(-1))),
    ]));
    let config = EngineConfig {
        dump_state_on_fault: true,
        ..EngineConfig::default()
    };
    let mut interpreter = Interpreter::with_options(program, config, OutputSink::buffer()).unwrap();
    let error = interpreter.run_entry(&[]).unwrap_err();

    let report = interpreter.fault_report(&error);
    assert!(report.contains("Frame = start"));
    assert!(report.contains("+ cells = "));
}

#[test]
fn test_return_from_loop_restores_frames() {
    // int find() { for (int i = 0; i < 10; i++) { if (i == 4) return i; } return -1; }
    let find = function(
        "find",
        vec![],
        CxType::int(),
        vec![
            for_loop(
                Some(declare_init("i", CxType::int(), int(0))),
                Some(binary(BinaryOp::Lt, x("i"), int(10))),
                Some(postfix(PostfixOp::Increment, x("i"))),
                block(vec![if_then(binary(BinaryOp::Eq, x("i"), int(4)), ret(x("i")))]),
            ),
            ret(int(-1)),
        ],
    );
    let program = Program::new()
        .with_function(find)
        .with_function(start(vec![ret(call("find", vec![], CxType::int()))]));

    let mut interpreter = interpreter(program);
    let frames = interpreter.state().frame_depth();
    assert_eq!(interpreter.run(&[]), 4);
    assert_eq!(interpreter.state().frame_depth(), frames);
    assert_eq!(interpreter.state().value_depth(), 0);
    assert_eq!(interpreter.state().call_depth(), 0);
}

#[test]
fn test_break_and_continue() {
    // int sum = 0; int i = 0;
    // do { i++; if (i % 2 == 0) continue; if (i > 7) break; sum += i; } while (i < 100);
    // return sum;  // 1 + 3 + 5 + 7
    let program = Program::new().with_function(start(vec![
        declare_init("sum", CxType::int(), int(0)),
        declare_init("i", CxType::int(), int(0)),
        do_while(
            block(vec![
                postfix(PostfixOp::Increment, x("i")),
                if_then(
                    binary(
                        BinaryOp::Eq,
                        binary(BinaryOp::Mod, x("i"), int(2)),
                        int(0),
                    ),
                    cont(),
                ),
                if_then(binary(BinaryOp::Gt, x("i"), int(7)), brk()),
                op_assign(
                    jodin_exec::tree::AssignOp::Compound(BinaryOp::Add),
                    x("sum"),
                    x("i"),
                ),
            ]),
            binary(BinaryOp::Lt, x("i"), int(100)),
        ),
        ret(x("sum")),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 16);
}

#[test]
fn test_block_scope_shadowing() {
    // int v = 1; { int v = 2; } return v;
    let program = Program::new().with_function(start(vec![
        declare_init("v", CxType::int(), int(1)),
        block(vec![declare_init("v", CxType::int(), int(2))]),
        ret(x("v")),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 1);
}

#[test]
fn test_logical_operators_short_circuit() {
    // int noisy() { printf("called"); return 1; }
    // return (0 && noisy()) + (1 || noisy()) * 10;
    let noisy = function(
        "noisy",
        vec![],
        CxType::int(),
        vec![
            call("printf", vec![string("called")], CxType::int()),
            ret(int(1)),
        ],
    );
    let noisy_call = || call("noisy", vec![], CxType::int());
    let program = Program::new().with_function(noisy).with_function(start(vec![ret(
        binary(
            BinaryOp::Add,
            binary(BinaryOp::And, int(0), noisy_call()),
            binary(
                BinaryOp::Mul,
                binary(BinaryOp::Or, int(1), noisy_call()),
                int(10),
            ),
        ),
    )]));

    let (status, interpreter) = run(program);
    assert_eq!(status, 10);
    assert_eq!(interpreter.output().get_output(), "");
}

#[test]
fn test_ternary_evaluates_one_branch() {
    let program = Program::new().with_function(start(vec![
        declare_init("n", CxType::int(), int(0)),
        ret(ternary(
            boolean(true),
            int(3),
            binary(BinaryOp::Div, int(1), x("n")),
        )),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 3);
}

#[test]
fn test_division_by_zero_faults() {
    let program = Program::new().with_function(start(vec![
        declare_init("z", CxType::int(), int(0)),
        ret(binary(BinaryOp::Div, int(1), x("z"))),
    ]));

    let mut interpreter = interpreter(program);
    let result = interpreter.run_entry(&[]);
    assert!(matches!(result, Err(RuntimeError::DivisionByZero { .. })));
}

#[test]
fn test_walk_to_end_pointer() {
    // char *s = "hello"; char *end = s + 5; int n = 0;
    // while (s < end) { s++; n++; } return n * 10 + (end == s);
    let s = || id("s", char_ptr());
    let end = || id("end", char_ptr());
    let program = Program::new().with_function(start(vec![
        declare_init("s", char_ptr(), string("hello")),
        declare_init("end", char_ptr(), binary(BinaryOp::Add, s(), int(5))),
        declare_init("n", CxType::int(), int(0)),
        while_loop(
            binary(BinaryOp::Lt, s(), end()),
            block(vec![
                postfix(PostfixOp::Increment, s()),
                postfix(PostfixOp::Increment, x("n")),
            ]),
        ),
        ret(binary(
            BinaryOp::Add,
            binary(BinaryOp::Mul, x("n"), int(10)),
            binary(BinaryOp::Eq, end(), s()),
        )),
    ]));

    let (status, _) = run(program);
    assert_eq!(status, 51);
}

#[test]
fn test_end_pointers_of_different_strings_differ() {
    // return ("x" + 1) == ("yz" + 2);
    let program = Program::new().with_function(start(vec![ret(binary(
        BinaryOp::Eq,
        binary(BinaryOp::Add, string("x"), int(1)),
        binary(BinaryOp::Add, string("yz"), int(2)),
    ))]));

    let (status, _) = run(program);
    assert_eq!(status, 0);
}

#[test]
fn test_globals_initialize_out_of_order() {
    // int b = a + 1; int a = 41;
    let program = Program::new()
        .with_global(global(
            "b",
            CxType::int(),
            Some(binary(BinaryOp::Add, x("a"), int(1))),
        ))
        .with_global(global("a", CxType::int(), Some(int(41))))
        .with_function(start(vec![ret(x("b"))]));

    let (status, _) = run(program);
    assert_eq!(status, 42);
}

#[test]
fn test_global_initializer_calls_function_reading_earlier_global() {
    // int base = 10; int get() { return base; } int derived = get();
    let get = function("get", vec![], CxType::int(), vec![ret(x("base"))]);
    let program = Program::new()
        .with_global(global("base", CxType::int(), Some(int(10))))
        .with_global(global(
            "derived",
            CxType::int(),
            Some(call("get", vec![], CxType::int())),
        ))
        .with_function(get)
        .with_function(start(vec![ret(binary(BinaryOp::Add, x("derived"), int(1)))]));

    let (status, _) = run(program);
    assert_eq!(status, 11);
}

#[test]
fn test_global_with_missing_symbol_fails() {
    let program = Program::new().with_global(global("g", CxType::int(), Some(x("nowhere"))));

    let result = Interpreter::with_options(program, EngineConfig::default(), OutputSink::buffer());
    assert!(matches!(result, Err(RuntimeError::UndefinedSymbol { name, .. }) if name == "nowhere"));
}

#[test]
fn test_globals_are_visible_and_shared() {
    // int counter; void tick() { counter++; } start: tick(); tick(); return counter;
    let tick = function(
        "tick",
        vec![],
        CxType::void(),
        vec![postfix(PostfixOp::Increment, x("counter"))],
    );
    let program = Program::new()
        .with_global(global("counter", CxType::int(), None))
        .with_function(tick)
        .with_function(start(vec![
            call("tick", vec![], CxType::void()),
            call("tick", vec![], CxType::void()),
            ret(x("counter")),
        ]));

    let (status, _) = run(program);
    assert_eq!(status, 2);
}

#[test]
fn test_caller_locals_are_not_visible() {
    let peek = function("peek", vec![], CxType::int(), vec![ret(x("secret"))]);
    let program = Program::new().with_function(peek).with_function(start(vec![
        declare_init("secret", CxType::int(), int(1)),
        ret(call("peek", vec![], CxType::int())),
    ]));

    let mut interpreter = interpreter(program);
    let result = interpreter.run_entry(&[]);
    assert!(matches!(result, Err(RuntimeError::UndefinedSymbol { name, .. }) if name == "secret"));
}

#[test]
fn test_missing_entry_point() {
    let mut interpreter = interpreter(Program::new());
    let result = interpreter.run_entry(&[]);
    assert!(matches!(result, Err(RuntimeError::MissingEntryPoint { .. })));
    assert_eq!(interpreter.run(&[]), -1);
}

#[test]
fn test_custom_entry_point() {
    let program = Program::new().with_function(function(
        "main",
        vec![],
        CxType::int(),
        vec![ret(int(3))],
    ));
    let config = EngineConfig {
        entry_symbol: "main".to_string(),
        ..EngineConfig::default()
    };
    let mut interpreter = Interpreter::with_options(program, config, OutputSink::buffer()).unwrap();
    assert_eq!(interpreter.run(&[]), 3);
}

#[test]
fn test_entry_without_return_value_fails() {
    let program = Program::new().with_function(start(vec![]));

    let (status, _) = run(program);
    assert_eq!(status, -1);
}

#[test]
fn test_program_from_json() {
    let program = Program::new().with_function(start(vec![ret(int(6))]));
    let json = serde_json::to_string(&program).unwrap();

    let loaded = Program::from_json(&json).unwrap();
    let (status, _) = run(loaded);
    assert_eq!(status, 6);
}
