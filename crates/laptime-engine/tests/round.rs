use std::collections::HashSet;
use std::io;

use laptime_engine::transform::{guarded_statements, probe_name};
use laptime_engine::{
    ArtifactEmitter, CollectedDiagnostics, CompanionArtifact, Engine, EngineConfig, MarkerScope,
    Severity, SourceTree,
};
use syn::parse_quote;

/// Keeps artifacts in memory; fails for type names listed in `fail_for`.
#[derive(Default)]
struct MemoryEmitter {
    artifacts: Vec<CompanionArtifact>,
    fail_for: Vec<String>,
}

impl ArtifactEmitter for MemoryEmitter {
    fn emit(&mut self, artifact: &CompanionArtifact) -> io::Result<()> {
        if self.fail_for.contains(&artifact.type_name.to_string()) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.artifacts.push(artifact.clone());
        Ok(())
    }
}

fn shapes(file: syn::File) -> SourceTree {
    SourceTree::from_file(file, vec!["shapes".to_string()])
}

fn run(tree: &mut SourceTree) -> (CollectedDiagnostics, MemoryEmitter) {
    let mut engine = Engine::default();
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = MemoryEmitter::default();
    engine.run_round(tree, &mut diagnostics, &mut emitter);
    (diagnostics, emitter)
}

#[test]
fn unmarked_callables_are_untouched() {
    let file: syn::File = parse_quote! {
        use laptime::time;

        struct Circle;

        impl Circle {
            fn area(&self) -> f64 { 3.14 }
        }

        fn helper() -> u8 { 1 }
    };
    let mut tree = shapes(file.clone());

    let (diagnostics, emitter) = run(&mut tree);

    assert_eq!(tree.into_file(), file);
    assert!(diagnostics.is_empty());
    assert!(emitter.artifacts.is_empty());
}

#[test]
fn marked_callable_gets_probe_and_protected_region() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        struct Circle { r: f64 }

        impl Circle {
            #[time]
            fn area(&self) -> f64 {
                let r2 = self.r * self.r;
                if r2 == 0.0 {
                    return 0.0;
                }
                r2 * 3.14
            }

            fn untouched(&self) {}
        }
    });
    let id = tree.find("Circle::area").unwrap();
    let original = tree.body(id).unwrap().clone();

    let (diagnostics, emitter) = run(&mut tree);

    let body = tree.body(id).unwrap();
    assert_eq!(body.stmts.len(), 2);
    assert_eq!(guarded_statements(body).unwrap(), original.stmts.as_slice());
    assert!(!diagnostics.has_errors());

    let untouched = tree.body(tree.find("Circle::untouched").unwrap()).unwrap();
    assert!(untouched.stmts.is_empty());

    assert_eq!(emitter.artifacts.len(), 1);
    assert_eq!(
        emitter.artifacts[0].qualified_name(),
        "shapes::CircleAutogenerate"
    );
    assert_eq!(emitter.artifacts[0].origin, "Circle::area");
}

#[test]
fn annotations_and_signature_are_preserved() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        #[inline]
        #[time(clock = nanosecond)]
        pub async fn fetch<'a>(key: &'a str) -> Result<&'a str, String> {
            Ok(key)
        }
    });

    run(&mut tree);

    let syn::Item::Fn(f) = &tree.items()[1] else {
        panic!("expected a function");
    };
    let expected: syn::Signature =
        parse_quote!(async fn fetch<'a>(key: &'a str) -> Result<&'a str, String>);
    assert_eq!(f.sig, expected);
    assert_eq!(f.attrs.len(), 2);
    assert!(matches!(f.vis, syn::Visibility::Public(_)));
}

#[test]
fn probe_names_are_unique_across_callables() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        #[time] fn a() {}
        #[time] fn b() {}

        impl Square {
            #[time] fn c(&self) {}
            #[time(clock = ns)] fn d(&self) {}
        }

        mod inner {
            #[laptime::time] fn e() {}
        }
    });

    run(&mut tree);

    let names: Vec<String> = ["a", "b", "Square::c", "Square::d", "e"]
        .iter()
        .map(|name| {
            let body = tree.body(tree.find(name).unwrap()).unwrap();
            probe_name(body).unwrap().to_string()
        })
        .collect();
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), 5);
}

#[test]
fn one_companion_per_enclosing_type() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        impl Circle {
            #[time] fn area(&self) {}
            #[time] fn perimeter(&self) {}
        }

        impl Circle {
            #[time] fn diameter(&self) {}
        }

        impl Square {
            #[time] fn area(&self) {}
        }

        impl Triangle {
            fn area(&self) {}
        }

        #[time]
        fn free() {}

        mod solid {
            impl Cube {
                #[time] fn volume(&self) {}
            }
        }
    });

    let (_, emitter) = run(&mut tree);

    let names: Vec<String> = emitter
        .artifacts
        .iter()
        .map(CompanionArtifact::qualified_name)
        .collect();
    assert_eq!(
        names,
        vec![
            "shapes::CircleAutogenerate",
            "shapes::SquareAutogenerate",
            "shapes::solid::CubeAutogenerate",
        ]
    );
}

#[test]
fn unresolved_marker_is_a_silent_no_op() {
    let file: syn::File = parse_quote! {
        impl Circle {
            #[time]
            fn area(&self) {}
        }
    };
    let mut tree = shapes(file.clone());

    let (diagnostics, emitter) = run(&mut tree);

    assert_eq!(tree.into_file(), file);
    assert!(diagnostics.is_empty());
    assert!(emitter.artifacts.is_empty());
}

#[test]
fn declarations_without_body_are_skipped() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        trait Shape {
            #[time]
            fn area(&self) -> f64;

            #[time]
            fn describe(&self) -> String { String::from("shape") }
        }
    });

    let (diagnostics, emitter) = run(&mut tree);

    assert!(tree.body(tree.find("Shape::area").unwrap()).is_none());
    let describe = tree.body(tree.find("Shape::describe").unwrap()).unwrap();
    assert_eq!(describe.stmts.len(), 2);
    assert!(!diagnostics.has_errors());
    assert_eq!(emitter.artifacts[0].qualified_name(), "shapes::ShapeAutogenerate");
}

#[test]
fn invalid_template_is_reported_and_round_continues() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        impl Circle {
            #[time(format = "no placeholder")]
            fn area(&self) -> f64 { 1.0 }

            #[time(format = "%s and %s")]
            fn perimeter(&self) -> f64 { 2.0 }

            #[time]
            fn diameter(&self) -> f64 { 3.0 }
        }
    });

    let mut engine = Engine::default();
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = MemoryEmitter::default();
    let summary = engine.run_round(&mut tree, &mut diagnostics, &mut emitter);

    assert_eq!(summary.failed, vec!["Circle::area", "Circle::perimeter"]);
    assert_eq!(summary.instrumented, vec!["Circle::diameter"]);
    assert_eq!(diagnostics.errors().count(), 2);
    assert!(diagnostics
        .errors()
        .all(|d| d.message.starts_with("invalid message template")));

    let area = tree.body(tree.find("Circle::area").unwrap()).unwrap();
    assert_eq!(area.stmts.len(), 1);
}

#[test]
fn malformed_marker_is_reported() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        #[time(clock = hourly)]
        fn a() {}

        #[time]
        fn b() {}
    });

    let (diagnostics, _) = run(&mut tree);

    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("unknown clock `hourly`"));
    assert_eq!(tree.body(tree.find("b").unwrap()).unwrap().stmts.len(), 2);
}

#[test]
fn const_fn_is_rejected() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        #[time]
        const fn answer() -> u8 { 42 }
    });

    let (diagnostics, _) = run(&mut tree);

    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "`answer` is a const fn and cannot read a clock"
    );
}

#[test]
fn emission_failure_does_not_stop_other_types() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        impl Circle { #[time] fn area(&self) {} }
        impl Square { #[time] fn area(&self) {} }
    });

    let mut engine = Engine::default();
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = MemoryEmitter {
        fail_for: vec!["CircleAutogenerate".to_string()],
        ..Default::default()
    };
    let summary = engine.run_round(&mut tree, &mut diagnostics, &mut emitter);

    assert_eq!(summary.instrumented.len(), 2);
    assert_eq!(summary.artifacts, vec!["shapes::SquareAutogenerate"]);
    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .message
        .starts_with("failed to emit companion artifact `shapes::CircleAutogenerate`"));
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Note && d.message == "created shapes::SquareAutogenerate"));
}

#[test]
fn second_round_over_instrumented_tree_is_a_no_op() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        #[time]
        fn compute() -> u32 { 42 }
    });

    let mut engine = Engine::default();
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = MemoryEmitter::default();
    engine.run_round(&mut tree, &mut diagnostics, &mut emitter);
    let once = tree.clone().into_file();

    let summary = engine.run_round(&mut tree, &mut diagnostics, &mut emitter);

    assert_eq!(tree.into_file(), once);
    assert_eq!(summary.skipped, vec!["compute"]);
    assert!(summary.instrumented.is_empty());
}

#[test]
fn assumed_scope_strips_consumed_markers() {
    let mut tree = SourceTree::new(
        vec![parse_quote! {
            impl Circle {
                #[time]
                #[inline]
                fn area(&self) {}

                #[time(format = "bad")]
                fn broken(&self) {}
            }
        }],
        Vec::new(),
        MarkerScope::Assumed,
    );

    let mut engine = Engine::new(EngineConfig::default().strip_markers(true));
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = MemoryEmitter::default();
    engine.run_round(&mut tree, &mut diagnostics, &mut emitter);

    let syn::Item::Impl(imp) = &tree.items()[0] else {
        panic!("expected an impl block");
    };
    for item in &imp.items {
        let syn::ImplItem::Fn(f) = item else {
            continue;
        };
        assert!(f.attrs.iter().all(|attr| !attr.path().is_ident("time")));
    }
    assert_eq!(emitter.artifacts[0].qualified_name(), "CircleAutogenerate");
}

#[test]
fn owner_of_failed_callable_still_gets_companion() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        impl Circle {
            #[time(format = "no placeholder")]
            fn area(&self) {}
        }

        impl Square {
            #[time(clock = hourly)]
            fn area(&self) {}
        }

        impl Triangle {
            #[time]
            fn area(&self) {}
        }
    });

    let (diagnostics, emitter) = run(&mut tree);

    assert_eq!(diagnostics.errors().count(), 2);
    let companions: Vec<(String, &str)> = emitter
        .artifacts
        .iter()
        .map(|artifact| (artifact.qualified_name(), artifact.origin.as_str()))
        .collect();
    assert_eq!(
        companions,
        vec![
            ("shapes::CircleAutogenerate".to_string(), "Circle::area"),
            ("shapes::SquareAutogenerate".to_string(), "Square::area"),
            ("shapes::TriangleAutogenerate".to_string(), "Triangle::area"),
        ]
    );
}

#[test]
fn user_code_shaped_like_output_is_still_instrumented() {
    let mut tree = shapes(parse_quote! {
        use laptime::time;

        #[time]
        fn measure() -> u64 {
            let __laptime_start_0 = 5;
            __laptime_start_0 + 1
        }
    });
    let id = tree.find("measure").unwrap();
    let original = tree.body(id).unwrap().clone();

    let mut engine = Engine::default();
    let mut diagnostics = CollectedDiagnostics::new();
    let mut emitter = MemoryEmitter::default();
    let summary = engine.run_round(&mut tree, &mut diagnostics, &mut emitter);

    assert_eq!(summary.instrumented, vec!["measure"]);
    let body = tree.body(id).unwrap();
    assert_eq!(guarded_statements(body).unwrap(), original.stmts.as_slice());
    assert_ne!(probe_name(body).unwrap(), "__laptime_start_0");
}
