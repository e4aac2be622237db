// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_yaml::Value;

use crate::actors::control::{
    Branch, CallableActors, CallableRef, EventTrigger, LocalScopeTrigger, Loop, Sequence, Switch,
    Tee, Trigger, TryCatch,
};
use crate::actors::sinks::{Collected, Collector};
use crate::actors::sources::{IntegerRange, StorageValue, StringConstants, VariableValue};
use crate::actors::standalones::{SetVariableStandalone, StopFlow};
use crate::actors::stub::{FailingSink, StopAt, TrackedResource};
use crate::actors::transformers::{PassThrough, Scale, SetStorageValue};
use crate::config::Options;
use crate::engine::{Flow, FlowSettings, FlowState};
use crate::errors::{FailureStrategy, FlowError, SetupError};
use crate::scope::StorageScope;
use crate::token::Payload;
use crate::traits::{Actor, ActorBase};

/// Integration tests driving whole actor trees through `Flow`
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings(strategy: FailureStrategy) -> FlowSettings {
        FlowSettings {
            name: "test".to_string(),
            failure_strategy: strategy,
            max_threads: 4,
        }
    }

    fn base(name: &str, options: &[(&str, Value)]) -> ActorBase {
        let options = options
            .iter()
            .fold(Options::new(), |opts, (key, value)| opts.with(key, value.clone()));
        ActorBase::new(name).with_options(options)
    }

    fn range(name: &str, start: i64, end: i64) -> Box<dyn Actor> {
        Box::new(IntegerRange::new(base(
            name,
            &[("start", start.into()), ("end", end.into())],
        )))
    }

    fn collector(name: &str) -> (Box<dyn Actor>, Collected) {
        let collector = Collector::new(base(name, &[]));
        let handle = collector.handle();
        (Box::new(collector), handle)
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn ints(collected: &Collected) -> Vec<i64> {
        collected
            .lock()
            .iter()
            .filter_map(|t| t.payload().as_i64())
            .collect()
    }

    fn texts(collected: &Collected) -> Vec<String> {
        collected.lock().iter().map(|t| t.payload().to_text()).collect()
    }

    #[tokio::test]
    async fn test_tokens_arrive_in_source_order() {
        let (sink, seen) = collector("sink");
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                range("numbers", 1, 5),
                Box::new(PassThrough::new(base("first", &[]))),
                Box::new(PassThrough::new(base("second", &[]))),
                sink,
            ],
        );

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(ints(&seen), vec![1, 2, 3, 4, 5]);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_scale_doubles_range() {
        let (sink, seen) = collector("sink");
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                range("numbers", 1, 3),
                Box::new(Scale::new(base("double", &[("factor", 2.into())]))),
                sink,
            ],
        );

        flow.run().await.unwrap();

        assert_eq!(ints(&seen), vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_root_outputs_reach_the_report() {
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                range("numbers", 1, 3),
                Box::new(Scale::new(base("triple", &[("factor", 3.into())]))),
            ],
        );

        let report = flow.run().await.unwrap();

        let outputs: Vec<i64> = report
            .outputs
            .iter()
            .filter_map(|t| t.payload().as_i64())
            .collect();
        assert_eq!(outputs, vec![3, 6, 9]);
    }

    #[tokio::test]
    async fn test_skipped_transformer_forwards_tokens() {
        let (sink, seen) = collector("sink");
        let mut scale = base("double", &[("factor", 2.into())]);
        scale.skip = true;
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), Box::new(Scale::new(scale)), sink],
        );

        flow.run().await.unwrap();

        assert_eq!(ints(&seen), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_switch_partitions_tokens() {
        let (even, evens) = collector("even");
        let (odd, odds) = collector("odd");
        let switch = Switch::new(
            base(
                "parity",
                &[("conditions", yaml("- { type: matches, pattern: '[02468]$' }"))],
            ),
            vec![even, odd],
        );
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 6), Box::new(switch)],
        );

        flow.run().await.unwrap();

        assert_eq!(ints(&evens), vec![2, 4, 6]);
        assert_eq!(ints(&odds), vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_switch_without_default_drops_unmatched() {
        let (low, lows) = collector("low");
        let switch = Switch::new(
            base(
                "router",
                &[("conditions", yaml("- { type: numeric_range, max: 2 }"))],
            ),
            vec![low],
        );
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 5), Box::new(switch)],
        );

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(ints(&lows), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_branch_delivers_every_token_to_every_branch() {
        struct TestCase {
            name: &'static str,
            max_threads: i64,
        }

        let cases = vec![
            TestCase { name: "sequential", max_threads: 1 },
            TestCase { name: "parallel", max_threads: 3 },
            TestCase { name: "flow default", max_threads: -1 },
        ];

        for case in cases {
            let (a, seen_a) = collector("a");
            let (b, seen_b) = collector("b");
            let (c, seen_c) = collector("c");
            let branch = Branch::new(
                base("fan", &[("max_threads", case.max_threads.into())]),
                vec![a, b, c],
            );
            let mut flow = Flow::from_actors(
                settings(FailureStrategy::FailFast),
                vec![range("numbers", 1, 4), Box::new(branch)],
            );

            flow.run().await.unwrap();

            for seen in [&seen_a, &seen_b, &seen_c] {
                assert_eq!(ints(seen), vec![1, 2, 3, 4], "{}", case.name);
            }
        }
    }

    #[tokio::test]
    async fn test_branch_collects_one_array_per_token() {
        let (sink, seen) = collector("sink");
        let branch = Branch::new(
            base("fan", &[("collect_output", true.into()), ("max_threads", 2.into())]),
            vec![
                Box::new(Scale::new(base("double", &[("factor", 2.into())]))),
                Box::new(Scale::new(base("triple", &[("factor", 3.into())]))),
            ],
        );
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 2), Box::new(branch), sink],
        );

        flow.run().await.unwrap();

        let collected: Vec<Vec<i64>> = seen
            .lock()
            .iter()
            .map(|t| match t.payload() {
                Payload::Array(items) => items.iter().filter_map(Payload::as_i64).collect(),
                other => panic!("expected array, got {}", other.to_text()),
            })
            .collect();
        assert_eq!(collected, vec![vec![2, 3], vec![4, 6]]);
    }

    #[tokio::test]
    async fn test_stop_inside_loop_ends_the_flow() {
        let stop_at = StopAt::new(base("stop_at", &[]), 3);
        let seen = stop_at.handle();
        let body: Vec<Box<dyn Actor>> = vec![
            Box::new(VariableValue::new(base(
                "current",
                &[("variable", "i".into()), ("type", "integer".into())],
            ))),
            Box::new(stop_at),
        ];
        let counter = Loop::new(
            base(
                "counter",
                &[
                    ("mode", "count".into()),
                    ("count", 10.into()),
                    ("iteration_variable", "i".into()),
                ],
            ),
            body,
        );
        let (after, after_seen) = collector("after");
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                Box::new(counter),
                range("numbers", 1, 3),
                after,
            ],
        );

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Stopped);
        assert_eq!(report.stop_reason.as_deref(), Some("reached 3"));
        assert_eq!(ints(&seen), vec![1, 2, 3]);
        assert!(after_seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stop_actor_reason_is_reported() {
        let (sink, seen) = collector("sink");
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                Box::new(StopFlow::new(base("halt", &[("message", "enough".into())]))),
                range("numbers", 1, 3),
                sink,
            ],
        );

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Stopped);
        assert_eq!(report.stop_reason.as_deref(), Some("enough"));
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_until_loop_checks_condition_before_each_pass() {
        let (sink, seen) = collector("sink");
        let body: Vec<Box<dyn Actor>> = vec![
            Box::new(VariableValue::new(base(
                "current",
                &[("variable", "i".into()), ("type", "integer".into())],
            ))),
            sink,
        ];
        let until = Loop::new(
            base(
                "until",
                &[
                    ("mode", "until".into()),
                    ("iteration_variable", "i".into()),
                    ("condition", yaml("{ type: numeric_range, variable: i, min: 4 }")),
                ],
            ),
            body,
        );
        let mut flow = Flow::from_actors(settings(FailureStrategy::FailFast), vec![Box::new(until)]);

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(ints(&seen), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_for_each_loop_emits_per_element() {
        let (sink, seen) = collector("sink");
        let for_each = Loop::new(
            base("each", &[("mode", "for_each".into())]),
            vec![Box::new(Scale::new(base("tenfold", &[("factor", 10.into())])))],
        );
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                Box::new(StorageValue::new(base("list", &[("key", "list".into())]))),
                Box::new(for_each),
                sink,
            ],
        );
        flow.context().storage().put(
            StorageScope::Flow,
            "list",
            Payload::Array(vec![Payload::Integer(1), Payload::Integer(2), Payload::Integer(3)]),
        );

        flow.run().await.unwrap();

        assert_eq!(ints(&seen), vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_non_fatal_actor_logs_and_continues() {
        let mut failing_base = base("failing", &[]);
        failing_base.non_fatal = true;
        let failing = FailingSink::new(failing_base, 2);
        let seen = failing.handle();
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), Box::new(failing)],
        );

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(ints(&seen), vec![1, 3]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].actor, "test.failing");
        assert!(report.errors[0].message.contains("refusing 2"));
    }

    #[tokio::test]
    async fn test_failure_strategy_decides_fatality() {
        struct TestCase {
            strategy: FailureStrategy,
            fatal: bool,
            seen: Vec<i64>,
        }

        let cases = vec![
            TestCase { strategy: FailureStrategy::FailFast, fatal: true, seen: vec![1] },
            TestCase { strategy: FailureStrategy::ContinueOnError, fatal: false, seen: vec![1, 3] },
        ];

        for case in cases {
            let failing = FailingSink::new(base("failing", &[]), 2);
            let seen = failing.handle();
            let mut flow = Flow::from_actors(
                settings(case.strategy),
                vec![range("numbers", 1, 3), Box::new(failing)],
            );

            let result = flow.run().await;

            match result {
                Err(FlowError::Execution(error)) => {
                    assert!(case.fatal, "{:?} should not be fatal", case.strategy);
                    assert_eq!(error.path(), Some("test.failing"));
                    assert_eq!(flow.state(), FlowState::Failed);
                }
                Ok(report) => {
                    assert!(!case.fatal, "{:?} should be fatal", case.strategy);
                    assert_eq!(report.errors.len(), 1);
                }
                Err(other) => panic!("unexpected error: {}", other),
            }
            assert_eq!(ints(&seen), case.seen, "{:?}", case.strategy);
        }
    }

    #[tokio::test]
    async fn test_stop_flow_on_error_overrides_continue_on_error() {
        let mut failing_base = base("failing", &[]);
        failing_base.stop_flow_on_error = true;
        let failing = FailingSink::new(failing_base, 2);
        let seen = failing.handle();
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::ContinueOnError),
            vec![range("numbers", 1, 3), Box::new(failing)],
        );

        let result = flow.run().await;

        assert!(matches!(result, Err(FlowError::Execution(_))));
        assert_eq!(ints(&seen), vec![1]);
    }

    #[tokio::test]
    async fn test_tear_down_releases_every_resource() {
        let open = Arc::new(AtomicUsize::new(0));
        let nested = Sequence::new(
            base("nested", &[]),
            vec![
                Box::new(TrackedResource::new(base("inner", &[]), open.clone())),
                Box::new(TrackedResource::new(base("inner2", &[]), open.clone())),
            ],
        );
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                Box::new(TrackedResource::new(base("outer", &[]), open.clone())),
                Box::new(nested),
            ],
        );

        flow.set_up().await.unwrap();
        assert_eq!(open.load(Ordering::SeqCst), 3);
        assert_eq!(flow.state(), FlowState::SetUp);

        flow.tear_down().await;
        assert_eq!(open.load(Ordering::SeqCst), 0);

        flow.tear_down().await;
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_setup_reports_all_errors_and_releases_resources() {
        let open = Arc::new(AtomicUsize::new(0));
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                Box::new(TrackedResource::new(base("resource", &[]), open.clone())),
                range("numbers", 1, 3),
                Box::new(Scale::new(base("no_factor", &[]))),
                Box::new(Scale::new(base("bad_factor", &[("factor", "lots".into())]))),
            ],
        );

        let result = flow.run().await;

        match result {
            Err(FlowError::Setup(errors)) => {
                let paths: Vec<&str> = errors.iter().map(SetupError::path).collect();
                assert!(paths.contains(&"test.no_factor"), "{:?}", paths);
                assert!(paths.contains(&"test.bad_factor"), "{:?}", paths);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected setup failure"),
        }
        assert_eq!(flow.state(), FlowState::Failed);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 2)],
        );

        flow.run().await.unwrap();

        assert!(matches!(
            flow.run().await,
            Err(FlowError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_flow_must_not_expect_input() {
        struct TestCase {
            name: &'static str,
            actors: Vec<Box<dyn Actor>>,
            expect_rejected: bool,
        }

        let cases = vec![
            TestCase {
                name: "starts with a transformer",
                actors: vec![
                    Box::new(Scale::new(base("double", &[("factor", 2.into())]))),
                    collector("sink").0,
                ],
                expect_rejected: true,
            },
            TestCase {
                name: "only a sink",
                actors: vec![collector("sink").0],
                expect_rejected: true,
            },
            TestCase {
                name: "starts with a source",
                actors: vec![range("numbers", 1, 2), collector("sink").0],
                expect_rejected: false,
            },
        ];

        for case in cases {
            let mut flow = Flow::from_actors(settings(FailureStrategy::FailFast), case.actors);
            let result = flow.set_up().await;
            match result {
                Err(FlowError::Setup(errors)) => {
                    assert!(case.expect_rejected, "{}: {}", case.name, errors);
                    assert!(
                        errors.iter().any(|e| matches!(
                            e,
                            SetupError::IncompatibleWiring { path, .. } if path == "test"
                        )),
                        "{}: {}",
                        case.name,
                        errors
                    );
                    assert_eq!(flow.state(), FlowState::Failed, "{}", case.name);
                }
                Err(other) => panic!("{}: unexpected error {}", case.name, other),
                Ok(()) => assert!(!case.expect_rejected, "{}: expected setup failure", case.name),
            }
            flow.tear_down().await;
        }
    }

    #[tokio::test]
    async fn test_callable_sink_reaches_registered_actor() {
        let (shared_sink, seen) = collector("shared");
        let library = CallableActors::new(base("library", &[]), vec![shared_sink]);
        let reference = CallableRef::sink(base("to_shared", &[("callable", "shared".into())]));
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![Box::new(library), range("numbers", 1, 3), Box::new(reference)],
        );

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(ints(&seen), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_callable_reference_errors() {
        struct TestCase {
            name: &'static str,
            actors: Vec<Box<dyn Actor>>,
            expect_duplicate: bool,
            expect_unresolved: bool,
        }

        let duplicate = || -> Vec<Box<dyn Actor>> {
            vec![
                Box::new(CallableActors::new(
                    base("first", &[]),
                    vec![collector("shared").0],
                )),
                Box::new(CallableActors::new(
                    base("second", &[]),
                    vec![collector("shared").0],
                )),
            ]
        };

        let cases = vec![
            TestCase {
                name: "duplicate name",
                actors: duplicate(),
                expect_duplicate: true,
                expect_unresolved: false,
            },
            TestCase {
                name: "unresolved name",
                actors: vec![
                    range("numbers", 1, 3),
                    Box::new(CallableRef::sink(base(
                        "to_nobody",
                        &[("callable", "nobody".into())],
                    ))),
                ],
                expect_duplicate: false,
                expect_unresolved: true,
            },
        ];

        for case in cases {
            let mut flow = Flow::from_actors(settings(FailureStrategy::FailFast), case.actors);
            let errors = match flow.set_up().await {
                Err(FlowError::Setup(errors)) => errors,
                Err(other) => panic!("{}: unexpected error {}", case.name, other),
                Ok(()) => panic!("{}: expected setup failure", case.name),
            };
            let duplicate = errors
                .iter()
                .any(|e| matches!(e, SetupError::DuplicateName { .. }));
            let unresolved = errors
                .iter()
                .any(|e| matches!(e, SetupError::UnresolvedReference { .. }));
            assert_eq!(duplicate, case.expect_duplicate, "{}", case.name);
            assert_eq!(unresolved, case.expect_unresolved, "{}", case.name);
            flow.tear_down().await;
        }
    }

    #[tokio::test]
    async fn test_optional_callable_transformer_forwards() {
        let (sink, seen) = collector("sink");
        let reference = CallableRef::transformer(base(
            "maybe",
            &[("callable", "absent".into()), ("optional", true.into())],
        ));
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), Box::new(reference), sink],
        );

        flow.run().await.unwrap();

        assert_eq!(ints(&seen), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_recursive_callables_fail_setup() {
        struct TestCase {
            name: &'static str,
            calls: Vec<(&'static str, &'static str)>,
            entry: &'static str,
        }

        let relay = |name: &str, callee: &str| -> Box<dyn Actor> {
            Box::new(Sequence::new(
                base(name, &[]),
                vec![
                    Box::new(PassThrough::new(base("forward", &[]))),
                    Box::new(CallableRef::transformer(base(
                        "next",
                        &[("callable", callee.into())],
                    ))),
                ],
            ))
        };

        let cases = vec![
            TestCase {
                name: "calls itself",
                calls: vec![("loopback", "loopback")],
                entry: "loopback",
            },
            TestCase {
                name: "calls back through another callable",
                calls: vec![("ping", "pong"), ("pong", "ping")],
                entry: "ping",
            },
        ];

        for case in cases {
            let library = CallableActors::new(
                base("library", &[]),
                case.calls
                    .iter()
                    .map(|(name, callee)| relay(name, callee))
                    .collect(),
            );
            let (sink, seen) = collector("sink");
            let mut flow = Flow::from_actors(
                settings(FailureStrategy::FailFast),
                vec![
                    Box::new(library),
                    range("numbers", 1, 3),
                    Box::new(CallableRef::transformer(base(
                        "enter",
                        &[("callable", case.entry.into())],
                    ))),
                    sink,
                ],
            );

            let result = tokio::time::timeout(Duration::from_secs(3), flow.set_up())
                .await
                .unwrap_or_else(|_| panic!("{}: setup did not finish", case.name));
            let errors = match result {
                Err(FlowError::Setup(errors)) => errors,
                other => panic!("{}: expected setup failure, got {:?}", case.name, other),
            };
            let recursion = errors.iter().find_map(|e| match e {
                SetupError::IncompatibleWiring { message, .. } => Some(message.clone()),
                _ => None,
            });
            let message = recursion.unwrap_or_else(|| panic!("{}: no wiring error", case.name));
            assert!(message.contains("would call itself"), "{}: {}", case.name, message);
            assert_eq!(flow.state(), FlowState::Failed, "{}", case.name);
            flow.tear_down().await;
            assert!(seen.lock().is_empty(), "{}", case.name);
        }
    }

    #[tokio::test]
    async fn test_pause_holds_tokens_until_resume() {
        let (sink, seen) = collector("sink");
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), sink],
        );
        let handle = flow.handle();
        handle.pause();

        let running = tokio::spawn(async move {
            let report = flow.run().await;
            (flow, report)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_paused());
        assert_eq!(handle.state(), FlowState::Running);
        assert!(seen.lock().is_empty());

        handle.resume();
        let (flow, report) = running.await.unwrap();

        assert_eq!(report.unwrap().state, FlowState::Completed);
        assert_eq!(flow.state(), FlowState::Completed);
        assert_eq!(ints(&seen), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_stop_while_paused_ends_the_run() {
        let (sink, seen) = collector("sink");
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), sink],
        );
        let handle = flow.handle();
        handle.pause();

        let running = tokio::spawn(async move { flow.run().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop("operator");

        let report = running.await.unwrap().unwrap();
        assert_eq!(report.state, FlowState::Stopped);
        assert_eq!(report.stop_reason.as_deref(), Some("operator"));
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_interval_trigger_fires_max_fires_times() {
        let (sink, seen) = collector("sink");
        let trigger = EventTrigger::new(
            base(
                "ticker",
                &[
                    ("interval_ms", 10.into()),
                    ("fire_on_start", true.into()),
                    ("max_fires", 3.into()),
                ],
            ),
            vec![
                Box::new(StringConstants::new(base(
                    "beat",
                    &[("strings", vec!["tick"].into())],
                ))),
                sink,
            ],
        );
        let mut flow = Flow::from_actors(settings(FailureStrategy::FailFast), vec![Box::new(trigger)]);

        let report = tokio::time::timeout(Duration::from_secs(5), flow.run())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(texts(&seen), vec!["tick", "tick", "tick"]);
    }

    #[tokio::test]
    async fn test_manual_trigger_fires_through_handle() {
        let (sink, seen) = collector("sink");
        let trigger = EventTrigger::new(
            base("manual", &[("handle", "kick".into()), ("max_fires", 2.into())]),
            vec![range("numbers", 1, 2), sink],
        );
        let mut flow = Flow::from_actors(settings(FailureStrategy::FailFast), vec![Box::new(trigger)]);

        flow.set_up().await.unwrap();
        let handle = flow.handle();
        assert!(handle.fire("kick"));
        assert!(handle.fire("kick"));
        assert!(!handle.fire("unknown"));

        let report = tokio::time::timeout(Duration::from_secs(5), flow.run())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(ints(&seen), vec![1, 2, 1, 2]);
    }

    #[tokio::test]
    async fn test_fire_policy_decides_runs_per_burst() {
        struct TestCase {
            policy: &'static str,
            expected: Vec<i64>,
        }

        let cases = vec![
            TestCase {
                policy: "queue",
                expected: [1, 2].repeat(6),
            },
            TestCase {
                policy: "latest_wins",
                expected: vec![1, 2, 1, 2],
            },
        ];

        for case in cases {
            let (sink, seen) = collector("sink");
            let trigger = EventTrigger::new(
                base(
                    "manual",
                    &[("handle", "kick".into()), ("fire_policy", case.policy.into())],
                ),
                vec![range("numbers", 1, 2), sink],
            );
            let mut flow =
                Flow::from_actors(settings(FailureStrategy::FailFast), vec![Box::new(trigger)]);

            flow.set_up().await.unwrap();
            let handle = flow.handle();
            for _ in 0..3 {
                assert!(handle.fire("kick"));
            }
            let running = tokio::spawn(async move { flow.run().await });

            tokio::time::sleep(Duration::from_millis(50)).await;
            for _ in 0..3 {
                assert!(handle.fire("kick"));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.stop("done");

            let report = tokio::time::timeout(Duration::from_secs(5), running)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(report.state, FlowState::Stopped, "{}", case.policy);
            assert_eq!(ints(&seen), case.expected, "{}", case.policy);
        }
    }

    #[tokio::test]
    async fn test_try_catch_routes_failed_tokens_to_catch() {
        let failing = FailingSink::new(base("attempt", &[]), 2);
        let attempted = failing.handle();
        let (fallback, caught) = collector("fallback");
        let try_catch = TryCatch::new(
            base("guarded", &[("error_variable", "last_error".into())]),
            vec![Box::new(failing), fallback],
        );
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), Box::new(try_catch)],
        );

        let report = flow.run().await.unwrap();

        assert_eq!(report.state, FlowState::Completed);
        assert_eq!(ints(&attempted), vec![1, 3]);
        assert_eq!(ints(&caught), vec![2]);
        let last_error = flow.context().variables().get("last_error").unwrap_or_default();
        assert!(last_error.contains("refusing 2"), "{}", last_error);
    }

    #[tokio::test]
    async fn test_tee_copies_and_forwards() {
        let (side, side_seen) = collector("side");
        let (main, main_seen) = collector("main");
        let tee = Tee::new(base("copy", &[]), vec![side]);
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), Box::new(tee), main],
        );

        flow.run().await.unwrap();

        assert_eq!(ints(&side_seen), vec![1, 2, 3]);
        assert_eq!(ints(&main_seen), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_trigger_runs_sub_flow_per_token() {
        let (side, side_seen) = collector("side");
        let (main, main_seen) = collector("main");
        let trigger = Trigger::new(
            base("per_token", &[]),
            vec![
                Box::new(StringConstants::new(base(
                    "marker",
                    &[("strings", vec!["seen"].into())],
                ))),
                side,
            ],
        );
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![range("numbers", 1, 3), Box::new(trigger), main],
        );

        flow.run().await.unwrap();

        assert_eq!(texts(&side_seen), vec!["seen", "seen", "seen"]);
        assert_eq!(ints(&main_seen), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_local_scope_keeps_writes_unless_propagated() {
        struct TestCase {
            variables: &'static str,
            kept_visible: bool,
        }

        let cases = vec![
            TestCase {
                variables: "copy",
                kept_visible: false,
            },
            TestCase {
                variables: "share",
                kept_visible: true,
            },
        ];

        for case in cases {
            let body: Vec<Box<dyn Actor>> = vec![
                Box::new(SetVariableStandalone::new(base(
                    "keep",
                    &[("variable", "kept".into()), ("value", "inside".into())],
                ))),
                Box::new(SetVariableStandalone::new(base(
                    "leak",
                    &[("variable", "leaked".into()), ("value", "${flow_name}".into())],
                ))),
                Box::new(StringConstants::new(base("marker", &[("strings", vec!["s"].into())]))),
                Box::new(SetStorageValue::new(base("hide", &[("key", "private".into())]))),
                Box::new(Collector::new(base("gather", &[("key", "shared".into())]))),
            ];
            let scoped = LocalScopeTrigger::new(
                base(
                    "scoped",
                    &[
                        ("scope_handling_variables", case.variables.into()),
                        ("propagate_variables", vec!["leaked"].into()),
                        ("propagate_storage", vec!["shared"].into()),
                    ],
                ),
                body,
            );
            let (sink, seen) = collector("main");
            let mut flow = Flow::from_actors(
                settings(FailureStrategy::FailFast),
                vec![range("numbers", 1, 2), Box::new(scoped), sink],
            );

            let report = flow.run().await.unwrap();

            assert_eq!(report.state, FlowState::Completed, "{}", case.variables);
            assert_eq!(ints(&seen), vec![1, 2], "{}", case.variables);
            let vars = flow.context().variables();
            assert_eq!(vars.get("leaked").as_deref(), Some("test"), "{}", case.variables);
            assert_eq!(vars.has("kept"), case.kept_visible, "{}", case.variables);
            let storage = flow.context().storage();
            assert_eq!(
                storage.get(&StorageScope::Flow, "shared"),
                Some(Payload::Array(vec![Payload::from("s"), Payload::from("s")])),
                "{}",
                case.variables
            );
            assert!(!storage.has(&StorageScope::Flow, "private"), "{}", case.variables);
        }
    }

    #[tokio::test]
    async fn test_flow_variables_are_published() {
        let (sink, seen) = collector("sink");
        let mut flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                Box::new(VariableValue::new(base("name", &[("variable", "flow_name".into())]))),
                sink,
            ],
        );

        flow.run().await.unwrap();

        assert_eq!(texts(&seen), vec!["test"]);
        assert!(flow.context().variables().get("flow_id").is_some());
    }

    #[tokio::test]
    async fn test_describe_lists_the_tree() {
        let flow = Flow::from_actors(
            settings(FailureStrategy::FailFast),
            vec![
                range("numbers", 1, 3),
                Box::new(Scale::new(base("double", &[("factor", 2.into())]))),
                collector("sink").0,
            ],
        );

        let tree = flow.describe().await;

        for name in ["test", "numbers", "double", "sink"] {
            assert!(tree.contains(name), "{} missing from\n{}", name, tree);
        }
        assert_eq!(tree.lines().count(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_pipeline_preserves_order(values in prop::collection::vec(-1000i64..1000, 1..20)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let strings: Vec<String> = values.iter().map(i64::to_string).collect();
            let (sink, seen) = collector("sink");
            let mut flow = Flow::from_actors(
                settings(FailureStrategy::FailFast),
                vec![
                    Box::new(StringConstants::new(base("values", &[("strings", strings.clone().into())]))),
                    Box::new(PassThrough::new(base("through", &[]))),
                    sink,
                ],
            );

            runtime.block_on(flow.run()).unwrap();

            prop_assert_eq!(texts(&seen), strings);
        }
    }
}
